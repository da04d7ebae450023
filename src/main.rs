use queuebridge::app::startup::startup;

fn main() {
    std::process::exit(startup());
}
