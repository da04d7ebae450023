//! Process entry: arguments, logging, configuration, then run or check

use super::cli::Args;
use super::host::{render_plan, Host};
use crate::adapter::MemoryBroker;
use crate::config::EndpointSet;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version;
use clap::Parser;

/// Run the host and return the process exit code
pub fn startup() -> i32 {
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: could not start the async runtime: {}", e);
            return 1;
        }
    };

    runtime.block_on(run(args))
}

async fn run(args: Args) -> i32 {
    let use_color = args.use_color();
    if let Err(e) = init_logging(
        args.log_level.as_deref(),
        args.log_format.as_deref(),
        args.log_file_path(),
        use_color,
    ) {
        eprintln!("Error: could not initialise logging: {}", e);
        return 1;
    }

    log::info!("queuebridge {} starting", version::long_version());

    let Some(config_path) = args.config_path() else {
        log::error!("FATAL: no --config given and no user configuration directory found");
        return 1;
    };

    let endpoints = match EndpointSet::load(&config_path).await {
        Ok(endpoints) => endpoints,
        Err(e) => {
            log_error_with_context(&e, "Loading queue configuration");
            return 1;
        }
    };
    log::info!(
        "{} queue(s) configured from {}",
        endpoints.len(),
        config_path.display()
    );

    let host = match Host::new(endpoints, MemoryBroker::new()) {
        Ok(host) => host,
        Err(e) => {
            log_error_with_context(&e, "Registering adapter providers");
            return 1;
        }
    };
    if let Err(e) = host.register_default_processors() {
        log_error_with_context(&e, "Registering processors");
        return 1;
    }

    if args.check {
        let plan = host.plan();
        println!("{}", render_plan(&plan, use_color));
        return if plan.iter().all(|entry| entry.outcome.is_ok()) {
            0
        } else {
            1
        };
    }

    let result =
        ShutdownCoordinator::guard_with_coordinator(|_coordinator, shutdown_rx| async move {
            host.run(shutdown_rx).await
        })
        .await;

    match result {
        Ok(()) => {
            log::info!("queuebridge stopped");
            0
        }
        Err(e) => {
            log_error_with_context(&e, "Running reactors");
            1
        }
    }
}
