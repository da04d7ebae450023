//! CLI module containing argument parsing

mod args;

pub use args::{Args, DEFAULT_CONFIG_FILE};

#[cfg(test)]
mod tests;
