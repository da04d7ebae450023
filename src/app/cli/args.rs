//! Host command-line arguments

use crate::core::version;
use clap::Parser;
use std::path::PathBuf;

/// Default configuration file name under `<config_dir>/queuebridge/`
pub const DEFAULT_CONFIG_FILE: &str = "queues.toml";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "queuebridge")]
#[command(about = "Run message-queue reactors for configured queues")]
#[command(version = version::version(), long_version = version::long_version())]
pub struct Args {
    /// Queue configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Validate the configuration, print the reactor plan and exit
    #[arg(long = "check")]
    pub check: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to log to stderr)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Force colored output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Args {
    /// Explicit `--config`, else the per-user default location
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            dirs::config_dir().map(|dir| dir.join("queuebridge").join(DEFAULT_CONFIG_FILE))
        })
    }

    /// Log file to write to, treating `none` as "no file"
    pub fn log_file_path(&self) -> Option<&str> {
        self.log_file
            .as_deref()
            .and_then(|path| path.to_str())
            .filter(|path| !path.eq_ignore_ascii_case("none"))
    }

    /// `--color`/`--no-color`, falling back to whether stderr is a terminal
    pub fn use_color(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            std::io::IsTerminal::is_terminal(&std::io::stderr())
        }
    }
}
