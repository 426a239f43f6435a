use std::path::PathBuf;

use clap::Parser;

/// Flag passed to the re-executed child when detaching.
pub const FOREGROUND_FLAG: &str = "--foreground";

#[derive(Parser, Debug)]
#[command(name = "reelwatch")]
#[command(about = "Polls RSS feeds and downloads matching items once", long_about = None)]
pub struct Cli {
    /// Stay attached to the terminal and log to stderr
    #[arg(short, long)]
    pub foreground: bool,

    /// Verbosity: 0 errors, 1 messages, 2 info, 3 debug
    #[arg(short, long, value_name = "LEVEL", default_value_t = 1)]
    pub verbose: u8,

    /// Configuration file (default: ~/.config/reelwatch/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub configfile: Option<PathBuf>,

    /// Check all feeds once and exit
    #[arg(short, long)]
    pub once: bool,

    /// Write the log to a file
    #[arg(short, long, value_name = "FILE")]
    pub logfile: Option<PathBuf>,

    /// Append to the log file instead of truncating it
    #[arg(short, long)]
    pub append_log: bool,

    /// Process a local RSS file (implies --foreground and --once)
    #[arg(short = 'x', long, value_name = "FILE")]
    pub xml: Option<PathBuf>,
}

impl Cli {
    pub fn is_foreground(&self) -> bool {
        self.foreground || self.xml.is_some()
    }

    pub fn is_once(&self) -> bool {
        self.once || self.xml.is_some()
    }

    /// Default tracing directive for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
