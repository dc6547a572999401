use std::path::PathBuf;
use crate::source::{AllocationSource, HttpSource, OutputDirSource};
use crate::stats::Filter;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_OUTPUT_DIR: &str = "Output";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

pub const USAGE: &str = "usage: pitch-stats [web [PORT] | show [TEAM] [--from FILE] [--csv FILE]]";

/// What the binary was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve the statistics pages and API
    Web { port: u16 },
    /// Print the tables once; optionally read a saved history and export the match times as CSV
    Show {
        filter: Filter,
        history: Option<PathBuf>,
        csv_out: Option<PathBuf>,
    },
}

/// Settings taken from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub output_dir: PathBuf,
    pub source_url: Option<String>,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `STATS_OUTPUT_DIR`, `STATS_SOURCE_URL` and `ADMIN_PASSWORD` through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Config {
            output_dir: lookup("STATS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            source_url: lookup("STATS_SOURCE_URL").filter(|url| !url.trim().is_empty()),
            admin_password: lookup("ADMIN_PASSWORD")
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
        }
    }

    /// Remote endpoint when configured, otherwise the local output directory
    pub fn source(&self) -> Box<dyn AllocationSource> {
        match &self.source_url {
            Some(url) => Box::new(HttpSource::new(url.clone())),
            None => Box::new(OutputDirSource::new(&self.output_dir)),
        }
    }
}

/// Parses command-line arguments (program name included)
pub fn parse_command(args: &[String]) -> Result<Command, String> {
    match args.get(1).map(String::as_str) {
        Some("web") => {
            let port = args
                .get(2)
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT);
            Ok(Command::Web { port })
        }
        None | Some("show") => {
            let mut filter = Filter::All;
            let mut history = None;
            let mut csv_out = None;
            let mut rest = args.iter().skip(2);
            while let Some(arg) = rest.next() {
                match arg.as_str() {
                    "--csv" => {
                        let path = rest.next().ok_or("--csv needs a file name")?;
                        csv_out = Some(PathBuf::from(path));
                    }
                    "--from" => {
                        let path = rest.next().ok_or("--from needs a file name")?;
                        history = Some(PathBuf::from(path));
                    }
                    team => filter = Filter::from(team),
                }
            }
            Ok(Command::Show { filter, history, csv_out })
        }
        Some(other) => Err(format!("unknown command '{}'\n{}", other, USAGE)),
    }
}
