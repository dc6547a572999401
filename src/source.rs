use std::fs;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};
use serde_json::Value;

use crate::error::{Result, StatsError};
use crate::parser::{parse_allocations_json, parse_output_file};

/// Where raw allocation history comes from
#[async_trait]
pub trait AllocationSource: Send + Sync {
    /// Human readable origin, used in log lines
    fn describe(&self) -> String;

    /// Fetches the raw (not yet normalized) allocation objects
    async fn fetch(&self) -> Result<Vec<Value>>;
}

/// Allocation output directory: one `<YYYY-MM-DD>.txt` file per match day
pub struct OutputDirSource {
    dir: PathBuf,
}

impl OutputDirSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        OutputDirSource {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

/// Reads every dated output file; files are visited in name order so that
/// the record order (and therefore which duplicate wins) is stable
pub fn read_output_dir(dir: &Path) -> Result<Vec<Value>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    paths.sort();

    let mut allocations = Vec::new();
    for path in paths {
        let Some(date) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            warn!("Skipping {}: file name is not a date", path.display());
            continue;
        }

        let content = fs::read_to_string(&path)?;
        allocations.extend(parse_output_file(date, &content));
    }

    info!("Read {} allocations from {}", allocations.len(), dir.display());
    Ok(allocations)
}

#[async_trait]
impl AllocationSource for OutputDirSource {
    fn describe(&self) -> String {
        format!("output directory {}", self.dir.display())
    }

    async fn fetch(&self) -> Result<Vec<Value>> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || read_output_dir(&dir))
            .await
            .map_err(|e| StatsError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }
}

/// Remote statistics endpoint answering `{"allocations": [...]}`
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        HttpSource {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AllocationSource for HttpSource {
    fn describe(&self) -> String {
        format!("statistics endpoint {}", self.url)
    }

    async fn fetch(&self) -> Result<Vec<Value>> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "Failed to fetch statistics.".to_string());
            return Err(StatsError::Status {
                status: status.as_u16(),
                message,
            });
        }

        parse_allocations_json(&body)
    }
}

/// Allocations already held in memory, e.g. read from a history file
pub struct StaticSource {
    allocations: Vec<Value>,
}

impl StaticSource {
    pub fn new(allocations: Vec<Value>) -> Self {
        StaticSource { allocations }
    }
}

#[async_trait]
impl AllocationSource for StaticSource {
    fn describe(&self) -> String {
        format!("{} in-memory allocations", self.allocations.len())
    }

    async fn fetch(&self) -> Result<Vec<Value>> {
        Ok(self.allocations.clone())
    }
}

/// Loads a saved allocation history: CSV when the extension is `.csv`, JSON otherwise
pub fn read_history_file(path: &Path) -> Result<StaticSource> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let allocations = if is_csv {
        crate::parser::read_allocations_csv(fs::File::open(path)?)?
    } else {
        parse_allocations_json(&fs::read(path)?)?
    };
    Ok(StaticSource::new(allocations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize;

    #[tokio::test]
    async fn reads_dated_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("2024-05-12.txt"),
            "11:00 - U10 Bears - 7v7 - PitchB - False\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("2024-05-05.txt"),
            "10:00 - U10 Bears - 7v7 - PitchA - True\n09:00 - U8 Owls - 5v5 - PitchC - False\n",
        )
        .unwrap();
        fs::write(dir.path().join("2024-05-19.txt"), "No allocations available.").unwrap();
        fs::write(dir.path().join("notes.txt"), "10:00 - X - 1 - Y - True").unwrap();
        fs::write(dir.path().join("2024-05-26.log"), "10:00 - X - 1 - Y - True").unwrap();

        let raw = OutputDirSource::new(dir.path()).fetch().await.unwrap();
        let records = normalize(&raw);

        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-05-05", "2024-05-05", "2024-05-12"]);
        assert_eq!(records[1].team_name, "U8 Owls");
        assert!(records[0].preferred);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = OutputDirSource::new(dir.path().join("absent"));
        assert!(matches!(source.fetch().await, Err(StatsError::Io(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let source = HttpSource::new("http://127.0.0.1:9/api/statistics");
        assert!(matches!(
            source.fetch().await,
            Err(StatsError::Http(_)) | Err(StatsError::Status { .. })
        ));
    }

    #[tokio::test]
    async fn history_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("history.json");
        fs::write(&json_path, r#"{"allocations": [{"team": "A", "date": "d", "pitch": "p"}]}"#).unwrap();
        let csv_path = dir.path().join("history.CSV");
        fs::write(&csv_path, "team_name,date,pitch_name
A,d,p
B,d,p
").unwrap();

        assert_eq!(read_history_file(&json_path).unwrap().fetch().await.unwrap().len(), 1);
        assert_eq!(read_history_file(&csv_path).unwrap().fetch().await.unwrap().len(), 2);
        assert!(read_history_file(&dir.path().join("missing.json")).is_err());
    }

    #[tokio::test]
    async fn static_source_returns_its_batch() {
        let source = StaticSource::new(vec![serde_json::json!({"team": "A"})]);
        assert_eq!(source.fetch().await.unwrap().len(), 1);
    }
}
