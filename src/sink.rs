use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::models::ScrapeRecord;

/// Destination for the run's Result Record
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn push(&self, record: &ScrapeRecord) -> Result<()>;
}

/// Append-only dataset file, one compact JSON record per line.
pub struct DatasetSink {
    path: PathBuf,
}

impl DatasetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        let path = std::env::var("SCOUT_DATASET_PATH")
            .unwrap_or_else(|_| "storage/datasets/default.jsonl".to_string());
        Self::new(path)
    }
}

#[async_trait]
impl RecordSink for DatasetSink {
    async fn push(&self, record: &ScrapeRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open dataset {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        info!("Resultado anadido al dataset {}", self.path.display());
        Ok(())
    }
}

/// Per-postal-code snapshot at `<base>/<cp>/scraped_data_<cp>.json`,
/// pretty-printed, overwriting any previous run's file.
pub struct LocalFileSink {
    base_dir: PathBuf,
}

impl LocalFileSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn default_dir() -> Self {
        Self::new("data/casa")
    }

    pub fn record_path(&self, codigo_postal: &str) -> PathBuf {
        self.base_dir
            .join(codigo_postal)
            .join(format!("scraped_data_{codigo_postal}.json"))
    }
}

#[async_trait]
impl RecordSink for LocalFileSink {
    async fn push(&self, record: &ScrapeRecord) -> Result<()> {
        let path = self.record_path(&record.codigo_postal);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, record.to_pretty_json()?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Resultado guardado en {}", path.display());
        Ok(())
    }
}

/// Emit the record to both sinks. The dataset outcome is authoritative; a
/// failed local snapshot is logged and never surfaces.
pub async fn emit_record(
    dataset: &dyn RecordSink,
    local: &dyn RecordSink,
    record: &ScrapeRecord,
) -> Result<()> {
    dataset.push(record).await?;
    if let Err(err) = local.push(record).await {
        warn!("No se pudo escribir la copia local: {err:#}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScrapeRecord, ScrapeStatus};

    fn record(codigo_postal: &str, message: &str) -> ScrapeRecord {
        ScrapeRecord::error(codigo_postal, "https://example.com", message)
    }

    #[tokio::test]
    async fn dataset_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DatasetSink::new(dir.path().join("dataset.jsonl"));

        sink.push(&record("28002", "primero")).await.unwrap();
        sink.push(&record("28002", "segundo")).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join("dataset.jsonl")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: ScrapeRecord = serde_json::from_str(lines[0]).unwrap();
        let second: ScrapeRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first.error.as_deref(), Some("primero"));
        assert_eq!(second.error.as_deref(), Some("segundo"));
        assert_eq!(first.status, ScrapeStatus::Error);
    }

    #[tokio::test]
    async fn local_sink_writes_the_namespaced_path_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalFileSink::new(dir.path());

        sink.push(&record("28002", "primero")).await.unwrap();
        sink.push(&record("28002", "segundo")).await.unwrap();

        let path = dir.path().join("28002").join("scraped_data_28002.json");
        assert_eq!(sink.record_path("28002"), path);

        let contents = std::fs::read_to_string(path).unwrap();
        let parsed: ScrapeRecord = serde_json::from_str(&contents).unwrap();
        // second write replaced the first
        assert_eq!(parsed.error.as_deref(), Some("segundo"));
    }

    #[tokio::test]
    async fn local_failure_does_not_mask_the_dataset_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let dataset_path = dir.path().join("dataset.jsonl");
        let dataset = DatasetSink::new(&dataset_path);

        // a plain file where the local sink wants a directory
        let clobbered = dir.path().join("not_a_dir");
        std::fs::write(&clobbered, "x").unwrap();
        let local = LocalFileSink::new(&clobbered);

        emit_record(&dataset, &local, &record("28002", "fallo local"))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(dataset_path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
