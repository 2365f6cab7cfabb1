use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

use super::photo::{MediaSubtype, MediaType, RawPhotoRecord};
use crate::config::Config;
use crate::error::{RollError, RollResult};

/// Query forwarded to the photo source.
///
/// `start_date`/`end_date` are accepted as aliases of `from`/`to`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<Vec<MediaType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_subtype: Option<Vec<MediaSubtype>>,
}

impl PhotoQuery {
    /// Fills `from`/`to` from the aliases when they are not set.
    pub fn resolved(mut self) -> Self {
        if self.from.is_none() {
            self.from = self.start_date;
        }
        if self.to.is_none() {
            self.to = self.end_date;
        }
        self
    }

    /// Range and media checks applied by sources that filter locally.
    fn admits(&self, record: &RawPhotoRecord) -> bool {
        if self.from.is_some() || self.to.is_some() {
            let taken = match DateTime::parse_from_rfc3339(&record.date_taken) {
                Ok(taken) => taken.with_timezone(&Utc),
                Err(_) => {
                    debug!(
                        "Unreadable dateTaken {} on {}, excluded from range",
                        record.date_taken, record.uuid
                    );
                    return false;
                }
            };
            if matches!(self.from, Some(from) if taken < from) {
                return false;
            }
            if matches!(self.to, Some(to) if taken > to) {
                return false;
            }
        }

        if let Some(media_types) = &self.media_type {
            if !media_types.contains(&record.media_type) {
                return false;
            }
        }

        if let Some(subtypes) = &self.media_subtype {
            if !subtypes.contains(&record.media_subtype) {
                return false;
            }
        }

        true
    }
}

/// Where raw photo records come from (the device asset library, a fixture file, ...).
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn fetch(&self, query: &PhotoQuery) -> RollResult<Vec<RawPhotoRecord>>;

    fn name(&self) -> &'static str;
}

/// Reads a JSON array of raw records from disk and filters it locally.
pub struct JsonPhotoSource {
    path: PathBuf,
}

impl JsonPhotoSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PhotoSource for JsonPhotoSource {
    async fn fetch(&self, query: &PhotoQuery) -> RollResult<Vec<RawPhotoRecord>> {
        let data = fs::read(&self.path).await.map_err(|e| {
            RollError::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let records: Vec<RawPhotoRecord> = serde_json::from_slice(&data)?;
        let total = records.len();

        let records: Vec<RawPhotoRecord> = records
            .into_iter()
            .filter(|record| query.admits(record))
            .collect();

        debug!(
            "Read {} photo records from {}, {} match the query",
            total,
            self.path.display(),
            records.len()
        );
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Stand-in used when no photo library capability is present.
pub struct UnavailablePhotoSource;

#[async_trait]
impl PhotoSource for UnavailablePhotoSource {
    async fn fetch(&self, _query: &PhotoQuery) -> RollResult<Vec<RawPhotoRecord>> {
        Err(RollError::SourceUnavailable(
            "no photo library available".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Picks the photo source from what the configuration makes available.
pub fn photo_source_for(config: &Config) -> Arc<dyn PhotoSource> {
    match &config.photos_json {
        Some(path) if path.is_file() => {
            info!("Using photo records from {}", path.display());
            Arc::new(JsonPhotoSource::new(path.clone()))
        }
        Some(path) => {
            warn!(
                "Photo records file {} not found, photo source unavailable",
                path.display()
            );
            Arc::new(UnavailablePhotoSource)
        }
        None => {
            warn!("No photo library configured, photo source unavailable");
            Arc::new(UnavailablePhotoSource)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_records(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("photos.json");
        let records = json!([
            {"uuid": "a", "dateTaken": "2015-06-01T10:00:00Z", "localTime": "2015-06-01 03:00:00.000", "mediaType": 1},
            {"uuid": "b", "dateTaken": "2016-06-01T10:00:00Z", "localTime": "2016-06-01 03:00:00.000", "mediaType": 1},
            {"uuid": "c", "dateTaken": "2016-07-01T10:00:00Z", "localTime": "2016-07-01 03:00:00.000", "mediaType": 2},
            {"uuid": "d", "dateTaken": "garbage", "localTime": "", "mediaType": 1}
        ]);
        std::fs::write(&path, serde_json::to_vec(&records).unwrap()).unwrap();
        path
    }

    fn uuids(records: &[RawPhotoRecord]) -> Vec<&str> {
        records.iter().map(|r| r.uuid.as_str()).collect()
    }

    #[test]
    fn test_query_aliases() {
        let start = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2016, 12, 31, 0, 0, 0).unwrap();
        let query = PhotoQuery {
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        }
        .resolved();
        assert_eq!(query.from, Some(start));
        assert_eq!(query.to, Some(end));

        let explicit = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        let query = PhotoQuery {
            from: Some(explicit),
            start_date: Some(start),
            ..Default::default()
        }
        .resolved();
        assert_eq!(query.from, Some(explicit));
    }

    #[test]
    fn test_query_serializes_camel_case() {
        let query = PhotoQuery {
            media_type: Some(vec![MediaType::Image]),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&query).unwrap(), json!({"mediaType": [1]}));
    }

    #[tokio::test]
    async fn test_json_source_reads_everything() {
        let dir = TempDir::new().unwrap();
        let source = JsonPhotoSource::new(write_records(&dir));

        let records = source.fetch(&PhotoQuery::default()).await.unwrap();
        assert_eq!(uuids(&records), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_json_source_applies_query() {
        let dir = TempDir::new().unwrap();
        let source = JsonPhotoSource::new(write_records(&dir));

        let query = PhotoQuery {
            from: Some(Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap()),
            media_type: Some(vec![MediaType::Image]),
            ..Default::default()
        };
        let records = source.fetch(&query).await.unwrap();
        assert_eq!(uuids(&records), vec!["b"]);
    }

    #[tokio::test]
    async fn test_json_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let source = JsonPhotoSource::new(dir.path().join("missing.json"));

        let result = source.fetch(&PhotoQuery::default()).await;
        assert!(matches!(result, Err(RollError::SourceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unavailable_source() {
        let result = UnavailablePhotoSource.fetch(&PhotoQuery::default()).await;
        assert!(matches!(result, Err(RollError::SourceUnavailable(_))));
        assert_eq!(UnavailablePhotoSource.name(), "unavailable");
    }

    #[test]
    fn test_photo_source_selection() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        assert_eq!(photo_source_for(&config).name(), "unavailable");

        config.photos_json = Some(dir.path().join("missing.json"));
        assert_eq!(photo_source_for(&config).name(), "unavailable");

        config.photos_json = Some(write_records(&dir));
        assert_eq!(photo_source_for(&config).name(), "json");
    }
}
