use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Object-created notification for a single stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageObjectEvent {
    pub bucket: String,
    pub key: String,
}

impl StorageObjectEvent {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `s3://bucket/key` URI of the object
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

impl std::fmt::Display for StorageObjectEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// S3 event notification document
#[derive(Debug, Deserialize)]
struct S3Notification {
    #[serde(rename = "Records", default)]
    records: Vec<S3EventRecord>,
}

#[derive(Debug, Deserialize)]
struct S3EventRecord {
    #[serde(rename = "eventName")]
    event_name: Option<String>,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// Parse an S3 notification document into object-created events.
///
/// Records for other event types are dropped. Keys arrive form-encoded (`+` for spaces); a
/// record whose key does not decode is logged and dropped without affecting its siblings.
pub fn parse_notification(body: &str) -> Result<Vec<StorageObjectEvent>> {
    let notification: S3Notification =
        serde_json::from_str(body).context("Failed to parse S3 notification")?;

    let mut events = Vec::with_capacity(notification.records.len());
    for record in notification.records {
        if let Some(name) = record.event_name.as_deref() {
            if !name.starts_with("ObjectCreated") {
                tracing::debug!("Skipping {} record for {}", name, record.s3.object.key);
                continue;
            }
        }

        let key = match decode_key(&record.s3.object.key) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Skipping record in {}: {:#}", record.s3.bucket.name, e);
                continue;
            }
        };
        events.push(StorageObjectEvent::new(record.s3.bucket.name, key));
    }

    Ok(events)
}

fn decode_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced)
        .with_context(|| format!("Object key is not valid URL encoding: {}", raw))?;
    Ok(decoded.into_owned())
}
