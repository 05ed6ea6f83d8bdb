use serde::Deserialize;
use std::sync::Arc;

use crate::metadata::{MetadataStore, TranscriptRecord};
use crate::storage::ObjectStore;
use crate::PipelineError;

/// Transcription result document (the parts the pipeline reads)
#[derive(Debug, Deserialize)]
struct TranscriptDocument {
    #[serde(rename = "jobName")]
    job_name: Option<String>,
    status: Option<String>,
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    transcripts: Vec<TranscriptText>,
}

#[derive(Debug, Deserialize)]
struct TranscriptText {
    transcript: String,
}

/// Stores the transcript of every transcription result written to storage
pub struct ResultIngestor {
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
}

impl ResultIngestor {
    pub fn new(objects: Arc<dyn ObjectStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { objects, metadata }
    }

    pub async fn ingest(&self, bucket: &str, key: &str) -> Result<TranscriptRecord, PipelineError> {
        tracing::info!("Ingesting transcription result s3://{}/{}", bucket, key);

        let body = self
            .objects
            .get_object(bucket, key)
            .await
            .map_err(|e| PipelineError::Storage {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: e.into(),
            })?;

        let record = parse_transcript(key, &body)?;

        self.metadata
            .put_transcript(&record)
            .await
            .map_err(|e| PipelineError::Persist {
                record: "transcript",
                key: key.to_string(),
                source: e.into(),
            })?;

        tracing::info!("Stored transcript for {} ({} chars)", key, record.transcript.len());
        Ok(record)
    }
}

/// Extract the first transcript from a result body
pub fn parse_transcript(key: &str, body: &[u8]) -> Result<TranscriptRecord, PipelineError> {
    let parse_error = |source: crate::BoxError| PipelineError::Parse {
        key: key.to_string(),
        source,
    };

    let text = std::str::from_utf8(body).map_err(|e| parse_error(e.into()))?;
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| parse_error(e.into()))?;

    let document: TranscriptDocument =
        serde_json::from_value(value).map_err(|e| PipelineError::Schema {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

    match document.status.as_deref() {
        Some("COMPLETED") => {}
        Some(status) => tracing::warn!("Transcription result {} has status {}", key, status),
        None => tracing::debug!("Transcription result {} has no status", key),
    }

    let first = document
        .results
        .transcripts
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::Schema {
            key: key.to_string(),
            reason: "results.transcripts is empty".to_string(),
        })?;

    Ok(TranscriptRecord {
        source_key: key.to_string(),
        transcript: first.transcript,
        job_name: document.job_name,
        ingested_at: chrono::Utc::now(),
    })
}
