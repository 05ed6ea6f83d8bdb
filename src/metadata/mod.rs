use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Transcript extracted from a transcription result, keyed by the result's storage key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Storage key of the ingested result object
    pub source_key: String,

    /// The transcribed text
    pub transcript: String,

    /// Transcription job that produced the result, when the payload names it
    pub job_name: Option<String>,

    /// When the record was created
    pub ingested_at: DateTime<Utc>,
}

/// Uploaded video registered against a project step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadataRecord {
    /// Composite `project-step` identifier
    pub project_step: String,
    pub mail: String,
    pub video_path: String,
}

impl VideoMetadataRecord {
    pub fn new(project: &str, step: &str, mail: impl Into<String>, video_path: impl Into<String>) -> Self {
        Self {
            project_step: format!("{}-{}", project, step),
            mail: mail.into(),
            video_path: video_path.into(),
        }
    }
}

/// Key-value store for pipeline results and upload metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Write a transcript, replacing any earlier one for the same source key
    async fn put_transcript(&self, record: &TranscriptRecord) -> Result<()>;

    async fn put_video(&self, record: &VideoMetadataRecord) -> Result<()>;

    /// All videos registered for a project step
    async fn videos_for(&self, project_step: &str) -> Result<Vec<VideoMetadataRecord>>;
}

/// DynamoDB tables holding transcripts and video metadata
pub struct DynamoMetadataStore {
    client: DynamoClient,
    transcripts_table: String,
    videos_table: String,
}

impl DynamoMetadataStore {
    pub fn new(client: DynamoClient, transcripts_table: impl Into<String>, videos_table: impl Into<String>) -> Self {
        Self {
            client,
            transcripts_table: transcripts_table.into(),
            videos_table: videos_table.into(),
        }
    }
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    async fn put_transcript(&self, record: &TranscriptRecord) -> Result<()> {
        tracing::debug!("Writing transcript for {} to {}", record.source_key, self.transcripts_table);

        let mut request = self
            .client
            .put_item()
            .table_name(&self.transcripts_table)
            .item("sourceKey", AttributeValue::S(record.source_key.clone()))
            .item("transcript", AttributeValue::S(record.transcript.clone()))
            .item("ingestedAt", AttributeValue::S(record.ingested_at.to_rfc3339()));

        if let Some(job_name) = &record.job_name {
            request = request.item("jobName", AttributeValue::S(job_name.clone()));
        }

        request
            .send()
            .await
            .with_context(|| format!("Failed to put item into {}", self.transcripts_table))?;

        Ok(())
    }

    async fn put_video(&self, record: &VideoMetadataRecord) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.videos_table)
            .item("projectStep", AttributeValue::S(record.project_step.clone()))
            .item("mail", AttributeValue::S(record.mail.clone()))
            .item("videoPath", AttributeValue::S(record.video_path.clone()))
            .send()
            .await
            .with_context(|| format!("Failed to put item into {}", self.videos_table))?;

        Ok(())
    }

    async fn videos_for(&self, project_step: &str) -> Result<Vec<VideoMetadataRecord>> {
        let mut records = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let response = self
                .client
                .query()
                .table_name(&self.videos_table)
                .key_condition_expression("#ps = :ps")
                .expression_attribute_names("#ps", "projectStep")
                .expression_attribute_values(":ps", AttributeValue::S(project_step.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .with_context(|| format!("Failed to query {}", self.videos_table))?;

            for item in response.items() {
                records.push(video_from_item(item)?);
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }
}

fn video_from_item(item: &HashMap<String, AttributeValue>) -> Result<VideoMetadataRecord> {
    Ok(VideoMetadataRecord {
        project_step: string_attr(item, "projectStep")?,
        mail: string_attr(item, "mail")?,
        video_path: string_attr(item, "videoPath")?,
    })
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Item is missing string attribute {}", name))
}
