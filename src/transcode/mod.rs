use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_elastictranscoder::types::{CreateJobOutput, JobInput};
use aws_sdk_elastictranscoder::Client as TranscoderClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::TranscodingConfig;
use crate::{JobHandle, PipelineError};

pub mod catalog;

pub use catalog::{RenditionOutput, RenditionSpec};

/// A transcoding job covering every rendition of one input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodingJobSpec {
    pub pipeline_id: String,
    pub input_key: String,
    pub outputs: Vec<RenditionOutput>,
    pub output_prefix: String,
}

/// External transcoding service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodingService: Send + Sync {
    /// Submit a job and return the service's job id
    async fn create_job(&self, spec: &TranscodingJobSpec) -> Result<String>;
}

/// Amazon Elastic Transcoder
pub struct ElasticTranscoder {
    client: TranscoderClient,
}

impl ElasticTranscoder {
    pub fn new(client: TranscoderClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TranscodingService for ElasticTranscoder {
    async fn create_job(&self, spec: &TranscodingJobSpec) -> Result<String> {
        let mut request = self
            .client
            .create_job()
            .pipeline_id(&spec.pipeline_id)
            .input(JobInput::builder().key(&spec.input_key).build());

        for output in &spec.outputs {
            request = request.outputs(
                CreateJobOutput::builder()
                    .key(&output.output_key)
                    .preset_id(&output.preset_id)
                    .build(),
            );
        }

        if !spec.output_prefix.is_empty() {
            request = request.output_key_prefix(&spec.output_prefix);
        }

        let response = request
            .send()
            .await
            .context("Failed to create transcoding job")?;

        response
            .job()
            .and_then(|job| job.id())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Transcoder accepted the job without returning an id"))
    }
}

/// Submits one transcoding job per uploaded video
pub struct TranscodingDispatcher {
    service: Arc<dyn TranscodingService>,
    pipeline_id: String,
    output_prefix: String,
    renditions: Vec<RenditionSpec>,
}

impl TranscodingDispatcher {
    pub fn new(service: Arc<dyn TranscodingService>, config: &TranscodingConfig) -> Self {
        Self {
            service,
            pipeline_id: config.pipeline_id.clone(),
            output_prefix: config.output_prefix.clone(),
            renditions: config.renditions.clone(),
        }
    }

    /// Job description for `input_key`
    pub fn build_job(&self, input_key: &str) -> TranscodingJobSpec {
        TranscodingJobSpec {
            pipeline_id: self.pipeline_id.clone(),
            input_key: input_key.to_string(),
            outputs: catalog::plan(&self.renditions, input_key),
            output_prefix: self.output_prefix.clone(),
        }
    }

    /// Submit a single job bundling every rendition. No retry, no polling.
    pub async fn dispatch(&self, input_key: &str) -> std::result::Result<JobHandle, PipelineError> {
        let spec = self.build_job(input_key);

        tracing::info!(
            "Submitting transcoding job for {} ({} renditions) to pipeline {}",
            input_key,
            spec.outputs.len(),
            spec.pipeline_id
        );
        for output in &spec.outputs {
            tracing::debug!("  {} <- preset {}", output.output_key, output.preset_id);
        }

        let id = self
            .service
            .create_job(&spec)
            .await
            .map_err(|e| PipelineError::Dispatch {
                stage: "transcoding",
                key: input_key.to_string(),
                source: e.into(),
            })?;

        tracing::info!("Transcoding job {} created for {}", id, input_key);
        Ok(JobHandle { id })
    }
}
