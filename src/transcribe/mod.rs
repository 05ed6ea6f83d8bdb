use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_transcribe::types::{LanguageCode, Media, MediaFormat};
use aws_sdk_transcribe::Client as TranscribeClient;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::TranscriptionConfig;
use crate::events::StorageObjectEvent;
use crate::{JobHandle, PipelineError};

/// A speech-to-text job for one audio object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionJobSpec {
    /// Unique among the service's active jobs
    pub job_name: String,
    pub media_uri: String,
    pub sample_rate_hz: u32,
    pub format: String,
    pub language_code: String,
    pub output_bucket: String,
    pub output_key: String,
}

/// How the variable part of a job name is generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobNameStrategy {
    /// Five random decimal digits
    RandomSuffix,
    /// Random v4 UUID
    Uuid,
}

impl JobNameStrategy {
    pub fn job_name(&self, prefix: &str) -> String {
        match self {
            JobNameStrategy::RandomSuffix => {
                let suffix: u32 = rand::rng().random_range(10_000..100_000);
                format!("{}-{}", prefix, suffix)
            }
            JobNameStrategy::Uuid => format!("{}-{}", prefix, Uuid::new_v4()),
        }
    }
}

/// External transcription service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn start_job(&self, spec: &TranscriptionJobSpec) -> Result<()>;

    /// Current status of a job, as reported by the service
    async fn job_status(&self, job_name: &str) -> Result<String>;
}

/// Amazon Transcribe
pub struct AwsTranscribe {
    client: TranscribeClient,
}

impl AwsTranscribe {
    pub fn new(client: TranscribeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TranscriptionService for AwsTranscribe {
    async fn start_job(&self, spec: &TranscriptionJobSpec) -> Result<()> {
        let sample_rate = i32::try_from(spec.sample_rate_hz).context("Sample rate out of range")?;

        let media = Media::builder().media_file_uri(&spec.media_uri).build();

        self.client
            .start_transcription_job()
            .transcription_job_name(&spec.job_name)
            .language_code(LanguageCode::from(spec.language_code.as_str()))
            .media_sample_rate_hertz(sample_rate)
            .media_format(MediaFormat::from(spec.format.as_str()))
            .media(media)
            .output_bucket_name(&spec.output_bucket)
            .output_key(&spec.output_key)
            .send()
            .await
            .context("Failed to start transcription job")?;

        Ok(())
    }

    async fn job_status(&self, job_name: &str) -> Result<String> {
        let response = self
            .client
            .get_transcription_job()
            .transcription_job_name(job_name)
            .send()
            .await
            .context("Failed to get transcription job status")?;

        let status = response
            .transcription_job()
            .and_then(|job| job.transcription_job_status())
            .map(|status| status.as_str().to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string());

        Ok(status)
    }
}

/// Starts one transcription job per audio rendition
pub struct TranscriptionDispatcher {
    service: Arc<dyn TranscriptionService>,
    settings: TranscriptionConfig,
}

impl TranscriptionDispatcher {
    pub fn new(service: Arc<dyn TranscriptionService>, settings: TranscriptionConfig) -> Self {
        Self { service, settings }
    }

    /// Key the transcription result is written to
    pub fn output_key(&self, key: &str) -> String {
        self.settings.output_key.apply(key)
    }

    pub fn build_job(&self, job_name: String, bucket: &str, key: &str) -> TranscriptionJobSpec {
        TranscriptionJobSpec {
            job_name,
            media_uri: StorageObjectEvent::new(bucket, key).uri(),
            sample_rate_hz: self.settings.sample_rate,
            format: self.settings.media_format.clone(),
            language_code: self.settings.language_code.clone(),
            output_bucket: self
                .settings
                .output_bucket
                .clone()
                .unwrap_or_else(|| bucket.to_string()),
            output_key: self.output_key(key),
        }
    }

    /// Start the job and return without waiting for it
    pub async fn dispatch(&self, bucket: &str, key: &str) -> std::result::Result<JobHandle, PipelineError> {
        let job_name = self
            .settings
            .job_name_strategy
            .job_name(&self.settings.job_name_prefix);
        let spec = self.build_job(job_name, bucket, key);

        tracing::info!(
            "Starting transcription job {} for {} -> s3://{}/{}",
            spec.job_name,
            spec.media_uri,
            spec.output_bucket,
            spec.output_key
        );

        self.service
            .start_job(&spec)
            .await
            .map_err(|e| PipelineError::Dispatch {
                stage: "transcription",
                key: key.to_string(),
                source: e.into(),
            })?;

        if self.settings.check_status {
            match self.service.job_status(&spec.job_name).await {
                Ok(status) => tracing::info!("Transcription job {} is {}", spec.job_name, status),
                Err(e) => tracing::warn!("Could not read status of {}: {:#}", spec.job_name, e),
            }
        }

        Ok(JobHandle { id: spec.job_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use mockall::predicate::*;

    fn settings() -> TranscriptionConfig {
        Config::default().transcription
    }

    #[test]
    fn test_random_suffix_names_have_five_digits() {
        for _ in 0..100 {
            let name = JobNameStrategy::RandomSuffix.job_name("transcribe-job");
            let suffix = name.strip_prefix("transcribe-job-").unwrap();
            assert_eq!(suffix.len(), 5);
            assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_uuid_names_are_distinct() {
        let a = JobNameStrategy::Uuid.job_name("transcribe-job");
        let b = JobNameStrategy::Uuid.job_name("transcribe-job");
        assert_ne!(a, b);
        assert!(a.starts_with("transcribe-job-"));
    }

    #[test]
    fn test_build_job_derives_uri_and_output() {
        let dispatcher = TranscriptionDispatcher::new(Arc::new(MockTranscriptionService::new()), settings());
        let spec = dispatcher.build_job("job-1".to_string(), "outputvideos.oico.com", "audio/abc.mp3");

        assert_eq!(
            spec,
            TranscriptionJobSpec {
                job_name: "job-1".to_string(),
                media_uri: "s3://outputvideos.oico.com/audio/abc.mp3".to_string(),
                sample_rate_hz: 44100,
                format: "mp3".to_string(),
                language_code: "en-US".to_string(),
                output_bucket: "outputvideos.oico.com".to_string(),
                output_key: "transcribe/abc.json".to_string(),
            }
        );
    }

    #[test]
    fn test_build_job_uses_configured_output_bucket() {
        let mut settings = settings();
        settings.output_bucket = Some("transcripts.oico.com".to_string());
        let dispatcher = TranscriptionDispatcher::new(Arc::new(MockTranscriptionService::new()), settings);

        let spec = dispatcher.build_job("job-1".to_string(), "outputvideos.oico.com", "audio/abc.mp3");
        assert_eq!(spec.output_bucket, "transcripts.oico.com");
    }

    #[test]
    fn test_output_key_of_prefixed_key() {
        let dispatcher = TranscriptionDispatcher::new(Arc::new(MockTranscriptionService::new()), settings());
        assert_eq!(
            dispatcher.output_key("outputvideos.oico.com/audio/abc.mp3"),
            "outputvideos.oico.com/transcribe/abc.json"
        );
    }

    #[tokio::test]
    async fn test_dispatch_starts_job_then_checks_status_once() {
        let mut service = MockTranscriptionService::new();
        let mut seq = mockall::Sequence::new();
        service
            .expect_start_job()
            .withf(|spec| spec.job_name.starts_with("transcribe-job-") && spec.output_key == "transcribe/abc.json")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        service
            .expect_job_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("IN_PROGRESS".to_string()));

        let dispatcher = TranscriptionDispatcher::new(Arc::new(service), settings());
        let handle = dispatcher.dispatch("outputvideos.oico.com", "audio/abc.mp3").await.unwrap();

        assert!(handle.id.starts_with("transcribe-job-"));
    }

    #[tokio::test]
    async fn test_status_check_failure_is_not_an_error() {
        let mut service = MockTranscriptionService::new();
        service.expect_start_job().times(1).returning(|_| Ok(()));
        service
            .expect_job_status()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("AccessDenied")));

        let dispatcher = TranscriptionDispatcher::new(Arc::new(service), settings());
        tokio_test::assert_ok!(dispatcher.dispatch("outputvideos.oico.com", "audio/abc.mp3").await);
    }

    #[tokio::test]
    async fn test_dispatch_failure_skips_status_check() {
        let mut service = MockTranscriptionService::new();
        service
            .expect_start_job()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("ConflictException: job name exists")));
        service.expect_job_status().never();

        let dispatcher = TranscriptionDispatcher::new(Arc::new(service), settings());
        let err = dispatcher
            .dispatch("outputvideos.oico.com", "audio/abc.mp3")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Dispatch { stage: "transcription", .. }));
    }

    #[tokio::test]
    async fn test_status_check_can_be_disabled() {
        let mut service = MockTranscriptionService::new();
        service.expect_start_job().with(always()).times(1).returning(|_| Ok(()));
        service.expect_job_status().never();

        let mut settings = settings();
        settings.check_status = false;
        settings.job_name_strategy = JobNameStrategy::Uuid;

        let dispatcher = TranscriptionDispatcher::new(Arc::new(service), settings);
        let handle = dispatcher.dispatch("outputvideos.oico.com", "audio/abc.mp3").await.unwrap();
        assert_eq!(handle.id.len(), "transcribe-job-".len() + 36);
    }
}
