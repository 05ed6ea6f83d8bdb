use anyhow::Result;
use futures_util::future::join_all;
use std::sync::Arc;

use crate::classify::classify;
use crate::config::Config;
use crate::events::StorageObjectEvent;
use crate::ingest::ResultIngestor;
use crate::metadata::{DynamoMetadataStore, TranscriptRecord};
use crate::storage::S3ObjectStore;
use crate::transcode::{catalog, ElasticTranscoder, RenditionSpec, TranscodingDispatcher};
use crate::transcribe::{AwsTranscribe, TranscriptionDispatcher};
use crate::{JobHandle, PipelineError};

pub mod stages;

pub use stages::Stage;

/// Why a notification was not dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Key suffix matches no stage
    UnknownClass,
    /// Video written by the transcoder itself
    Rendition,
}

/// Routing decision for one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dispatch(Stage),
    Skip(SkipReason),
}

/// Result of handling one notification
#[derive(Debug)]
pub enum Outcome {
    Transcoding(JobHandle),
    Transcription(JobHandle),
    Ingested(TranscriptRecord),
    Skipped(SkipReason),
}

impl Outcome {
    pub fn describe(&self) -> String {
        match self {
            Outcome::Transcoding(job) => format!("transcoding job {}", job),
            Outcome::Transcription(job) => format!("transcription job {}", job),
            Outcome::Ingested(record) => format!("stored transcript for {}", record.source_key),
            Outcome::Skipped(SkipReason::UnknownClass) => "ignored (unrecognised key)".to_string(),
            Outcome::Skipped(SkipReason::Rendition) => "ignored (rendition output)".to_string(),
        }
    }
}

/// Pure routing rules: key class plus the transcoder's own output guard
#[derive(Debug, Clone)]
pub struct Router {
    output_bucket: String,
    output_prefix: String,
    renditions: Vec<RenditionSpec>,
}

impl Router {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_bucket: config.aws.output_bucket.clone(),
            output_prefix: config.transcoding.output_prefix.clone(),
            renditions: config.transcoding.renditions.clone(),
        }
    }

    /// Whether the object was written by the transcoder itself.
    ///
    /// Renditions only land in the output bucket, so uploads under a rendition prefix still
    /// count as uploads.
    pub fn is_rendition(&self, event: &StorageObjectEvent) -> bool {
        event.bucket == self.output_bucket
            && catalog::produces(&self.renditions, &self.output_prefix, &event.key)
    }

    /// Decide what to do with a notification without doing it
    pub fn route(&self, event: &StorageObjectEvent) -> Route {
        match Stage::for_class(classify(&event.key)) {
            None => Route::Skip(SkipReason::UnknownClass),
            Some(Stage::Transcode) if self.is_rendition(event) => Route::Skip(SkipReason::Rendition),
            Some(stage) => Route::Dispatch(stage),
        }
    }
}

/// Event entry point: routes every notification to at most one stage
pub struct Orchestrator {
    router: Router,
    transcoder: TranscodingDispatcher,
    transcriber: TranscriptionDispatcher,
    ingestor: ResultIngestor,
}

impl Orchestrator {
    pub fn new(
        router: Router,
        transcoder: TranscodingDispatcher,
        transcriber: TranscriptionDispatcher,
        ingestor: ResultIngestor,
    ) -> Self {
        Self {
            router,
            transcoder,
            transcriber,
            ingestor,
        }
    }

    /// Wire the AWS-backed components. Clients are created once and shared.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate_services()?;

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(config.aws_region())
            .load()
            .await;

        let objects = Arc::new(S3ObjectStore::new(aws_sdk_s3::Client::new(&aws_config)));
        let metadata = Arc::new(DynamoMetadataStore::new(
            aws_sdk_dynamodb::Client::new(&aws_config),
            &config.metadata.transcripts_table,
            &config.metadata.videos_table,
        ));
        let transcoding = Arc::new(ElasticTranscoder::new(aws_sdk_elastictranscoder::Client::new(
            &aws_config,
        )));
        let transcription = Arc::new(AwsTranscribe::new(aws_sdk_transcribe::Client::new(&aws_config)));

        Ok(Self::new(
            Router::from_config(config),
            TranscodingDispatcher::new(transcoding, &config.transcoding),
            TranscriptionDispatcher::new(transcription, config.transcription.clone()),
            ResultIngestor::new(objects, metadata),
        ))
    }

    pub fn route(&self, event: &StorageObjectEvent) -> Route {
        self.router.route(event)
    }

    /// Handle one notification. Errors are returned to the caller, never retried here.
    pub async fn handle(&self, event: &StorageObjectEvent) -> std::result::Result<Outcome, PipelineError> {
        let route = self.route(event);
        tracing::info!("{} classified as {} -> {:?}", event, classify(&event.key), route);

        let outcome = match route {
            Route::Dispatch(Stage::Transcode) => {
                Outcome::Transcoding(self.transcoder.dispatch(&event.key).await?)
            }
            Route::Dispatch(Stage::Transcribe) => {
                Outcome::Transcription(self.transcriber.dispatch(&event.bucket, &event.key).await?)
            }
            Route::Dispatch(Stage::Ingest) => {
                Outcome::Ingested(self.ingestor.ingest(&event.bucket, &event.key).await?)
            }
            Route::Skip(reason) => {
                tracing::debug!("Nothing to do for {} ({:?})", event, reason);
                Outcome::Skipped(reason)
            }
        };

        Ok(outcome)
    }

    /// Handle independent notifications concurrently, reporting each one
    pub async fn handle_all(
        &self,
        events: &[StorageObjectEvent],
    ) -> Vec<std::result::Result<Outcome, PipelineError>> {
        join_all(events.iter().map(|event| self.handle(event))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MockMetadataStore;
    use crate::storage::MockObjectStore;
    use crate::transcode::MockTranscodingService;
    use crate::transcribe::MockTranscriptionService;

    const UPLOADS: &str = "videos.oico.com";
    const OUTPUTS: &str = "outputvideos.oico.com";

    /// Mocks that fail the test on any call not explicitly expected
    struct Services {
        transcoding: MockTranscodingService,
        transcription: MockTranscriptionService,
        objects: MockObjectStore,
        metadata: MockMetadataStore,
    }

    impl Services {
        fn idle() -> Self {
            let mut transcoding = MockTranscodingService::new();
            transcoding.expect_create_job().never();
            let mut transcription = MockTranscriptionService::new();
            transcription.expect_start_job().never();
            transcription.expect_job_status().never();
            let mut objects = MockObjectStore::new();
            objects.expect_get_object().never();
            let mut metadata = MockMetadataStore::new();
            metadata.expect_put_transcript().never();

            Self {
                transcoding,
                transcription,
                objects,
                metadata,
            }
        }

        fn orchestrator(self) -> Orchestrator {
            let mut config = Config::default();
            config.transcoding.pipeline_id = "1600000000000-abc123".to_string();
            config.transcription.check_status = false;

            Orchestrator::new(
                Router::from_config(&config),
                TranscodingDispatcher::new(Arc::new(self.transcoding), &config.transcoding),
                TranscriptionDispatcher::new(Arc::new(self.transcription), config.transcription),
                ResultIngestor::new(Arc::new(self.objects), Arc::new(self.metadata)),
            )
        }
    }

    #[tokio::test]
    async fn test_video_upload_is_transcoded_once() {
        let mut services = Services::idle();
        services.transcoding.checkpoint();
        services
            .transcoding
            .expect_create_job()
            .withf(|spec| spec.input_key == "abc.mp4")
            .times(1)
            .returning(|_| Ok("job-1".to_string()));

        let outcome = services
            .orchestrator()
            .handle(&StorageObjectEvent::new(UPLOADS, "abc.mp4"))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Transcoding(ref job) if job.id == "job-1"));
    }

    #[tokio::test]
    async fn test_audio_rendition_is_transcribed_once() {
        let mut services = Services::idle();
        services.transcription.checkpoint();
        services.transcription.expect_job_status().never();
        services
            .transcription
            .expect_start_job()
            .withf(|spec| spec.media_uri == "s3://outputvideos.oico.com/audio/abc.mp3")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = services
            .orchestrator()
            .handle(&StorageObjectEvent::new(OUTPUTS, "audio/abc.mp3"))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Transcription(_)));
    }

    #[tokio::test]
    async fn test_transcript_is_ingested_once() {
        let mut services = Services::idle();
        services.objects.checkpoint();
        services.metadata.checkpoint();
        services.objects.expect_get_object().times(1).returning(|_, _| {
            Ok(br#"{"status":"COMPLETED","results":{"transcripts":[{"transcript":"hello world"}]}}"#.to_vec())
        });
        services
            .metadata
            .expect_put_transcript()
            .times(1)
            .returning(|_| Ok(()));

        let outcome = services
            .orchestrator()
            .handle(&StorageObjectEvent::new(OUTPUTS, "transcribe/abc.json"))
            .await
            .unwrap();

        match outcome {
            Outcome::Ingested(record) => {
                assert_eq!(record.source_key, "transcribe/abc.json");
                assert_eq!(record.transcript, "hello world");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_and_rendition_keys_are_skipped() {
        let orchestrator = Services::idle().orchestrator();

        for (key, reason) in [
            ("gif/abc.gif", SkipReason::UnknownClass),
            ("notes.txt", SkipReason::UnknownClass),
            ("web/abc.mp4", SkipReason::Rendition),
            ("phone/abc.mp4", SkipReason::Rendition),
        ] {
            let outcome = orchestrator
                .handle(&StorageObjectEvent::new(OUTPUTS, key))
                .await
                .unwrap();
            assert!(matches!(outcome, Outcome::Skipped(r) if r == reason), "{key}");
        }
    }

    #[test]
    fn test_routing_is_total() {
        let orchestrator = Services::idle().orchestrator();
        let cases = [
            (UPLOADS, "abc.mp4", Route::Dispatch(Stage::Transcode)),
            (UPLOADS, "uploads/abc.mp4", Route::Dispatch(Stage::Transcode)),
            (UPLOADS, "web/abc.mp4", Route::Dispatch(Stage::Transcode)),
            (OUTPUTS, "web/abc.mp4", Route::Skip(SkipReason::Rendition)),
            (OUTPUTS, "uploads/abc.mp4", Route::Dispatch(Stage::Transcode)),
            (OUTPUTS, "audio/abc.mp3", Route::Dispatch(Stage::Transcribe)),
            (OUTPUTS, "transcribe/abc.json", Route::Dispatch(Stage::Ingest)),
            (OUTPUTS, "gif/abc.gif", Route::Skip(SkipReason::UnknownClass)),
            (UPLOADS, "", Route::Skip(SkipReason::UnknownClass)),
        ];

        for (bucket, key, expected) in cases {
            assert_eq!(
                orchestrator.route(&StorageObjectEvent::new(bucket, key)),
                expected,
                "{bucket}/{key}"
            );
        }
    }

    #[tokio::test]
    async fn test_upload_under_rendition_prefix_is_transcoded() {
        let mut services = Services::idle();
        services.transcoding.checkpoint();
        services
            .transcoding
            .expect_create_job()
            .withf(|spec| spec.input_key == "web/intro.mp4" && spec.outputs[0].output_key == "web/web/intro.mp4")
            .times(1)
            .returning(|_| Ok("job-2".to_string()));

        let outcome = services
            .orchestrator()
            .handle(&StorageObjectEvent::new(UPLOADS, "web/intro.mp4"))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Transcoding(ref job) if job.id == "job-2"));
    }

    #[test]
    fn test_rendition_guard_follows_configured_output_bucket() {
        let mut config = Config::default();
        config.aws.output_bucket = "renditions.example.com".to_string();
        let router = Router::from_config(&config);

        let event = StorageObjectEvent::new("renditions.example.com", "phone/abc.mp4");
        assert!(router.is_rendition(&event));
        assert_eq!(router.route(&event), Route::Skip(SkipReason::Rendition));

        let event = StorageObjectEvent::new(OUTPUTS, "phone/abc.mp4");
        assert!(!router.is_rendition(&event));
        assert_eq!(router.route(&event), Route::Dispatch(Stage::Transcode));
    }

    #[tokio::test]
    async fn test_dispatch_failure_surfaces() {
        let mut services = Services::idle();
        services.transcoding.checkpoint();
        services
            .transcoding
            .expect_create_job()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("ValidationException: pipeline not found")));

        let err = services
            .orchestrator()
            .handle(&StorageObjectEvent::new(UPLOADS, "abc.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Dispatch { stage: "transcoding", .. }));
    }

    #[tokio::test]
    async fn test_handle_all_reports_every_event() {
        let mut services = Services::idle();
        services.transcoding.checkpoint();
        services
            .transcoding
            .expect_create_job()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("ThrottlingException")));

        let events = vec![
            StorageObjectEvent::new(UPLOADS, "abc.mp4"),
            StorageObjectEvent::new(OUTPUTS, "gif/abc.gif"),
        ];
        let results = services.orchestrator().handle_all(&events).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(matches!(results[1], Ok(Outcome::Skipped(SkipReason::UnknownClass))));
    }
}
