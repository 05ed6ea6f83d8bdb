//! Media Pipeline - event-driven processing for uploaded videos
//!
//! Every object-created notification from storage is classified by its key and routed to
//! exactly one stage: transcoding (video), transcription (audio) or transcript ingestion
//! (JSON). Stage outputs land back in storage and re-enter the pipeline as new notifications.

pub mod classify;
pub mod cli;
pub mod config;
pub mod events;
pub mod ingest;
pub mod keys;
pub mod metadata;
pub mod pipeline;
pub mod storage;
pub mod transcode;
pub mod transcribe;

pub use classify::{classify, MediaClass};
pub use cli::{Cli, Commands, LogFormat};
pub use config::Config;
pub use events::StorageObjectEvent;
pub use ingest::ResultIngestor;
pub use metadata::{MetadataStore, TranscriptRecord, VideoMetadataRecord};
pub use pipeline::{Orchestrator, Outcome, Stage};
pub use storage::ObjectStore;
pub use transcode::{TranscodingDispatcher, TranscodingService};
pub use transcribe::{TranscriptionDispatcher, TranscriptionService};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Boxed upstream cause carried by [`PipelineError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Opaque identifier of a job accepted by an external service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Error types surfaced to the event-delivery system
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("{stage} job submission failed for {key}: {source}")]
    Dispatch {
        stage: &'static str,
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to fetch s3://{bucket}/{key}: {source}")]
    Storage {
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Transcript {key} is not valid JSON: {source}")]
    Parse {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Transcript {key} has unexpected shape: {reason}")]
    Schema { key: String, reason: String },

    #[error("Failed to persist {record} record for {key}: {source}")]
    Persist {
        record: &'static str,
        key: String,
        #[source]
        source: BoxError,
    },
}
