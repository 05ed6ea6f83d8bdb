use std::env;

/// Environment variables overriding file configuration
pub enum EnvKey {
    Region,
    UploadBucket,
    OutputBucket,
    TranscoderPipelineId,
    TranscriptsTable,
    VideosTable,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::Region => "AWS_REGION",
            EnvKey::UploadBucket => "PIPELINE_UPLOAD_BUCKET",
            EnvKey::OutputBucket => "PIPELINE_OUTPUT_BUCKET",
            EnvKey::TranscoderPipelineId => "PIPELINE_TRANSCODER_ID",
            EnvKey::TranscriptsTable => "PIPELINE_TRANSCRIPTS_TABLE",
            EnvKey::VideosTable => "PIPELINE_VIDEOS_TABLE",
        }
    }
}

/// Non-empty value of the variable, if set
pub fn get(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|value| !value.is_empty())
}
