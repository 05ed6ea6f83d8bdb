use anyhow::{Context, Result};
use aws_config::Region;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::keys::KeyRule;
use crate::transcode::catalog::{default_renditions, RenditionSpec};
use crate::transcribe::JobNameStrategy;

pub mod env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// AWS configuration
    pub aws: AwsConfig,

    /// Transcoding job settings
    pub transcoding: TranscodingConfig,

    /// Transcription job settings
    pub transcription: TranscriptionConfig,

    /// Metadata tables
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// Bucket receiving user uploads
    pub upload_bucket: String,

    /// Bucket receiving renditions
    pub output_bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodingConfig {
    /// Elastic Transcoder pipeline that runs every job
    pub pipeline_id: String,

    /// Prefix applied by the transcoder to every rendition key
    #[serde(default)]
    pub output_prefix: String,

    /// Renditions produced from each uploaded video
    pub renditions: Vec<RenditionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Fixed part of every job name
    pub job_name_prefix: String,

    /// How the unique part of a job name is generated
    pub job_name_strategy: JobNameStrategy,

    /// Media format of the audio renditions
    pub media_format: String,

    /// Sample rate of the audio renditions
    pub sample_rate: u32,

    /// Language spoken in the uploads
    pub language_code: String,

    /// Bucket for transcription results (defaults to the audio object's bucket)
    pub output_bucket: Option<String>,

    /// Rule deriving the result key from the audio key
    pub output_key: KeyRule,

    /// Query the job once after submission and log its status
    pub check_status: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Table holding one transcript per source key
    pub transcripts_table: String,

    /// Table holding uploaded video metadata
    pub videos_table: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws: AwsConfig {
                region: "us-east-1".to_string(),
                upload_bucket: "videos.oico.com".to_string(),
                output_bucket: "outputvideos.oico.com".to_string(),
            },
            transcoding: TranscodingConfig {
                pipeline_id: "".to_string(),
                output_prefix: "".to_string(),
                renditions: default_renditions(),
            },
            transcription: TranscriptionConfig {
                job_name_prefix: "transcribe-job".to_string(),
                job_name_strategy: JobNameStrategy::RandomSuffix,
                media_format: "mp3".to_string(),
                sample_rate: 44100,
                language_code: "en-US".to_string(),
                output_bucket: None,
                output_key: KeyRule::default()
                    .with_extension("json")
                    .with_segment_rename("audio", "transcribe"),
                check_status: true,
            },
            metadata: MetadataConfig {
                transcripts_table: "transcripts".to_string(),
                videos_table: "videos".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, the usual locations, or defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::config_path() {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from {}", path.display());

        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        serde_yaml::from_str(&content).context("Failed to parse config file")
    }

    /// Write the configuration as YAML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// First existing config file
    fn config_path() -> Option<PathBuf> {
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        Self::default_path().filter(|path| path.exists())
    }

    /// Per-user config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("media-pipeline").join("config.yaml"))
    }

    fn apply_env(&mut self) {
        use env::EnvKey;

        if let Some(region) = env::get(EnvKey::Region) {
            self.aws.region = region;
        }
        if let Some(bucket) = env::get(EnvKey::UploadBucket) {
            self.aws.upload_bucket = bucket;
        }
        if let Some(bucket) = env::get(EnvKey::OutputBucket) {
            self.aws.output_bucket = bucket;
        }
        if let Some(pipeline_id) = env::get(EnvKey::TranscoderPipelineId) {
            self.transcoding.pipeline_id = pipeline_id;
        }
        if let Some(table) = env::get(EnvKey::TranscriptsTable) {
            self.metadata.transcripts_table = table;
        }
        if let Some(table) = env::get(EnvKey::VideosTable) {
            self.metadata.videos_table = table;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.transcoding.renditions.is_empty() {
            anyhow::bail!("At least one rendition must be configured");
        }

        let mut prefixes = HashSet::new();
        for rendition in &self.transcoding.renditions {
            if rendition.preset_id.is_empty() {
                anyhow::bail!("Rendition {} has no preset id", rendition.label);
            }
            let prefix = rendition
                .key
                .normalized_prefix()
                .with_context(|| format!("Rendition {} must write under a prefix", rendition.label))?;
            if !prefixes.insert(prefix) {
                anyhow::bail!("Rendition prefix {} is used more than once", prefix);
            }
        }

        if self.transcription.sample_rate == 0 {
            anyhow::bail!("Transcription sample rate must be positive");
        }

        if self.transcription.job_name_prefix.is_empty() {
            anyhow::bail!("Transcription job name prefix must be configured");
        }

        if self.metadata.transcripts_table.is_empty() || self.metadata.videos_table.is_empty() {
            anyhow::bail!("Metadata table names must be configured");
        }

        Ok(())
    }

    /// Settings only needed once jobs are actually submitted
    pub fn validate_services(&self) -> Result<()> {
        if self.transcoding.pipeline_id.is_empty() {
            anyhow::bail!(
                "Transcoder pipeline id must be configured (transcoding.pipeline_id or {})",
                env::EnvKey::TranscoderPipelineId.as_str()
            );
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  AWS Region: {}", self.aws.region);
        println!("  Upload Bucket: {}", self.aws.upload_bucket);
        println!("  Output Bucket: {}", self.aws.output_bucket);
        println!("  Transcoder Pipeline: {}", self.transcoding.pipeline_id);
        if !self.transcoding.output_prefix.is_empty() {
            println!("  Output Prefix: {}", self.transcoding.output_prefix);
        }
        for rendition in &self.transcoding.renditions {
            println!("  Rendition {}: preset {}", rendition.label, rendition.preset_id);
        }
        println!(
            "  Transcription: {} {} Hz {}",
            self.transcription.media_format, self.transcription.sample_rate, self.transcription.language_code
        );
        println!("  Transcripts Table: {}", self.metadata.transcripts_table);
        println!("  Videos Table: {}", self.metadata.videos_table);
    }

    /// Get AWS region
    pub fn aws_region(&self) -> Region {
        Region::new(self.aws.region.clone())
    }
}
