use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pipeline",
    about = "Media Pipeline - transcode uploaded videos, transcribe their audio and store transcripts",
    version,
    long_about = "Handles object-created notifications from S3. Videos are transcoded into web, phone, audio and gif renditions with Elastic Transcoder, audio renditions are transcribed with Amazon Transcribe and the resulting transcripts are stored in DynamoDB."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./config.yaml, then the user config directory)
    #[arg(short, long, global = true, env = "PIPELINE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Handle a single object-created notification
    Handle {
        /// Bucket holding the new object (defaults to the configured upload bucket)
        #[arg(short, long)]
        bucket: Option<String>,

        /// Key of the new object
        #[arg(short, long)]
        key: String,
    },

    /// Handle every record of an S3 event notification document
    Event {
        /// Notification JSON file ("-" reads standard input)
        #[arg(value_name = "FILE", default_value = "-")]
        file: PathBuf,
    },

    /// Show how keys would be classified and routed
    Classify {
        /// Bucket the keys live in (defaults to the configured upload bucket)
        #[arg(short, long)]
        bucket: Option<String>,

        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,
    },

    /// Show the renditions a video key would be transcoded into
    Renditions {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Register an uploaded video against a project step
    RegisterVideo {
        #[arg(long)]
        project: String,

        #[arg(long)]
        step: String,

        /// Uploader's mail address
        #[arg(long)]
        mail: String,

        /// Storage key of the video
        #[arg(long, value_name = "KEY")]
        video_path: String,
    },

    /// List uploaded videos registered for a project step
    Videos {
        /// Composite project-step identifier
        #[arg(short, long)]
        project_step: String,
    },

    /// Show or initialise the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration to the config file location
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_handle() {
        let cli = Cli::parse_from(["pipeline", "handle", "--bucket", "videos.oico.com", "--key", "abc.mp4"]);
        match cli.command {
            Commands::Handle { bucket, key } => {
                assert_eq!(bucket.as_deref(), Some("videos.oico.com"));
                assert_eq!(key, "abc.mp4");
            }
            _ => panic!("expected handle"),
        }
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_bucket_is_optional() {
        let cli = Cli::parse_from(["pipeline", "handle", "-k", "abc.mp4"]);
        assert!(matches!(cli.command, Commands::Handle { bucket: None, .. }));

        let cli = Cli::parse_from(["pipeline", "classify", "-b", "outputvideos.oico.com", "web/abc.mp4"]);
        match cli.command {
            Commands::Classify { bucket, keys } => {
                assert_eq!(bucket.as_deref(), Some("outputvideos.oico.com"));
                assert_eq!(keys, vec!["web/abc.mp4".to_string()]);
            }
            _ => panic!("expected classify"),
        }
    }

    #[test]
    fn test_event_reads_stdin_by_default() {
        let cli = Cli::parse_from(["pipeline", "--log-format", "json", "event"]);
        assert!(matches!(cli.command, Commands::Event { ref file } if file.as_os_str() == "-"));
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
