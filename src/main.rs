use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_pipeline::classify::{classify, MediaClass};
use media_pipeline::events::{self, StorageObjectEvent};
use media_pipeline::metadata::{DynamoMetadataStore, MetadataStore, VideoMetadataRecord};
use media_pipeline::pipeline::{Orchestrator, Route, Router, SkipReason};
use media_pipeline::transcode::catalog;
use media_pipeline::{Cli, Commands, Config, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Handle { bucket, key } => {
            let config = Config::load(config_path)?;
            let orchestrator = Orchestrator::from_config(&config).await?;

            let bucket = bucket.unwrap_or_else(|| config.aws.upload_bucket.clone());
            let event = StorageObjectEvent::new(bucket, key);
            let outcome = orchestrator.handle(&event).await?;
            println!("{}: {}", event, outcome.describe());
        }
        Commands::Event { file } => {
            let body = if file.as_os_str() == "-" {
                let mut body = String::new();
                std::io::stdin()
                    .read_to_string(&mut body)
                    .context("Failed to read notification from stdin")?;
                body
            } else {
                fs_err::read_to_string(&file).context("Failed to read notification file")?
            };

            let events = events::parse_notification(&body)?;
            if events.is_empty() {
                tracing::info!("Notification contains no object-created records");
                return Ok(());
            }

            let config = Config::load(config_path)?;
            let orchestrator = Orchestrator::from_config(&config).await?;

            let results = orchestrator.handle_all(&events).await;
            let mut failed = 0;
            for (event, result) in events.iter().zip(results) {
                match result {
                    Ok(outcome) => println!("{}: {}", event, outcome.describe()),
                    Err(e) => {
                        failed += 1;
                        tracing::error!("{}: {:#}", event, anyhow::Error::from(e));
                    }
                }
            }

            if failed > 0 {
                anyhow::bail!("{} of {} notifications failed", failed, events.len());
            }
        }
        Commands::Classify { bucket, keys } => {
            let config = Config::load(config_path)?;
            let router = Router::from_config(&config);
            let bucket = bucket.unwrap_or_else(|| config.aws.upload_bucket.clone());
            for key in keys {
                let event = StorageObjectEvent::new(bucket.clone(), key);
                let route = match router.route(&event) {
                    Route::Dispatch(stage) => stage.to_string(),
                    Route::Skip(SkipReason::Rendition) => "- (rendition, not transcode)".to_string(),
                    Route::Skip(SkipReason::UnknownClass) => "-".to_string(),
                };
                println!("{}\t{}\t{}", event.key, classify(&event.key), route);
            }
        }
        Commands::Renditions { key } => {
            let config = Config::load(config_path)?;
            if classify(&key) != MediaClass::Video {
                anyhow::bail!("{} is not a video key ({})", key, classify(&key));
            }

            let outputs = catalog::plan(&config.transcoding.renditions, &key);
            for (rendition, output) in config.transcoding.renditions.iter().zip(outputs) {
                println!(
                    "{}\t{}{}\t{}",
                    rendition.label, config.transcoding.output_prefix, output.output_key, output.preset_id
                );
            }
        }
        Commands::RegisterVideo {
            project,
            step,
            mail,
            video_path,
        } => {
            let config = Config::load(config_path)?;
            let store = metadata_store(&config).await;

            let record = VideoMetadataRecord::new(&project, &step, mail, video_path);
            store.put_video(&record).await?;
            println!("Registered {} for {}", record.video_path, record.project_step);
        }
        Commands::Videos { project_step } => {
            let config = Config::load(config_path)?;
            let store = metadata_store(&config).await;

            let videos = store.videos_for(&project_step).await?;
            if videos.is_empty() {
                println!("No videos registered for {}", project_step);
            }
            for video in videos {
                println!("{}\t{}\t{}", video.project_step, video.mail, video.video_path);
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = match config_path {
                    Some(path) => path.to_path_buf(),
                    None => Config::default_path().context("Could not determine config directory")?,
                };
                Config::default().save(&path)?;
                println!("Default configuration written to: {}", path.display());
            } else {
                let config = Config::load(config_path)?;
                config.display();
                if !show {
                    if let Some(path) = Config::default_path() {
                        println!("Edit the config file to change settings: {}", path.display());
                    }
                }
            }
        }
    }

    Ok(())
}

async fn metadata_store(config: &Config) -> DynamoMetadataStore {
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(config.aws_region())
        .load()
        .await;

    DynamoMetadataStore::new(
        aws_sdk_dynamodb::Client::new(&aws_config),
        &config.metadata.transcripts_table,
        &config.metadata.videos_table,
    )
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_filter = if verbose {
        "media_pipeline=debug,pipeline=debug"
    } else {
        "media_pipeline=info,pipeline=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}
