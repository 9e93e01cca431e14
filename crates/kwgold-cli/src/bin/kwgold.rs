use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kwgold_cli::{pipeline, scheduler};
use kwgold_core::{Keyword, KwGoldConfig, SearchVolumeSource};
use kwgold_oracle::SearchAdClient;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};

#[derive(Parser)]
#[command(
    name = "kwgold",
    version,
    author,
    about = "Golden-keyword research: expand seed keywords, score competitiveness, keep the winners"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(long, global = true, help = "Also write logs to a file under logs/")]
    log_file: bool,

    #[arg(long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the pipeline once for a subject")]
    Run {
        #[arg(help = "Keyword subject; names a seed file under the data directory")]
        subject: String,

        #[arg(
            short,
            long,
            value_delimiter = ',',
            help = "Seed keywords, overriding the subject's seed file"
        )]
        seeds: Option<Vec<String>>,

        #[arg(long, help = "Maximum size of the expanded keyword pool")]
        max_keywords: Option<usize>,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Competitiveness tiers to keep (1-5)"
        )]
        tiers: Option<Vec<u8>>,
    },

    #[command(about = "Run the pipeline on a timer with a random subject each cycle")]
    Watch {
        #[arg(long, help = "Minutes between cycles")]
        cycle_minutes: Option<u64>,
    },

    #[command(about = "Query the search-volume oracle for a few keywords and print raw results")]
    Debug {
        #[arg(required = true, help = "Keywords to look up")]
        keywords: Vec<String>,
    },

    #[command(about = "List subjects that have a seed file")]
    Subjects,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file)?;

    let config = KwGoldConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; saving progress before exit");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Run {
            subject,
            seeds,
            max_keywords,
            tiers,
        } => {
            let overrides = pipeline::RunOverrides {
                seeds: seeds.unwrap_or_default(),
                max_pool_size: max_keywords,
                target_tiers: tiers,
            };
            let outcome = pipeline::run(&config, &subject, overrides, &cancel).await?;
            if outcome.interrupted {
                bail!("interrupted; partial results for '{subject}' were saved");
            }
        }
        Commands::Watch { cycle_minutes } => {
            scheduler::run(&config, cycle_minutes, &cancel).await?;
        }
        Commands::Debug { keywords } => {
            debug_volumes(&config, &keywords).await?;
        }
        Commands::Subjects => {
            let subjects = kwgold_store::available_subjects(&config.storage.data_dir)?;
            if subjects.is_empty() {
                println!(
                    "no seed files found under {}",
                    config.storage.data_dir.display()
                );
            }
            for subject in subjects {
                println!("{subject}");
            }
        }
    }

    Ok(())
}

/// Stdout logging, plus an optional per-run non-ANSI file layer.
fn init_logging(
    verbose: bool,
    to_file: bool,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
    };

    if to_file {
        std::fs::create_dir_all("logs")?;
        let file_name = format!("kwgold_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never("logs", &file_name));
        let subscriber = Registry::default()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            );
        tracing::subscriber::set_global_default(subscriber).ok();
        println!("log file: logs/{file_name}");
        Ok(Some(guard))
    } else {
        let subscriber = Registry::default()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer());
        tracing::subscriber::set_global_default(subscriber).ok();
        Ok(None)
    }
}

/// Mirror of the keyword-tool lookup for troubleshooting credentials and
/// odd keywords: one batch per keyword, raw outcomes printed.
async fn debug_volumes(config: &KwGoldConfig, keywords: &[String]) -> Result<()> {
    let client = SearchAdClient::new(&config.oracle, config.credentials.search_ad.clone())?;
    for raw in keywords {
        let keyword = Keyword::new(raw);
        match client.search_volumes(std::slice::from_ref(&keyword)).await {
            Ok(volumes) if volumes.is_empty() => println!("{keyword}: no data"),
            Ok(volumes) => {
                for (reported, volume) in volumes {
                    println!(
                        "{keyword} -> {reported}: pc={} mobile={}",
                        volume.pc.normalize(),
                        volume.mobile.normalize()
                    );
                }
            }
            Err(e) => println!("{keyword}: lookup failed: {e}"),
        }
    }
    Ok(())
}
