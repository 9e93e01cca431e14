use crate::pipeline::{self, RunOverrides};
use anyhow::{anyhow, Result};
use kwgold_core::KwGoldConfig;
use kwgold_store::available_subjects;
use rand::seq::IndexedRandom;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Background mode: run the full pipeline on a timer, picking a random
/// subject each cycle. Cycles never overlap; a failed cycle waits a
/// fixed delay and tries again.
pub async fn run(
    config: &KwGoldConfig,
    cycle_minutes: Option<u64>,
    cancel: &CancellationToken,
) -> Result<()> {
    let cycle = Duration::from_secs(
        60 * cycle_minutes
            .unwrap_or(config.scheduler.cycle_minutes)
            .max(1),
    );
    let retry = Duration::from_secs(config.scheduler.error_retry_secs.max(1));
    let mut cycle_count: u64 = 0;
    info!("scheduler started: one pipeline run every {:?}", cycle);

    while !cancel.is_cancelled() {
        cycle_count += 1;
        let subject = pick_subject(config)?;
        info!("cycle #{cycle_count}: analyzing '{subject}'");

        match pipeline::run(config, &subject, RunOverrides::default(), cancel).await {
            Ok(outcome) if outcome.interrupted => {
                info!("cycle #{cycle_count} interrupted");
                break;
            }
            Ok(outcome) => {
                info!(
                    "cycle #{cycle_count} done: {} golden of {} analyzed keywords",
                    outcome.golden, outcome.analyzed
                );
            }
            Err(e) => {
                error!("cycle #{cycle_count} failed: {e:#}");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(retry) => {}
                }
                continue;
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(cycle) => {}
        }
    }

    info!("scheduler stopped after {cycle_count} cycle(s)");
    Ok(())
}

/// A random subject from the configured list, or from the seed files on
/// disk when no list is configured.
fn pick_subject(config: &KwGoldConfig) -> Result<String> {
    let subjects = if config.scheduler.subjects.is_empty() {
        available_subjects(&config.storage.data_dir)?
    } else {
        config.scheduler.subjects.clone()
    };
    subjects
        .choose(&mut rand::rng())
        .cloned()
        .ok_or_else(|| anyhow!("no subjects available: configure scheduler.subjects or add seed files"))
}
