use crate::classifier::classify;
use kwgold_core::{
    AnalyzerConfig, DocumentCountSource, Keyword, KeywordMetrics, Result, SearchVolume,
    SearchVolumeSource, TierRules, VOLUME_BATCH_LIMIT,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How keywords absent from the volume lookup are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Drop keywords the volume oracle said nothing about.
    Strict,
    /// Keep them with zero volumes and still look up their document
    /// count, so an interrupted run loses nothing it has touched.
    SaveProgress,
}

/// Outcome of one analysis pass. `interrupted` is set when a
/// cancellation cut the pass short; `metrics` then holds everything
/// computed up to the last completed batch.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub metrics: HashMap<Keyword, KeywordMetrics>,
    pub interrupted: bool,
}

/// Joins search-volume and document-count lookups into per-keyword
/// metrics, classifies each keyword into a tier, and checkpoints
/// progress at batch boundaries.
pub struct CompetitivenessAnalyzer<'a, V, D> {
    volumes: &'a V,
    documents: &'a D,
    rules: TierRules,
    config: AnalyzerConfig,
}

impl<'a, V: SearchVolumeSource, D: DocumentCountSource> CompetitivenessAnalyzer<'a, V, D> {
    pub fn new(volumes: &'a V, documents: &'a D, rules: TierRules, config: AnalyzerConfig) -> Self {
        Self {
            volumes,
            documents,
            rules,
            config,
        }
    }

    /// Query search volumes for all keywords, at most
    /// [`VOLUME_BATCH_LIMIT`] per call, strictly in order. The merged
    /// lookup is keyed by the provider's whitespace-stripped form; a
    /// failed batch degrades to "no data" for its keywords.
    async fn fetch_volumes(
        &self,
        keywords: &[Keyword],
        cancel: &CancellationToken,
    ) -> HashMap<String, SearchVolume> {
        let mut merged = HashMap::new();
        let batch_count = keywords.len().div_ceil(VOLUME_BATCH_LIMIT);
        for (index, batch) in keywords.chunks(VOLUME_BATCH_LIMIT).enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            match self.volumes.search_volumes(batch).await {
                Ok(result) => merged.extend(result),
                Err(e) => warn!("volume batch {}/{batch_count} failed: {e}", index + 1),
            }
            if index + 1 < batch_count && self.config.volume_batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.volume_batch_delay_ms)).await;
            }
        }
        merged
    }

    /// Analyze `keywords` into per-keyword metrics.
    ///
    /// The volume lookup is keyed by the cleaned keyword; the
    /// document-count lookup uses the original string. Both behaviors
    /// follow the upstream APIs and must not be unified.
    ///
    /// `checkpoint` runs after every completed batch with the metrics
    /// accumulated so far, so the caller can persist partial progress.
    /// Cancellation is observed between batches; the report then carries
    /// everything computed so far with `interrupted` set.
    pub async fn analyze<F>(
        &self,
        keywords: &[Keyword],
        mode: AnalysisMode,
        cancel: &CancellationToken,
        mut checkpoint: F,
    ) -> Result<AnalysisReport>
    where
        F: FnMut(&HashMap<Keyword, KeywordMetrics>),
    {
        let volumes = self.fetch_volumes(keywords, cancel).await;
        info!(
            "volume lookup returned {} of {} keywords",
            volumes.len(),
            keywords.len()
        );

        let mut metrics: HashMap<Keyword, KeywordMetrics> = HashMap::new();
        let mut interrupted = cancel.is_cancelled();
        let batch_size = self.config.checkpoint_batch_size.max(1);
        let batch_count = keywords.len().div_ceil(batch_size);

        for (batch_index, batch) in keywords.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }
            for keyword in batch {
                let volume = volumes.get(&keyword.cleaned());
                let (pc, mobile) = match (volume, mode) {
                    (Some(v), _) => (v.pc.normalize(), v.mobile.normalize()),
                    (None, AnalysisMode::SaveProgress) => (0, 0),
                    (None, AnalysisMode::Strict) => continue,
                };

                let document_count = self.documents.document_count(keyword).await?;
                if self.config.request_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
                }

                let mut entry = KeywordMetrics::from_counts(pc, mobile, document_count);
                entry.tier = classify(document_count, entry.total_search_volume, &self.rules);
                metrics.insert(keyword.clone(), entry);
            }

            checkpoint(&metrics);

            if batch_index + 1 < batch_count && self.config.batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }

        if interrupted {
            info!(
                "analysis interrupted with {} of {} keywords done",
                metrics.len(),
                keywords.len()
            );
        }
        Ok(AnalysisReport {
            metrics,
            interrupted,
        })
    }
}

/// Keep only the keywords whose tier is in `target_tiers`.
pub fn filter_by_target_tiers(
    metrics: &HashMap<Keyword, KeywordMetrics>,
    target_tiers: &[u8],
) -> HashMap<Keyword, KeywordMetrics> {
    metrics
        .iter()
        .filter(|(_, m)| target_tiers.contains(&m.tier))
        .map(|(k, m)| (k.clone(), m.clone()))
        .collect()
}
