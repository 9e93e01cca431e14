use anyhow::{bail, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use kwgold_core::{
    DocumentCountSource, Keyword, KeywordMetrics, KwGoldConfig, RelatedKeywordSource,
    SearchVolumeSource, TierRules,
};
use kwgold_engine::{
    filter_by_target_tiers, AnalysisMode, CompetitivenessAnalyzer, KeywordExpander,
};
use kwgold_oracle::{AutocompleteClient, OpenApiClient, SearchAdClient};
use kwgold_store::{
    load_seed_keywords, ArtifactWriter, JsonTableStore, KeywordTableStore,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line overrides for one run.
#[derive(Debug, Default, Clone)]
pub struct RunOverrides {
    /// Seed keywords; empty means read the subject's seed file.
    pub seeds: Vec<String>,
    pub max_pool_size: Option<usize>,
    pub target_tiers: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub expanded: usize,
    pub analyzed: usize,
    pub golden: usize,
    pub interrupted: bool,
}

/// One full pipeline run against the live oracles: seeds → expansion →
/// analysis with checkpoint persistence → tier filter → persisted table.
pub async fn run(
    config: &KwGoldConfig,
    subject: &str,
    overrides: RunOverrides,
    cancel: &CancellationToken,
) -> Result<RunOutcome> {
    let mut config = config.clone();
    if let Some(max) = overrides.max_pool_size {
        config.expansion.max_pool_size = max;
    }
    if let Some(tiers) = overrides.target_tiers {
        config.analyzer.target_tiers = tiers;
    }

    let seeds: Vec<Keyword> = if overrides.seeds.is_empty() {
        load_seed_keywords(
            &config.storage.data_dir,
            subject,
            config.expansion.max_seeds,
        )
        .with_context(|| format!("failed to load seed keywords for '{subject}'"))?
    } else {
        let mut seeds: Vec<Keyword> = overrides
            .seeds
            .iter()
            .map(Keyword::new)
            .filter(|keyword| !keyword.is_empty())
            .collect();
        if seeds.len() > config.expansion.max_seeds {
            warn!(
                "seed list truncated from {} to {}",
                seeds.len(),
                config.expansion.max_seeds
            );
            seeds.truncate(config.expansion.max_seeds);
        }
        seeds
    };
    if seeds.is_empty() {
        bail!("no usable seed keywords for subject '{subject}'");
    }

    let rules = TierRules::load(&config.storage.tier_rules)?;
    if rules.is_empty() {
        warn!("tier rule table is empty; every keyword will classify as tier 0");
    }

    let autocomplete = AutocompleteClient::new(&config.oracle)?;
    let search_ad = SearchAdClient::new(&config.oracle, config.credentials.search_ad.clone())?;
    let open_api = OpenApiClient::new(&config.oracle, config.credentials.open_api.clone())?;

    run_with(
        &config,
        subject,
        seeds,
        rules,
        &autocomplete,
        &search_ad,
        &open_api,
        cancel,
    )
    .await
}

/// The pipeline with its oracles injected; `run` wires up the live
/// clients, tests wire up scripted ones.
#[allow(clippy::too_many_arguments)]
pub async fn run_with<R, V, D>(
    config: &KwGoldConfig,
    subject: &str,
    seeds: Vec<Keyword>,
    rules: TierRules,
    related: &R,
    volumes: &V,
    documents: &D,
    cancel: &CancellationToken,
) -> Result<RunOutcome>
where
    R: RelatedKeywordSource,
    V: SearchVolumeSource,
    D: DocumentCountSource,
{
    info!("subject '{subject}': expanding from {} seed(s)", seeds.len());
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("expanding '{subject}'"));

    let expander = KeywordExpander::new(related, config.expansion.clone());
    let pool = expander.expand(&seeds, cancel).await?;
    spinner.finish_with_message(format!("{} keywords discovered", pool.len()));

    let artifacts = ArtifactWriter::new(&config.storage.artifact_dir);
    match artifacts.write_keyword_list(subject, &pool) {
        Ok(path) => info!("expanded keyword list saved to {}", path.display()),
        Err(e) => warn!("could not save the expanded keyword list: {e}"),
    }

    let store = JsonTableStore::new(config.storage.table_dir.join(format!("{subject}.json")));
    let target_tiers = config.analyzer.target_tiers.clone();
    let keep_classified_only = config.analyzer.keep_classified_only;

    let analyzer = CompetitivenessAnalyzer::new(volumes, documents, rules, config.analyzer.clone());
    let checkpoint = |metrics: &HashMap<Keyword, KeywordMetrics>| {
        let golden = filter_by_target_tiers(metrics, &target_tiers);
        if golden.is_empty() {
            return;
        }
        if let Err(e) = persist(&store, &golden, keep_classified_only) {
            warn!("checkpoint save failed: {e}");
        }
    };
    let report = analyzer
        .analyze(&pool, AnalysisMode::SaveProgress, cancel, checkpoint)
        .await?;

    match artifacts.write_analysis(subject, &report.metrics) {
        Ok(path) => info!("full analysis saved to {}", path.display()),
        Err(e) => warn!("could not save the full analysis: {e}"),
    }

    let golden = filter_by_target_tiers(&report.metrics, &target_tiers);
    persist(&store, &golden, keep_classified_only)
        .with_context(|| format!("failed to persist golden keywords for '{subject}'"))?;
    print_summary(subject, &golden);

    if report.interrupted {
        warn!(
            "run interrupted; {} analyzed keywords were saved to {}",
            report.metrics.len(),
            store.path().display()
        );
    }
    Ok(RunOutcome {
        expanded: pool.len(),
        analyzed: report.metrics.len(),
        golden: golden.len(),
        interrupted: report.interrupted,
    })
}

fn persist(
    store: &JsonTableStore,
    golden: &HashMap<Keyword, KeywordMetrics>,
    drop_unclassified: bool,
) -> kwgold_core::Result<()> {
    let mut table = store.load()?;
    table.merge(golden, drop_unclassified);
    store.store(&table)
}

fn print_summary(subject: &str, golden: &HashMap<Keyword, KeywordMetrics>) {
    if golden.is_empty() {
        println!(
            "{}",
            format!("no golden keywords found for '{subject}'").yellow()
        );
        return;
    }
    let mut rows: Vec<(&Keyword, &KeywordMetrics)> = golden.iter().collect();
    rows.sort_by(|a, b| {
        a.1.competitiveness_ratio
            .total_cmp(&b.1.competitiveness_ratio)
    });
    println!(
        "{}",
        format!("golden keywords for '{subject}' ({})", rows.len())
            .green()
            .bold()
    );
    println!(
        "{:<24} {:>10} {:>10} {:>12} {:>6}",
        "keyword", "volume", "documents", "ratio", "tier"
    );
    for (keyword, m) in rows {
        // ratio 0.0 with zero volume means "no data", not free reach
        let ratio = if m.total_search_volume == 0 {
            format!("{:.3}*", m.competitiveness_ratio)
        } else {
            format!("{:.3}", m.competitiveness_ratio)
        };
        println!(
            "{:<24} {:>10} {:>10} {:>12} {:>6}",
            keyword, m.total_search_volume, m.document_count, ratio, m.tier
        );
    }
}
