use async_trait::async_trait;
use kwgold_cli::pipeline::{run_with, RunOutcome};
use kwgold_core::{
    DocumentCountSource, Keyword, KwGoldConfig, RawVolume, RelatedKeywordSource, Result,
    SearchVolume, SearchVolumeSource, TierRule, TierRules,
};
use kwgold_store::{JsonTableStore, KeywordTableStore};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

struct ScriptedRelated {
    graph: HashMap<String, Vec<String>>,
}

impl ScriptedRelated {
    fn new(edges: &[(&str, &[&str])]) -> Self {
        Self {
            graph: edges
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
        }
    }
}

#[async_trait]
impl RelatedKeywordSource for ScriptedRelated {
    async fn related(&self, keyword: &Keyword) -> Result<Vec<Keyword>> {
        Ok(self
            .graph
            .get(keyword.as_str())
            .map(|related| related.iter().map(Keyword::new).collect())
            .unwrap_or_default())
    }
}

struct TableVolumes {
    table: HashMap<String, SearchVolume>,
}

impl TableVolumes {
    fn new(entries: &[(&str, u64, u64)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(k, pc, mobile)| {
                    (
                        k.to_string(),
                        SearchVolume {
                            pc: RawVolume::Count(*pc),
                            mobile: RawVolume::Count(*mobile),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl SearchVolumeSource for TableVolumes {
    async fn search_volumes(&self, keywords: &[Keyword]) -> Result<HashMap<String, SearchVolume>> {
        assert!(keywords.len() <= 5, "volume batch exceeded the API limit");
        Ok(keywords
            .iter()
            .filter_map(|k| {
                let cleaned = k.cleaned();
                self.table.get(&cleaned).map(|v| (cleaned, v.clone()))
            })
            .collect())
    }
}

struct TableCounts {
    table: HashMap<String, u64>,
    calls: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl TableCounts {
    fn new(entries: &[(&str, u64)]) -> Self {
        Self {
            table: entries.iter().map(|(k, n)| (k.to_string(), *n)).collect(),
            calls: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    fn cancelling(entries: &[(&str, u64)], after: usize, cancel: CancellationToken) -> Self {
        let mut counts = Self::new(entries);
        counts.cancel_after = Some((after, cancel));
        counts
    }
}

#[async_trait]
impl DocumentCountSource for TableCounts {
    async fn document_count(&self, keyword: &Keyword) -> Result<u64> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, cancel)) = &self.cancel_after {
            if n >= *after {
                cancel.cancel();
            }
        }
        Ok(self.table.get(keyword.as_str()).copied().unwrap_or(0))
    }
}

fn test_config(root: &Path) -> KwGoldConfig {
    let mut config = KwGoldConfig::default();
    config.storage.data_dir = root.join("keywords");
    config.storage.table_dir = root.join("gold");
    config.storage.artifact_dir = root.join("runs");
    config.storage.tier_rules = root.join("tiers.yaml");
    config.expansion.request_delay_ms = 0;
    config.analyzer.volume_batch_delay_ms = 0;
    config.analyzer.request_delay_ms = 0;
    config.analyzer.batch_delay_ms = 0;
    config
}

fn rules() -> TierRules {
    TierRules::new([
        Some(TierRule {
            max_documents: Some(100),
            min_volume: 0,
            max_volume: Some(1000),
        }),
        Some(TierRule {
            max_documents: Some(10_000),
            min_volume: 0,
            max_volume: Some(100_000),
        }),
        None,
        None,
        None,
    ])
}

#[tokio::test]
async fn full_run_persists_tier_filtered_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let related = ScriptedRelated::new(&[("게임", &["모바일게임", "온라인게임"])]);
    let volumes = TableVolumes::new(&[
        ("게임", 5000, 5000),
        ("모바일게임", 400, 400),
        ("온라인게임", 10, 10),
    ]);
    // 게임: tier 2 (10000 >= 9000); 모바일게임: tier 1 (50 docs, 800 vol);
    // 온라인게임: volume 20 but 90000 documents -> no tier
    let documents = TableCounts::new(&[
        ("게임", 9000),
        ("모바일게임", 50),
        ("온라인게임", 90_000),
    ]);

    let outcome: RunOutcome = run_with(
        &config,
        "게임",
        vec![Keyword::new("게임")],
        rules(),
        &related,
        &volumes,
        &documents,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.expanded, 3);
    assert_eq!(outcome.analyzed, 3);
    assert_eq!(outcome.golden, 2);
    assert!(!outcome.interrupted);

    let store = JsonTableStore::new(dir.path().join("gold").join("게임.json"));
    let table = store.load().unwrap();
    assert_eq!(table.len(), 2);
    // sorted by ratio ascending: 모바일게임 (0.063) before 게임 (0.9)
    assert_eq!(table.rows()[0].keyword, Keyword::new("모바일게임"));
    assert_eq!(table.rows()[0].metrics.tier, 1);
    assert_eq!(table.rows()[1].keyword, Keyword::new("게임"));
    assert_eq!(table.rows()[1].metrics.tier, 2);
    assert!(table.get(&Keyword::new("온라인게임")).is_none());
}

#[tokio::test]
async fn run_writes_expansion_and_analysis_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let related = ScriptedRelated::new(&[]);
    let volumes = TableVolumes::new(&[("sns", 100, 100)]);
    let documents = TableCounts::new(&[("sns", 10)]);

    run_with(
        &config,
        "sns",
        vec![Keyword::new("sns")],
        rules(),
        &related,
        &volumes,
        &documents,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let names: Vec<String> = fs::read_dir(dir.path().join("runs"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("sns_expanded_")));
    assert!(names.iter().any(|n| n.starts_with("sns_analysis_")));
}

#[tokio::test]
async fn interrupted_run_persists_partial_progress() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.analyzer.checkpoint_batch_size = 1;

    let related = ScriptedRelated::new(&[("a", &["b", "c", "d"])]);
    let volumes = TableVolumes::new(&[
        ("a", 100, 100),
        ("b", 100, 100),
        ("c", 100, 100),
        ("d", 100, 100),
    ]);
    let cancel = CancellationToken::new();
    // The first document lookup pulls the plug; the first batch still
    // completes and checkpoints before the loop notices.
    let documents = TableCounts::cancelling(&[("a", 10)], 1, cancel.clone());

    let outcome = run_with(
        &config,
        "partial",
        vec![Keyword::new("a")],
        rules(),
        &related,
        &volumes,
        &documents,
        &cancel,
    )
    .await
    .unwrap();

    assert!(outcome.interrupted);
    assert_eq!(outcome.analyzed, 1);

    let store = JsonTableStore::new(dir.path().join("gold").join("partial.json"));
    let table = store.load().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].keyword, Keyword::new("a"));
}

#[tokio::test]
async fn empty_rules_leave_no_golden_keywords() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let related = ScriptedRelated::new(&[]);
    let volumes = TableVolumes::new(&[("solo", 10, 10)]);
    let documents = TableCounts::new(&[("solo", 1)]);

    let outcome = run_with(
        &config,
        "solo",
        vec![Keyword::new("solo")],
        TierRules::default(),
        &related,
        &volumes,
        &documents,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.analyzed, 1);
    assert_eq!(outcome.golden, 0);
}
