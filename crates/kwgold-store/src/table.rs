use kwgold_core::{Keyword, KeywordMetrics, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One persisted row: a keyword and everything the analyzer learned
/// about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub keyword: Keyword,
    #[serde(flatten)]
    pub metrics: KeywordMetrics,
}

/// The persisted keyword table, kept sorted by competitiveness ratio
/// ascending (lowest competition first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, keyword: &Keyword) -> Option<&ResultRow> {
        self.rows.iter().find(|row| &row.keyword == keyword)
    }

    /// Merge freshly analyzed rows into the table. Incoming rows replace
    /// stored rows with the same keyword (last write wins). With
    /// `drop_unclassified`, tier-0 rows already in the table are purged
    /// first — the analyzer never inserts new ones in classified-only
    /// operation, but older tables may still carry them. The table is
    /// re-sorted by ratio ascending afterwards.
    pub fn merge(&mut self, incoming: &HashMap<Keyword, KeywordMetrics>, drop_unclassified: bool) {
        if drop_unclassified {
            self.rows.retain(|row| row.metrics.tier > 0);
        }
        for (keyword, metrics) in incoming {
            match self.rows.iter_mut().find(|row| &row.keyword == keyword) {
                Some(row) => row.metrics = metrics.clone(),
                None => self.rows.push(ResultRow {
                    keyword: keyword.clone(),
                    metrics: metrics.clone(),
                }),
            }
        }
        self.rows.sort_by(|a, b| {
            a.metrics
                .competitiveness_ratio
                .total_cmp(&b.metrics.competitiveness_ratio)
        });
    }
}

/// Full-table read/write contract toward the orchestration layer.
pub trait KeywordTableStore: Send + Sync {
    fn load(&self) -> Result<ResultTable>;
    fn store(&self, table: &ResultTable) -> Result<()>;
}

/// JSON-backed table store. The whole table is rewritten on every
/// `store`, via a sibling temp file and rename.
pub struct JsonTableStore {
    path: PathBuf,
}

impl JsonTableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeywordTableStore for JsonTableStore {
    fn load(&self) -> Result<ResultTable> {
        if !self.path.exists() {
            return Ok(ResultTable::default());
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn store(&self, table: &ResultTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(table)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
