use chrono::Local;
use kwgold_core::{Keyword, KeywordMetrics, KwGoldError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes per-run CSV snapshots: the raw expanded keyword list before
/// analysis, and the full unfiltered analysis before tier filtering.
/// Files are timestamped so successive runs never clobber each other.
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn timestamped(&self, subject: &str, kind: &str) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.dir.join(format!("{subject}_{kind}_{stamp}.csv"))
    }

    /// Snapshot the expanded keyword pool, one keyword per row, in
    /// discovery order.
    pub fn write_keyword_list(&self, subject: &str, keywords: &[Keyword]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.timestamped(subject, "expanded");
        let mut writer =
            csv::Writer::from_path(&path).map_err(|e| KwGoldError::Store(e.to_string()))?;
        writer
            .write_record(["keyword"])
            .map_err(|e| KwGoldError::Store(e.to_string()))?;
        for keyword in keywords {
            writer
                .write_record([keyword.as_str()])
                .map_err(|e| KwGoldError::Store(e.to_string()))?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// Snapshot the complete analysis (all tiers, including 0), sorted by
    /// competitiveness ratio ascending.
    pub fn write_analysis(
        &self,
        subject: &str,
        metrics: &HashMap<Keyword, KeywordMetrics>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.timestamped(subject, "analysis");
        let mut writer =
            csv::Writer::from_path(&path).map_err(|e| KwGoldError::Store(e.to_string()))?;
        writer
            .write_record([
                "keyword",
                "pc_search_volume",
                "mobile_search_volume",
                "total_search_volume",
                "document_count",
                "competitiveness_ratio",
                "tier",
            ])
            .map_err(|e| KwGoldError::Store(e.to_string()))?;

        let mut rows: Vec<(&Keyword, &KeywordMetrics)> = metrics.iter().collect();
        rows.sort_by(|a, b| {
            a.1.competitiveness_ratio
                .total_cmp(&b.1.competitiveness_ratio)
        });
        for (keyword, m) in rows {
            let record = [
                keyword.as_str().to_string(),
                m.pc_search_volume.to_string(),
                m.mobile_search_volume.to_string(),
                m.total_search_volume.to_string(),
                m.document_count.to_string(),
                m.competitiveness_ratio.to_string(),
                m.tier.to_string(),
            ];
            writer
                .write_record(&record)
                .map_err(|e| KwGoldError::Store(e.to_string()))?;
        }
        writer.flush()?;
        Ok(path)
    }
}
