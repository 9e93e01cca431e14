use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric floor substituted for "less than N" search-volume sentinels.
pub const LESS_THAN_FLOOR: u64 = 5;

/// A candidate keyword. Identity is the raw string after whitespace
/// trimming; no case folding or stemming is performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyword(String);

impl Keyword {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The form sent to the search-volume oracle: all whitespace removed.
    /// Document-count lookups keep the original string; the two providers
    /// key keywords differently and the asymmetry is intentional.
    pub fn cleaned(&self) -> String {
        self.0.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Keyword {
    fn from(raw: &str) -> Self {
        Keyword::new(raw)
    }
}

impl From<String> for Keyword {
    fn from(raw: String) -> Self {
        Keyword::new(raw)
    }
}

/// A monthly search-volume figure as reported on the wire: either a plain
/// count or a "less than N" sentinel string such as `"< 10"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawVolume {
    Count(u64),
    Text(String),
}

impl RawVolume {
    /// Collapse the sentinel notation to a usable count. `"< 10"` becomes
    /// [`LESS_THAN_FLOOR`], not zero; unparseable text becomes zero.
    pub fn normalize(&self) -> u64 {
        match self {
            RawVolume::Count(n) => *n,
            RawVolume::Text(s) => {
                let s = s.trim();
                if s.starts_with('<') {
                    LESS_THAN_FLOOR
                } else {
                    s.parse().unwrap_or(0)
                }
            }
        }
    }
}

impl Default for RawVolume {
    fn default() -> Self {
        RawVolume::Count(0)
    }
}

/// Per-keyword volumes as returned by one volume-oracle lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchVolume {
    pub pc: RawVolume,
    pub mobile: RawVolume,
}

/// Everything the pipeline knows about a keyword after analysis.
///
/// `total_search_volume` is always `pc + mobile` and
/// `competitiveness_ratio` is `document_count / total_search_volume`
/// (0.0 when the total volume is zero — callers that need to tell "no
/// data" apart from genuinely zero competition check the volume field).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMetrics {
    pub pc_search_volume: u64,
    pub mobile_search_volume: u64,
    pub total_search_volume: u64,
    pub document_count: u64,
    pub competitiveness_ratio: f64,
    pub tier: u8,
}

impl KeywordMetrics {
    /// Build metrics from raw counts. The tier starts at 0 (unclassified);
    /// the stage classifier assigns the real tier.
    pub fn from_counts(pc: u64, mobile: u64, document_count: u64) -> Self {
        let total = pc + mobile;
        let ratio = if total > 0 {
            // Three decimal places, matching the persisted table format.
            (document_count as f64 / total as f64 * 1000.0).round() / 1000.0
        } else {
            0.0
        };
        Self {
            pc_search_volume: pc,
            mobile_search_volume: mobile,
            total_search_volume: total,
            document_count,
            competitiveness_ratio: ratio,
            tier: 0,
        }
    }
}
