use crate::{KwGoldError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Number of competitiveness tiers. Tier numbers are 1-based; 0 means
/// "no tier matched".
pub const TIER_COUNT: usize = 5;

/// Bounds for one competitiveness tier. Absent bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRule {
    /// Maximum document count, inclusive. `None` means no ceiling.
    #[serde(default)]
    pub max_documents: Option<u64>,
    /// Minimum total search volume, inclusive.
    #[serde(default)]
    pub min_volume: u64,
    /// Maximum total search volume, inclusive. `None` means no ceiling.
    #[serde(default)]
    pub max_volume: Option<u64>,
}

impl TierRule {
    /// The tier's base condition: document count at or under the ceiling
    /// and total volume inside the configured band.
    pub fn matches_bounds(&self, document_count: u64, total_search_volume: u64) -> bool {
        self.max_documents.map_or(true, |d| document_count <= d)
            && total_search_volume >= self.min_volume
            && self.max_volume.map_or(true, |v| total_search_volume <= v)
    }
}

/// The ordered tier-rule table: exactly [`TIER_COUNT`] slots, semantically
/// tiers 1..=5. A missing slot never matches, so an empty table classifies
/// every keyword as tier 0 — the signal callers watch for when the rule
/// file was never configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierRules {
    rules: [Option<TierRule>; TIER_COUNT],
}

#[derive(Debug, Deserialize)]
struct TierRulesFile {
    tiers: Vec<TierRule>,
}

impl TierRules {
    pub fn new(rules: [Option<TierRule>; TIER_COUNT]) -> Self {
        Self { rules }
    }

    /// Build from an ordered slice of rules, tier 1 first. A table with
    /// anything other than [`TIER_COUNT`] entries is rejected.
    pub fn from_slice(rules: &[TierRule]) -> Result<Self> {
        if rules.len() != TIER_COUNT {
            return Err(KwGoldError::Config(format!(
                "tier table must have exactly {TIER_COUNT} entries, got {}",
                rules.len()
            )));
        }
        let mut table: [Option<TierRule>; TIER_COUNT] = [None; TIER_COUNT];
        for (slot, rule) in table.iter_mut().zip(rules) {
            *slot = Some(*rule);
        }
        Ok(Self { rules: table })
    }

    /// Look up the rule for a 1-based tier number.
    pub fn rule(&self, tier: u8) -> Option<&TierRule> {
        match tier {
            1..=5 => self.rules[tier as usize - 1].as_ref(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.iter().all(Option::is_none)
    }

    /// Load the table from a YAML file. An absent file yields the empty
    /// table rather than an error; a present file must carry the full
    /// five-entry list.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("tier rule file {} not found; using empty table", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let file: TierRulesFile = serde_yaml::from_str(&text)
            .map_err(|e| KwGoldError::Config(format!("{}: {e}", path.display())))?;
        Self::from_slice(&file.tiers)
    }
}
