use kwgold_core::{TierRules, TIER_COUNT};

/// Bucket a keyword into a competitiveness tier from its document count
/// and total search volume.
///
/// Tiers are checked in ascending order and the first match wins. Tier 1
/// needs only the rule's bounds. Tiers 2..=5 additionally require the
/// search volume to be at least the document count; a keyword that sits
/// inside a tier's bounds but fails that comparison is not rejected
/// outright — later, looser tiers still get a chance to claim it.
///
/// Returns 0 when no tier matches, which is also what every input gets
/// when the rule table is empty.
pub fn classify(document_count: u64, total_search_volume: u64, rules: &TierRules) -> u8 {
    for tier in 1..=TIER_COUNT as u8 {
        let rule = match rules.rule(tier) {
            Some(rule) => rule,
            None => continue,
        };
        if !rule.matches_bounds(document_count, total_search_volume) {
            continue;
        }
        if tier == 1 || total_search_volume >= document_count {
            return tier;
        }
    }
    0
}
