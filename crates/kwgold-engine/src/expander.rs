use kwgold_core::{ExpansionConfig, Keyword, RelatedKeywordSource, Result};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Breadth-first keyword expansion over the related-keywords oracle.
///
/// Starting from the seeds, every discovered keyword is queried exactly
/// once; novel results join the pool and are enqueued for their own
/// lookup while the pool is below `max_pool_size`. A run of consecutive
/// empty oracle responses trips a circuit breaker so a dead upstream
/// cannot spin the loop through the whole queue.
pub struct KeywordExpander<'a, S> {
    oracle: &'a S,
    config: ExpansionConfig,
}

impl<'a, S: RelatedKeywordSource> KeywordExpander<'a, S> {
    pub fn new(oracle: &'a S, config: ExpansionConfig) -> Self {
        Self { oracle, config }
    }

    /// Expand `seeds` into a pool of related keywords, in discovery order.
    ///
    /// The pool never exceeds `max_pool_size`; seeds are admitted first.
    /// Cancellation is observed between oracle calls and returns the pool
    /// gathered so far.
    pub async fn expand(
        &self,
        seeds: &[Keyword],
        cancel: &CancellationToken,
    ) -> Result<Vec<Keyword>> {
        let max_pool = self.config.max_pool_size;
        let mut visited: HashSet<Keyword> = HashSet::new();
        let mut members: HashSet<Keyword> = HashSet::new();
        let mut pool: Vec<Keyword> = Vec::new();
        let mut queue: VecDeque<(Keyword, Keyword)> = VecDeque::new();

        for seed in seeds {
            if seed.is_empty() {
                continue;
            }
            if members.len() < max_pool && members.insert(seed.clone()) {
                pool.push(seed.clone());
            }
            queue.push_back((seed.clone(), seed.clone()));
        }

        let mut consecutive_empty: u32 = 0;
        let mut queried: usize = 0;

        while pool.len() < max_pool {
            let (current, origin) = match queue.pop_front() {
                Some(item) => item,
                None => break,
            };
            if visited.contains(&current) {
                continue;
            }
            visited.insert(current.clone());
            queried += 1;

            let related = self.oracle.related(&current).await?;
            debug!(
                keyword = %current,
                origin = %origin,
                found = related.len(),
                "expansion step"
            );

            if related.is_empty() {
                consecutive_empty += 1;
                if consecutive_empty >= self.config.empty_result_tolerance {
                    warn!(
                        "{} consecutive empty responses; stopping expansion early",
                        consecutive_empty
                    );
                    break;
                }
            } else {
                consecutive_empty = 0;
                for keyword in related {
                    if keyword.is_empty() || members.contains(&keyword) {
                        continue;
                    }
                    if pool.len() >= max_pool {
                        break;
                    }
                    members.insert(keyword.clone());
                    pool.push(keyword.clone());
                    if pool.len() < max_pool {
                        queue.push_back((keyword, origin.clone()));
                    }
                }
            }

            if pool.len() >= max_pool {
                break;
            }

            // Courtesy pause toward the upstream while work remains; an
            // interrupt during the pause ends the run with the partial pool.
            if !queue.is_empty() && self.config.request_delay_ms > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("expansion interrupted after {queried} lookups");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)) => {}
                }
            } else if cancel.is_cancelled() {
                info!("expansion interrupted after {queried} lookups");
                break;
            }
        }

        info!(
            "expansion finished: {} keywords from {} seeds after {} lookups",
            pool.len(),
            seeds.len(),
            queried
        );
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted oracle: maps a keyword to its related list and records
    /// every query it receives.
    struct ScriptedOracle {
        graph: HashMap<String, Vec<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn new(edges: &[(&str, &[&str])]) -> Self {
            let graph = edges
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect();
            Self {
                graph,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RelatedKeywordSource for ScriptedOracle {
        async fn related(&self, keyword: &Keyword) -> Result<Vec<Keyword>> {
            self.calls.lock().unwrap().push(keyword.as_str().to_string());
            Ok(self
                .graph
                .get(keyword.as_str())
                .map(|related| related.iter().map(Keyword::new).collect())
                .unwrap_or_default())
        }
    }

    fn config(max_pool_size: usize, empty_result_tolerance: u32) -> ExpansionConfig {
        ExpansionConfig {
            max_pool_size,
            request_delay_ms: 0,
            empty_result_tolerance,
            max_seeds: 10,
        }
    }

    fn keywords(raw: &[&str]) -> Vec<Keyword> {
        raw.iter().map(Keyword::new).collect()
    }

    #[tokio::test]
    async fn single_seed_fanout_ends_on_empty_queue() {
        // The §8 shape: one seed, two children, nothing below them.
        let oracle = ScriptedOracle::new(&[("게임", &["모바일게임", "온라인게임"])]);
        let expander = KeywordExpander::new(&oracle, config(10, 50));
        let pool = expander
            .expand(&keywords(&["게임"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pool, keywords(&["게임", "모바일게임", "온라인게임"]));
        // Children were queried too (and yielded nothing): queue drained,
        // breaker untouched.
        assert_eq!(oracle.calls().len(), 3);
    }

    #[tokio::test]
    async fn no_keyword_is_queried_twice() {
        // Diamond: both children point back at each other and at the seed.
        let oracle = ScriptedOracle::new(&[
            ("a", &["b", "c"]),
            ("b", &["c", "a"]),
            ("c", &["a", "b"]),
        ]);
        let expander = KeywordExpander::new(&oracle, config(100, 50));
        let pool = expander
            .expand(&keywords(&["a"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pool, keywords(&["a", "b", "c"]));
        let mut calls = oracle.calls();
        calls.sort();
        assert_eq!(calls, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn pool_is_capped_at_max_size() {
        let oracle = ScriptedOracle::new(&[
            ("a", &["b", "c", "d", "e", "f", "g", "h"]),
            ("b", &["i", "j"]),
        ]);
        let expander = KeywordExpander::new(&oracle, config(4, 50));
        let pool = expander
            .expand(&keywords(&["a"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pool.len(), 4);
        assert_eq!(pool[0], Keyword::new("a"));
    }

    #[tokio::test]
    async fn all_seeds_survive_when_pool_is_large_enough() {
        let oracle = ScriptedOracle::new(&[]);
        let expander = KeywordExpander::new(&oracle, config(10, 50));
        let pool = expander
            .expand(&keywords(&["a", "b", "c"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pool, keywords(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn circuit_breaker_stops_a_dead_oracle() {
        // Plenty of queue left, but every response is empty.
        let oracle = ScriptedOracle::new(&[(
            "a",
            &["b", "c", "d", "e", "f", "g", "h", "i", "j", "k"],
        )]);
        let expander = KeywordExpander::new(&oracle, config(100, 3));
        let pool = expander
            .expand(&keywords(&["a"]), &CancellationToken::new())
            .await
            .unwrap();
        // a answered, then b/c/d came back empty and tripped the breaker.
        assert_eq!(oracle.calls().len(), 4);
        assert_eq!(pool.len(), 11);
    }

    #[tokio::test]
    async fn a_hit_resets_the_empty_streak() {
        let oracle = ScriptedOracle::new(&[
            ("a", &["b", "c"]),
            // b empty, c produces, d and e empty: streak never reaches 2+1
            ("c", &["d", "e"]),
        ]);
        let expander = KeywordExpander::new(&oracle, config(100, 3));
        let pool = expander
            .expand(&keywords(&["a"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pool, keywords(&["a", "b", "c", "d", "e"]));
        assert_eq!(oracle.calls().len(), 5);
    }

    #[tokio::test]
    async fn duplicate_seeds_collapse() {
        let oracle = ScriptedOracle::new(&[("a", &["b"])]);
        let expander = KeywordExpander::new(&oracle, config(10, 50));
        let pool = expander
            .expand(&keywords(&["a", "a", " a "]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pool, keywords(&["a", "b"]));
        let calls = oracle.calls();
        assert_eq!(calls.iter().filter(|c| c.as_str() == "a").count(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_returns_partial_pool() {
        let oracle = ScriptedOracle::new(&[("a", &["b", "c"]), ("b", &["d"])]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut cfg = config(100, 50);
        cfg.request_delay_ms = 5;
        let expander = KeywordExpander::new(&oracle, cfg);
        let pool = expander.expand(&keywords(&["a"]), &cancel).await.unwrap();
        // One lookup happened, then the pause observed the cancellation.
        assert_eq!(oracle.calls(), vec!["a"]);
        assert_eq!(pool, keywords(&["a", "b", "c"]));
    }
}
