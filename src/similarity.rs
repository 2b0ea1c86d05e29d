//! Historical path ranking via similarity search
//!
//! The vector index itself is an external service; [`SimilaritySearch`] keeps
//! it a black box. [`rank`] turns nearest-neighbor matches for a token pair
//! into per-(path, DEX) statistics ordered best first. Ranking is advisory:
//! an unreachable index degrades to an empty ranking rather than an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One nearest-neighbor match from the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapMatch {
    pub path: String,
    pub dex: String,
    /// Historical output-per-input rate; 0 when the source swap had none.
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub tx_hash: String,
    /// Similarity score, nearest first.
    #[serde(default)]
    pub score: f64,
}

#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn query(&self, text: &str, top_k: usize) -> crate::Result<Vec<SwapMatch>>;
}

/// Thin client for an HTTP vector-index query endpoint.
pub struct RestSimilarityIndex {
    http: reqwest::Client,
    url: String,
}

impl RestSimilarityIndex {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl SimilaritySearch for RestSimilarityIndex {
    async fn query(&self, text: &str, top_k: usize) -> crate::Result<Vec<SwapMatch>> {
        #[derive(Deserialize)]
        struct QueryResponse {
            #[serde(default)]
            matches: Vec<SwapMatch>,
        }

        let response: QueryResponse = self
            .http
            .post(&self.url)
            .json(&json!({ "query": text, "top_k": top_k }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.matches)
    }
}

/// Aggregate statistics for one (path, DEX) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalPathStat {
    pub path: String,
    pub dex: String,
    pub count: usize,
    pub rates: Vec<f64>,
    pub tx_hashes: Vec<String>,
    pub best_rate: f64,
    pub avg_rate: f64,
}

/// Rank historical paths for a token pair, best first.
///
/// Queries the index with "Swap FROM to TO", groups matches by (path, DEX),
/// and sorts descending by average rate, breaking ties on observation count.
/// Index failures are absorbed: advice quality degrades, the pipeline does
/// not.
pub async fn rank(
    index: &dyn SimilaritySearch,
    from_token: &str,
    to_token: &str,
    top_k: usize,
) -> Vec<HistoricalPathStat> {
    let query = format!("Swap {} to {}", from_token, to_token);
    let matches = match index.query(&query, top_k).await {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "similarity index unavailable, ranking without history");
            return Vec::new();
        }
    };

    group_matches(matches)
}

fn group_matches(matches: Vec<SwapMatch>) -> Vec<HistoricalPathStat> {
    let mut stats: Vec<HistoricalPathStat> = Vec::new();

    for m in matches {
        let idx = match stats
            .iter()
            .position(|s| s.path == m.path && s.dex == m.dex)
        {
            Some(idx) => idx,
            None => {
                stats.push(HistoricalPathStat {
                    path: m.path.clone(),
                    dex: m.dex.clone(),
                    count: 0,
                    rates: Vec::new(),
                    tx_hashes: Vec::new(),
                    best_rate: 0.0,
                    avg_rate: 0.0,
                });
                stats.len() - 1
            }
        };
        let stat = &mut stats[idx];

        stat.count += 1;
        if m.rate > 0.0 {
            stat.rates.push(m.rate);
            if m.rate > stat.best_rate {
                stat.best_rate = m.rate;
            }
        }
        stat.tx_hashes.push(m.tx_hash);
    }

    for stat in &mut stats {
        if !stat.rates.is_empty() {
            stat.avg_rate = stat.rates.iter().sum::<f64>() / stat.rates.len() as f64;
        }
    }

    stats.sort_by(|a, b| {
        b.avg_rate
            .partial_cmp(&a.avg_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.count.cmp(&a.count))
    });
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct FixedIndex(Vec<SwapMatch>);

    #[async_trait]
    impl SimilaritySearch for FixedIndex {
        async fn query(&self, _text: &str, _top_k: usize) -> crate::Result<Vec<SwapMatch>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenIndex;

    #[async_trait]
    impl SimilaritySearch for BrokenIndex {
        async fn query(&self, _text: &str, _top_k: usize) -> crate::Result<Vec<SwapMatch>> {
            Err(Error::UpstreamUnavailable("index down".to_string()))
        }
    }

    fn swap(path: &str, dex: &str, rate: f64) -> SwapMatch {
        SwapMatch {
            path: path.to_string(),
            dex: dex.to_string(),
            rate,
            tx_hash: format!("0x{}{}", dex.len(), rate),
            score: 0.9,
        }
    }

    #[tokio::test]
    async fn ranks_by_average_rate_then_count() {
        // A: avg 3.0 over 1 swap; B: avg 2.0 over 9; C: avg 2.0 over 5.
        let mut matches = vec![swap("ETH → USDC", "A", 3.0)];
        for _ in 0..9 {
            matches.push(swap("ETH → USDC", "B", 2.0));
        }
        for _ in 0..5 {
            matches.push(swap("ETH → USDC", "C", 2.0));
        }

        let index = FixedIndex(matches);
        let ranked = rank(&index, "ETH", "USDC", 30).await;

        let order: Vec<&str> = ranked.iter().map(|s| s.dex.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(ranked[1].count, 9);
        assert_eq!(ranked[2].count, 5);
    }

    #[tokio::test]
    async fn zero_rates_count_but_do_not_skew_average() {
        let matches = vec![
            swap("ETH → USDC", "A", 2.0),
            swap("ETH → USDC", "A", 0.0),
            swap("ETH → USDC", "A", 4.0),
        ];

        let ranked = rank(&FixedIndex(matches), "ETH", "USDC", 10).await;
        assert_eq!(ranked[0].count, 3);
        assert_eq!(ranked[0].avg_rate, 3.0);
        assert_eq!(ranked[0].best_rate, 4.0);
    }

    #[tokio::test]
    async fn same_path_different_dex_grouped_separately() {
        let matches = vec![
            swap("ETH → USDC", "Uniswap V2", 1800.0),
            swap("ETH → USDC", "SushiSwap", 1790.0),
        ];

        let ranked = rank(&FixedIndex(matches), "ETH", "USDC", 10).await;
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].dex, "Uniswap V2");
    }

    #[tokio::test]
    async fn index_failure_degrades_to_empty_ranking() {
        let ranked = rank(&BrokenIndex, "ETH", "USDC", 10).await;
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn empty_index_yields_empty_ranking() {
        let ranked = rank(&FixedIndex(Vec::new()), "ETH", "USDC", 10).await;
        assert!(ranked.is_empty());
    }
}
