use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::cache::{StatsCache, StatsCacheEntry};
use super::types::NetworkStats;
use crate::rpc::{RpcError, RpcTransport};

/// How long aggregated stats are served without asking the node again
pub const STATS_CACHE_TTL: Duration = Duration::from_secs(30);

const BLOCKCHAIN_INFO: &str = "getblockchaininfo";
const MINING_INFO: &str = "getmininginfo";
const CONNECTION_COUNT: &str = "getconnectioncount";

#[derive(Error, Debug)]
pub enum StatsError {
    /// Nothing cached yet and the refresh failed
    #[error("Unable to fetch network stats: {0}")]
    Unavailable(String),
}

/// Failures that abort a whole aggregation
#[derive(Error, Debug)]
enum AggregationError {
    #[error("{method} task failed: {source}")]
    Task {
        method: &'static str,
        #[source]
        source: JoinError,
    },

    #[error("upstream node unreachable, all stats calls failed to connect")]
    Unreachable,
}

pub struct StatsAggregator {
    transport: Arc<dyn RpcTransport>,
    cache: StatsCache,
    ttl: Duration,
    /// Serializes refreshes so concurrent readers past the TTL share one
    refresh: Mutex<()>,
}

impl StatsAggregator {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self::with_ttl(transport, STATS_CACHE_TTL)
    }

    pub fn with_ttl(transport: Arc<dyn RpcTransport>, ttl: Duration) -> Self {
        Self {
            transport,
            cache: StatsCache::new(),
            ttl,
            refresh: Mutex::new(()),
        }
    }

    /// Current network stats.
    ///
    /// Fresh cache hits return the cached `Arc` itself. Past the TTL the
    /// stats are re-aggregated; if that fails, the previous snapshot is
    /// returned with `stale` set. Fails only when nothing was ever cached.
    pub async fn get_stats(&self) -> Result<Arc<NetworkStats>, StatsError> {
        if let Some(stats) = self.cache.fresh(Instant::now(), self.ttl) {
            debug!("Serving network stats from cache");
            return Ok(stats);
        }

        let _refresh = self.refresh.lock().await;

        // a refresh that finished while we waited is good enough
        if let Some(stats) = self.cache.fresh(Instant::now(), self.ttl) {
            return Ok(stats);
        }

        match self.aggregate().await {
            Ok(stats) => {
                let stats = Arc::new(stats);
                self.cache
                    .replace(StatsCacheEntry::new(Arc::clone(&stats), Instant::now()));
                info!(
                    "Network stats refreshed: height={} chain={} connections={}",
                    stats.block_height, stats.chain, stats.connections
                );
                Ok(stats)
            }
            Err(e) => {
                error!("Stats error: {}", e);
                match self.cache.load() {
                    Some(entry) => {
                        warn!("Serving stale network stats from {}", entry.data.last_updated);
                        Ok(Arc::new(entry.data.as_stale()))
                    }
                    None => Err(StatsError::Unavailable(e.to_string())),
                }
            }
        }
    }

    /// Run the three calls concurrently and reduce whatever came back.
    async fn aggregate(&self) -> Result<NetworkStats, AggregationError> {
        let (blockchain_info, mining_info, connection_count) = tokio::join!(
            self.fetch(BLOCKCHAIN_INFO),
            self.fetch(MINING_INFO),
            self.fetch(CONNECTION_COUNT),
        );
        let (blockchain_info, mining_info, connection_count) =
            (blockchain_info?, mining_info?, connection_count?);

        // a node that answers with errors is still reachable
        let unreachable = [&blockchain_info, &mining_info, &connection_count]
            .iter()
            .all(|reply| matches!(reply, Err(e) if e.is_transport()));
        if unreachable {
            return Err(AggregationError::Unreachable);
        }

        Ok(NetworkStats::reduce(
            blockchain_info.ok().as_ref(),
            mining_info.ok().as_ref(),
            connection_count.ok().as_ref(),
            Utc::now(),
        ))
    }

    /// One call on its own task. An RPC failure is handed back for this
    /// call's fields only; a failed task aborts the aggregation.
    async fn fetch(
        &self,
        method: &'static str,
    ) -> Result<Result<Value, RpcError>, AggregationError> {
        let transport = Arc::clone(&self.transport);
        let task = tokio::spawn(async move { transport.call(method, &[]).await });

        match task.await {
            Ok(reply) => {
                if let Err(e) = &reply {
                    warn!("{} failed, reporting defaults: {}", method, e);
                }
                Ok(reply)
            }
            Err(source) => Err(AggregationError::Task { method, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::{MockReply, MockTransport};
    use serde_json::json;

    fn healthy_node() -> MockTransport {
        MockTransport::new()
            .with(
                BLOCKCHAIN_INFO,
                MockReply::result(json!({"chain": "main", "blocks": 1200, "difficulty": 2.5})),
            )
            .with(MINING_INFO, MockReply::result(json!({"networkhashps": 1.5e12})))
            .with(CONNECTION_COUNT, MockReply::result(json!(8)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_served_without_network_calls() {
        let transport = Arc::new(healthy_node());
        let aggregator = StatsAggregator::new(transport.clone());

        let first = aggregator.get_stats().await.unwrap();
        assert_eq!(transport.call_count(), 3);

        tokio::time::advance(Duration::from_secs(29)).await;
        let cached = aggregator.get_stats().await.unwrap();
        assert!(Arc::ptr_eq(&first, &cached));
        assert_eq!(transport.call_count(), 3);

        tokio::time::advance(Duration::from_secs(2)).await;
        let refreshed = aggregator.get_stats().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &refreshed));
        assert_eq!(transport.call_count(), 6);
    }

    #[tokio::test]
    async fn test_aggregates_all_three_calls() {
        let transport = Arc::new(healthy_node());
        let aggregator = StatsAggregator::new(transport.clone());

        let stats = aggregator.get_stats().await.unwrap();

        assert_eq!(stats.block_height, 1200);
        assert_eq!(stats.difficulty, 2.5);
        assert_eq!(stats.chain, "main");
        assert_eq!(stats.network_hashrate, 1.5e12);
        assert_eq!(stats.connections, 8);
        assert!(!stats.stale);

        let mut methods: Vec<String> = transport.calls().into_iter().map(|(m, _)| m).collect();
        methods.sort();
        assert_eq!(methods, vec![BLOCKCHAIN_INFO, CONNECTION_COUNT, MINING_INFO]);
    }

    #[tokio::test]
    async fn test_partial_failure_zeroes_only_failed_fields() {
        let transport = Arc::new(healthy_node().with(MINING_INFO, MockReply::unreachable()));
        let aggregator = StatsAggregator::new(transport);

        let stats = aggregator.get_stats().await.unwrap();

        assert_eq!(stats.network_hashrate, 0.0);
        assert_eq!(stats.block_height, 1200);
        assert_eq!(stats.chain, "main");
        assert_eq!(stats.connections, 8);
        assert!(!stats.stale);
    }

    #[tokio::test]
    async fn test_protocol_error_is_isolated_like_transport_error() {
        let transport = Arc::new(
            healthy_node().with(BLOCKCHAIN_INFO, MockReply::rpc_error(-28, "Loading block index...")),
        );
        let aggregator = StatsAggregator::new(transport);

        let stats = aggregator.get_stats().await.unwrap();

        assert_eq!(stats.block_height, 0);
        assert_eq!(stats.chain, "unknown");
        assert_eq!(stats.network_hashrate, 1.5e12);
        assert_eq!(stats.connections, 8);
    }

    #[tokio::test]
    async fn test_node_answering_only_errors_yields_zeroed_stats() {
        let transport = Arc::new(
            MockTransport::new()
                .with(BLOCKCHAIN_INFO, MockReply::rpc_error(-28, "Loading block index..."))
                .with(MINING_INFO, MockReply::rpc_error(-28, "Loading block index..."))
                .with(CONNECTION_COUNT, MockReply::rpc_error(-28, "Loading block index...")),
        );
        let aggregator = StatsAggregator::new(transport);

        let stats = aggregator.get_stats().await.unwrap();

        assert_eq!(stats.block_height, 0);
        assert_eq!(stats.difficulty, 0.0);
        assert_eq!(stats.chain, "unknown");
        assert_eq!(stats.network_hashrate, 0.0);
        assert_eq!(stats.connections, 0);
        assert!(!stats.stale);
        assert!(!aggregator.cache.is_empty());
    }

    #[tokio::test]
    async fn test_mixed_transport_and_node_errors_are_not_unreachable() {
        let transport = Arc::new(
            MockTransport::new()
                .with(BLOCKCHAIN_INFO, MockReply::unreachable())
                .with(MINING_INFO, MockReply::unreachable())
                .with(CONNECTION_COUNT, MockReply::rpc_error(-28, "Loading block index...")),
        );
        let aggregator = StatsAggregator::new(transport);

        let stats = aggregator.get_stats().await.unwrap();
        assert_eq!(stats.connections, 0);
        assert!(!stats.stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_serves_stale_and_keeps_timestamp() {
        let transport = Arc::new(healthy_node());
        let aggregator = StatsAggregator::new(transport.clone());

        let first = aggregator.get_stats().await.unwrap();
        let stored_at = aggregator.cache.load().unwrap().timestamp;

        tokio::time::advance(Duration::from_secs(31)).await;
        transport.set(MINING_INFO, MockReply::Panic);

        let stale = aggregator.get_stats().await.unwrap();
        assert!(stale.stale);
        assert_eq!(stale.block_height, first.block_height);
        assert_eq!(stale.last_updated, first.last_updated);

        let entry = aggregator.cache.load().unwrap();
        assert_eq!(entry.timestamp, stored_at);
        assert!(Arc::ptr_eq(&entry.data, &first));
        assert!(!entry.data.stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_upstream_serves_stale() {
        let transport = Arc::new(healthy_node());
        let aggregator = StatsAggregator::new(transport.clone());
        aggregator.get_stats().await.unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;
        for method in [BLOCKCHAIN_INFO, MINING_INFO, CONNECTION_COUNT] {
            transport.set(method, MockReply::unreachable());
        }

        let stats = aggregator.get_stats().await.unwrap();
        assert!(stats.stale);
        assert_eq!(stats.block_height, 1200);
    }

    #[tokio::test]
    async fn test_cold_start_with_unreachable_upstream_is_unavailable() {
        let transport = Arc::new(
            MockTransport::new()
                .with(BLOCKCHAIN_INFO, MockReply::unreachable())
                .with(MINING_INFO, MockReply::unreachable())
                .with(CONNECTION_COUNT, MockReply::unreachable()),
        );
        let aggregator = StatsAggregator::new(transport);

        let err = aggregator.get_stats().await.unwrap_err();
        assert!(matches!(err, StatsError::Unavailable(_)));
        assert!(aggregator.cache.is_empty());
    }

    #[tokio::test]
    async fn test_cold_start_task_failure_is_unavailable() {
        let transport = Arc::new(healthy_node().with(CONNECTION_COUNT, MockReply::Panic));
        let aggregator = StatsAggregator::new(transport);

        assert!(matches!(
            aggregator.get_stats().await,
            Err(StatsError::Unavailable(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cold_readers_share_one_refresh() {
        let transport = Arc::new(healthy_node());
        let aggregator = Arc::new(StatsAggregator::new(transport.clone()));

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                tokio::spawn(async move { aggregator.get_stats().await })
            })
            .collect();

        let mut results = Vec::new();
        for reader in readers {
            results.push(reader.await.unwrap().unwrap());
        }

        assert_eq!(transport.call_count(), 3);
        assert!(results.iter().all(|stats| Arc::ptr_eq(stats, &results[0])));
    }
}
