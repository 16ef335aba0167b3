use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chain name reported when the node did not provide one
pub const UNKNOWN_CHAIN: &str = "unknown";

/// Aggregated network statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    /// Current chain height
    pub block_height: u64,
    /// Current proof-of-work difficulty
    pub difficulty: f64,
    /// Chain name (main, test, regtest, ...)
    pub chain: String,
    /// Estimated network hashes per second
    pub network_hashrate: f64,
    /// Peer connections of the upstream node
    pub connections: u64,
    /// When these values were reduced
    pub last_updated: DateTime<Utc>,
    /// Served from cache after a failed refresh
    #[serde(default, skip_serializing_if = "is_false")]
    pub stale: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl NetworkStats {
    /// Reduce the three upstream results. A missing result or field falls
    /// back to zero, or to "unknown" for the chain name.
    pub fn reduce(
        blockchain_info: Option<&Value>,
        mining_info: Option<&Value>,
        connection_count: Option<&Value>,
        now: DateTime<Utc>,
    ) -> Self {
        let chain = blockchain_info
            .and_then(|info| info.get("chain"))
            .and_then(Value::as_str)
            .filter(|chain| !chain.is_empty())
            .unwrap_or(UNKNOWN_CHAIN)
            .to_string();

        Self {
            block_height: count(blockchain_info.and_then(|info| info.get("blocks"))),
            difficulty: non_negative(blockchain_info.and_then(|info| info.get("difficulty"))),
            chain,
            network_hashrate: non_negative(mining_info.and_then(|info| info.get("networkhashps"))),
            connections: count(connection_count),
            last_updated: now,
            stale: false,
        }
    }

    /// Copy of these stats flagged as served without a successful refresh
    pub fn as_stale(&self) -> Self {
        Self {
            stale: true,
            ..self.clone()
        }
    }
}

fn count(value: Option<&Value>) -> u64 {
    value.and_then(Value::as_u64).unwrap_or(0)
}

fn non_negative(value: Option<&Value>) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}
