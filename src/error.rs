//! Typed error taxonomy. `Transient` and `Quote` kinds are absorbed inside
//! the RPC router and quote engine respectively and should rarely escape to
//! a hunter; the remaining kinds are surfaced as non-fatal outcomes routed
//! to sinks, except `Config` which is fatal at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rate limited on {endpoint}")]
    RateLimited { endpoint: String },

    #[error("network error on {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("quote reverted for {route}")]
    QuoteReverted { route: String },

    #[error("simulation reverted: {reason}")]
    SimulationReverted { reason: String },

    #[error("broadcast rejected: {reason}")]
    BroadcastRejected { reason: String },

    #[error("transaction {tx_hash} reverted")]
    TxReverted { tx_hash: String },

    #[error("transaction {tx_hash} timed out waiting for receipt")]
    TxTimeout { tx_hash: String },

    #[error("missing required configuration: {0}")]
    ConfigMissing(String),
}

impl EngineError {
    /// True for kinds the router/quote engine absorb locally — callers
    /// should never have to special-case these beyond a retry loop.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::RateLimited { .. } | EngineError::Network { .. })
    }
}
