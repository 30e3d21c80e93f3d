//! Structured events emitted by hunters and the executor. Every sink
//! consumes the same `EngineEvent` stream; none of them block the hunter
//! critical path.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    Spread {
        block_height: u64,
        route: String,
        gross_usd: f64,
        net_usd: f64,
    },
    Execution {
        block_height: u64,
        route: String,
        net_usd: f64,
        tx_hash: Option<String>,
        status: ExecutionStatus,
    },
    StateChanged {
        block_height: u64,
        from: String,
        to: String,
    },
    Error {
        block_height: u64,
        route: Option<String>,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Confirmed,
    Reverted,
    Timeout,
    SimulationReverted,
    BroadcastRejected,
}

impl EngineEvent {
    pub fn block_height(&self) -> u64 {
        match self {
            EngineEvent::Spread { block_height, .. } => *block_height,
            EngineEvent::Execution { block_height, .. } => *block_height,
            EngineEvent::StateChanged { block_height, .. } => *block_height,
            EngineEvent::Error { block_height, .. } => *block_height,
        }
    }

    /// Key used by the remote sink's duplicate-suppression window: the same
    /// route firing the same kind of event repeatedly within the window is
    /// collapsed to one webhook post.
    pub fn dedup_key(&self) -> String {
        match self {
            EngineEvent::Spread { route, .. } => format!("spread:{route}"),
            EngineEvent::Execution { route, .. } => format!("execution:{route}"),
            EngineEvent::StateChanged { from, to, .. } => format!("state:{from}:{to}"),
            EngineEvent::Error { route, message, .. } => {
                format!("error:{}:{:.100}", route.clone().unwrap_or_default(), message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_is_stable_for_same_route() {
        let a = EngineEvent::Spread { block_height: 1, route: "ARB/x-y".into(), gross_usd: 1.0, net_usd: 1.0 };
        let b = EngineEvent::Spread { block_height: 2, route: "ARB/x-y".into(), gross_usd: 2.0, net_usd: 2.0 };
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn block_height_accessor_matches_variant() {
        let e = EngineEvent::StateChanged { block_height: 42, from: "peace".into(), to: "war".into() };
        assert_eq!(e.block_height(), 42);
    }
}
