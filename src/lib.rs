//! On-chain MEV engine for Arbitrum One: cross-DEX arbitrage and
//! Aave/Compound-style liquidation hunting.

pub mod arbitrage;
pub mod bus;
pub mod config;
pub mod contracts;
pub mod error;
pub mod executor;
pub mod filters;
pub mod graph;
pub mod liquidation;
pub mod quote;
pub mod rpc;
pub mod sentinel;
pub mod sinks;
pub mod types;

pub use config::Config;
pub use error::EngineError;
pub use executor::Executor;
pub use graph::ArbGraph;
pub use rpc::RpcRouter;
