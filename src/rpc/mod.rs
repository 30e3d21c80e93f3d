//! C1 — Tiered RPC Router.
//!
//! Multiplexes read traffic over a premium endpoint plus a pool of free
//! endpoints, health-ranks the free pool in the background, and isolates
//! callers from rate limits and transient network failures.

pub mod endpoint;
pub mod router;

pub use endpoint::{Endpoint, Tier};
pub use router::RpcRouter;
