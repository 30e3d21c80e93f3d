//! C4 — Batched Quote Engine.

pub mod engine;
pub mod venue;

pub use engine::{QuoteEngine, QuoteRequest};
