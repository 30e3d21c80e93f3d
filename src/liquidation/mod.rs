//! C7 — Liquidation Hunter.

pub mod hunter;
pub mod targets;

pub use hunter::{LiquidationHunter, LiquidationOpportunity};
pub use targets::TargetList;
