//! C5/C6 — Two-Leg and Tri-Leg Arbitrage Hunters, plus the shared
//! Route-Failure Ledger (cooldown).

pub mod calldata;
pub mod cooldown;
pub mod two_leg;
pub mod tri_leg;

pub use calldata::encode_swap_call;
pub use cooldown::RouteCooldown;
pub use two_leg::TwoLegHunter;
pub use tri_leg::TriLegHunter;

/// Aave V2 flashloan fee, in basis points (shared by both hunters' profit math).
pub const FLASHLOAN_FEE_BPS: u64 = 5;
