//! Borrower tier lists. Loaded from an external JSON file dropped by a
//! batch collaborator and re-read at the start of every block cycle.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// `T1_MAX` — scout-pass addresses below this health factor are promoted
/// from T2 into T1.
pub const T1_MAX: f64 = 1.050;
/// `T2_MAX` — scout-pass addresses above this health factor exit T2 entirely.
pub const T2_MAX: f64 = 1.200;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TargetFile {
    tier_1_danger: Vec<Address>,
    tier_2_watchlist: Vec<Address>,
}

/// Known whale addresses seeded into T2 if the target file is empty on
/// startup, purely so the scout pass has something to watch — a
/// recoverability aid, not a source of truth.
fn fallback_watchlist() -> Vec<Address> {
    use std::str::FromStr;
    vec![
        Address::from_str("0x489ee077994B6658eAfA855C308275EAd8097C4A").unwrap(),
        Address::from_str("0x625E7708f30cA75bfd92586e17077590C60eb4cD").unwrap(),
    ]
}

pub struct TargetList {
    path: PathBuf,
    pub tier1: HashSet<Address>,
    pub tier2: HashSet<Address>,
}

impl TargetList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), tier1: HashSet::new(), tier2: HashSet::new() }
    }

    /// Reload from disk. Missing file is not an error: the lists are left
    /// untouched (the collaborator may not have written yet).
    pub async fn reload(&mut self) -> Result<()> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", self.path.display())),
        };
        let parsed: TargetFile = serde_json::from_str(&contents).with_context(|| format!("parsing {}", self.path.display()))?;
        self.tier1 = parsed.tier_1_danger.into_iter().collect();
        self.tier2 = parsed.tier_2_watchlist.into_iter().collect();

        if self.tier1.is_empty() && self.tier2.is_empty() {
            warn!("liquidation target list empty, seeding fallback watchlist");
            self.tier2 = fallback_watchlist().into_iter().collect();
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Promote scout-pass survivors into T1 and drop exited addresses from
    /// T2 in one swap, per the scout-pass contract.
    pub fn apply_scout_results(&mut self, health_factors: &[(Address, f64)]) {
        for (addr, hf) in health_factors {
            if *hf == 0.0 || *hf > T2_MAX {
                self.tier2.remove(addr);
            } else if *hf <= T1_MAX {
                self.tier2.remove(addr);
                self.tier1.insert(*addr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn reload_of_missing_file_is_a_noop() {
        let mut list = TargetList::new("/nonexistent/path/targets.json");
        list.reload().await.unwrap();
        assert!(list.tier1.is_empty());
        assert!(list.tier2.is_empty());
    }

    #[test]
    fn scout_promotes_addresses_below_t1_max() {
        let mut list = TargetList::new("unused");
        let a = addr("0x0000000000000000000000000000000000000001");
        list.tier2.insert(a);
        list.apply_scout_results(&[(a, 1.02)]);
        assert!(list.tier1.contains(&a));
        assert!(!list.tier2.contains(&a));
    }

    #[test]
    fn scout_drops_addresses_above_t2_max() {
        let mut list = TargetList::new("unused");
        let a = addr("0x0000000000000000000000000000000000000002");
        list.tier2.insert(a);
        list.apply_scout_results(&[(a, 1.50)]);
        assert!(!list.tier1.contains(&a));
        assert!(!list.tier2.contains(&a));
    }

    #[test]
    fn scout_keeps_addresses_in_between() {
        let mut list = TargetList::new("unused");
        let a = addr("0x0000000000000000000000000000000000000003");
        list.tier2.insert(a);
        list.apply_scout_results(&[(a, 1.10)]);
        assert!(!list.tier1.contains(&a));
        assert!(list.tier2.contains(&a));
    }
}
