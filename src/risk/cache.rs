//! Short-lived verdict cache owned by a single [`RiskGate`](super::RiskGate).

use super::RiskVerdict;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry {
    verdict: RiskVerdict,
    stored_at: Instant,
}

/// Bounded, time-expiring map from address to its last definitive verdict.
#[derive(Debug)]
pub struct VerdictCache {
    entries: Mutex<HashMap<IpAddr, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl VerdictCache {
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Fresh verdict for `address`, if any. Expired entries are dropped on read.
    pub fn get(&self, address: &IpAddr) -> Option<RiskVerdict> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(address) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.verdict.clone()),
            Some(_) => {
                entries.remove(address);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, address: IpAddr, verdict: RiskVerdict) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if entries.len() >= self.capacity && !entries.contains_key(&address) {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(address, _)| *address);
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            address,
            Entry {
                verdict,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{RiskStatus, VerdictSource};

    fn verdict(address: &str, status: RiskStatus) -> RiskVerdict {
        RiskVerdict::new(address, status, VerdictSource::Feed)
    }

    fn ip(address: &str) -> IpAddr {
        address
            .parse()
            .unwrap_or_else(|err| panic!("{address}: {err}"))
    }

    #[test]
    fn returns_fresh_entries() {
        let cache = VerdictCache::new(Duration::from_secs(60), 8);
        cache.insert(ip("8.8.8.8"), verdict("8.8.8.8", RiskStatus::Allowed));
        assert_eq!(
            cache.get(&ip("8.8.8.8")).map(|v| v.status),
            Some(RiskStatus::Allowed)
        );
        assert!(cache.get(&ip("1.1.1.1")).is_none());
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = VerdictCache::new(Duration::ZERO, 8);
        cache.insert(ip("8.8.8.8"), verdict("8.8.8.8", RiskStatus::Allowed));
        assert!(cache.get(&ip("8.8.8.8")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = VerdictCache::new(Duration::from_secs(60), 2);
        cache.insert(ip("10.0.0.1"), verdict("10.0.0.1", RiskStatus::Allowed));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(ip("10.0.0.2"), verdict("10.0.0.2", RiskStatus::Banned));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(ip("10.0.0.3"), verdict("10.0.0.3", RiskStatus::Allowed));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&ip("10.0.0.1")).is_none());
        assert!(cache.get(&ip("10.0.0.2")).is_some());
        assert!(cache.get(&ip("10.0.0.3")).is_some());
    }
}
