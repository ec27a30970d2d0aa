//! Cache Statistics Module
//!
//! Lookup and write counters kept by the coordinator, and the report shape
//! exposed to operators.

use serde::Serialize;

use crate::cache::LocalStoreStats;

// == Cache Stats ==
/// Monotonic counters, zeroed only by an explicit reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered by L1
    pub l1_hits: u64,
    /// Lookups answered by L2
    pub l2_hits: u64,
    /// Lookups answered by neither layer
    pub misses: u64,
    /// Attempted writes, including failed ones
    pub sets: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_l1_hit(&mut self) {
        self.l1_hits += 1;
    }

    pub fn record_l2_hit(&mut self) {
        self.l2_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Total number of lookups.
    pub fn lookups(&self) -> u64 {
        self.l1_hits + self.l2_hits + self.misses
    }

    /// Builds the operator report, combining counters with L1 bookkeeping.
    pub fn report(&self, local: LocalStoreStats) -> StatsReport {
        let lookups = self.lookups();
        let hits = self.l1_hits + self.l2_hits;

        StatsReport {
            l1: L1Report {
                hits: self.l1_hits,
                hit_rate: ratio(self.l1_hits, lookups),
                keys: local.keys,
                evictions: local.evictions,
                expirations: local.expirations,
            },
            l2: L2Report {
                hits: self.l2_hits,
                hit_rate: ratio(self.l2_hits, lookups),
            },
            total: TotalReport {
                hits,
                misses: self.misses,
                sets: self.sets,
                hit_rate: ratio(hits, lookups),
            },
        }
    }
}

/// Returns part / whole, or 0.0 if nothing was looked up.
fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct L1Report {
    pub hits: u64,
    pub hit_rate: f64,
    pub keys: usize,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct L2Report {
    pub hits: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalReport {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub hit_rate: f64,
}

/// Point-in-time statistics per layer and in aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub l1: L1Report,
    pub l2: L2Report,
    pub total: TotalReport,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_no_lookups() {
        let report = CacheStats::new().report(LocalStoreStats::default());
        assert_eq!(report.total.hit_rate, 0.0);
        assert_eq!(report.l1.hit_rate, 0.0);
        assert_eq!(report.l2.hit_rate, 0.0);
    }

    #[test]
    fn test_report_rates() {
        let mut stats = CacheStats::new();
        stats.record_l1_hit();
        stats.record_l1_hit();
        stats.record_l2_hit();
        stats.record_miss();
        stats.record_set();

        let report = stats.report(LocalStoreStats {
            keys: 7,
            evictions: 1,
            expirations: 2,
        });

        assert_eq!(report.l1.hit_rate, 0.5);
        assert_eq!(report.l2.hit_rate, 0.25);
        assert_eq!(report.total.hits, 3);
        assert_eq!(report.total.hit_rate, 0.75);
        assert_eq!(report.total.sets, 1);
        assert_eq!(report.l1.keys, 7);
        assert_eq!(report.l1.expirations, 2);
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let mut stats = CacheStats::new();
        stats.record_l1_hit();
        stats.record_miss();
        stats.record_set();

        stats.reset();

        assert_eq!(stats, CacheStats::default());
    }
}
