//! Cache statistics.

use serde::{Deserialize, Serialize};

/// A point-in-time snapshot of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    /// Maximum number of resident values.
    pub capacity: usize,

    /// Values resident when the snapshot was taken.
    pub resident: usize,

    /// Lookups answered from a resident value.
    pub hits: u64,

    /// Lookups that had to load a value.
    pub loads: u64,

    /// Values dropped to make room for newer ones.
    pub evictions: u64,
}

impl CacheStatistics {
    /// Fraction of lookups served without loading, or 0 with no lookups.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.loads;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
