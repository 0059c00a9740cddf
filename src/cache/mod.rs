mod level;

pub use level::{CacheLevel, CacheLevelStats, EvictedLine, ReplacementPolicy};

use std::fmt;

use crate::constants::{L1_GEOMETRY, L2_GEOMETRY, L3_GEOMETRY};

/// How a hierarchy lookup was satisfied, as reported to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    L1Hit,
    L2Hit,
    L3Hit,
    RamMiss,
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestOutcome::L1Hit => "L1 Hit",
            RequestOutcome::L2Hit => "L2 Hit",
            RequestOutcome::L3Hit => "L3 Hit",
            RequestOutcome::RamMiss => "RAM Miss (Fetched to Caches)",
        })
    }
}

/// Three-level lookup cascade with inclusive-style invalidation.
///
/// Writebacks between levels are modeled as a write access to the next
/// level: the copy there is refreshed and marked dirty. A line leaving L3
/// entirely is charged to `ram_writebacks` instead of a synthetic access.
pub struct CacheHierarchy {
    l1: CacheLevel,
    l2: CacheLevel,
    l3: CacheLevel,
    ram_writebacks: u64,
}

impl CacheHierarchy {
    pub fn new(l1: CacheLevel, l2: CacheLevel, l3: CacheLevel) -> Self {
        CacheHierarchy {
            l1,
            l2,
            l3,
            ram_writebacks: 0,
        }
    }

    pub fn request(&mut self, addr: u64, is_write: bool) -> RequestOutcome {
        if self.l1.access(addr, is_write) {
            return RequestOutcome::L1Hit;
        }

        if self.l2.access(addr, is_write) {
            // Fill L1; a dirty victim is written back to L2.
            if let Some(evicted) = self.l1.insert(addr, is_write) {
                if evicted.dirty {
                    debug!("L1 writeback of {:#x} to L2", evicted.addr);
                    self.l2.access(evicted.addr, true);
                }
            }
            return RequestOutcome::L2Hit;
        }

        if self.l3.access(addr, is_write) {
            if let Some(evicted) = self.l2.insert(addr, is_write) {
                // Inclusion: a line leaving L2 must also leave L1. An L1
                // copy dirtied since the L2 fill makes the victim dirty.
                let l1_dirty = self.l1.invalidate(evicted.addr);
                if evicted.dirty || l1_dirty {
                    debug!("L2 writeback of {:#x} to L3", evicted.addr);
                    self.l3.access(evicted.addr, true);
                }
            }
            // The L1 fill here drops its victim without a writeback.
            self.l1.insert(addr, is_write);
            return RequestOutcome::L3Hit;
        }

        // Fetch from RAM into all three levels.
        if let Some(evicted) = self.l3.insert(addr, is_write) {
            let l2_dirty = self.l2.invalidate(evicted.addr);
            let l1_dirty = self.l1.invalidate(evicted.addr);
            if evicted.dirty || l2_dirty || l1_dirty {
                debug!("writing {:#x} back to RAM", evicted.addr);
                self.ram_writebacks += 1;
            }
        }
        self.l2.insert(addr, is_write);
        self.l1.insert(addr, is_write);
        RequestOutcome::RamMiss
    }

    /// Drops every cached line in `[addr, addr + len)` from all levels.
    /// The pager calls this before a physical frame is reused.
    pub fn invalidate_physical_range(&mut self, addr: u64, len: u64) {
        self.l1.invalidate_range(addr, len);
        self.l2.invalidate_range(addr, len);
        self.l3.invalidate_range(addr, len);
    }

    pub fn set_policy(&mut self, policy: ReplacementPolicy) {
        self.l1.set_policy(policy);
        self.l2.set_policy(policy);
        self.l3.set_policy(policy);
    }

    pub fn print_statistics(&self) {
        println!();
        println!("--- Cache Hierarchy Statistics ---");
        self.l1.print_stats();
        self.l2.print_stats();
        self.l3.print_stats();
        println!("RAM writebacks: {}", self.ram_writebacks);
        println!("----------------------------------");
    }

    #[cfg(test)]
    pub(crate) fn resident_anywhere(&self, addr: u64) -> bool {
        self.l1.contains(addr) || self.l2.contains(addr) || self.l3.contains(addr)
    }
}

impl Default for CacheHierarchy {
    /// The fixed L1/L2/L3 geometry, all levels starting out LRU.
    fn default() -> Self {
        let (l1_size, l1_block, l1_ways) = L1_GEOMETRY;
        let (l2_size, l2_block, l2_ways) = L2_GEOMETRY;
        let (l3_size, l3_block, l3_ways) = L3_GEOMETRY;
        CacheHierarchy::new(
            CacheLevel::new(1, l1_size, l1_block, l1_ways, ReplacementPolicy::Lru),
            CacheLevel::new(2, l2_size, l2_block, l2_ways, ReplacementPolicy::Lru),
            CacheLevel::new(3, l3_size, l3_block, l3_ways, ReplacementPolicy::Lru),
        )
    }
}
