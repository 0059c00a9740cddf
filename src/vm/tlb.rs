use lru::LruCache;
use std::num::NonZeroUsize;

/// Lookup counters, surfaced by the `stats` command.
#[derive(Clone, Copy, Debug, Default)]
pub struct TlbStats {
    pub hits: u64,
    pub misses: u64,
}

/// Set-associative VPN → PFN cache.
///
/// Each set is an [`LruCache`], so a lookup refreshes recency and an
/// insertion into a full set evicts the least recently used way. There is
/// no dirty state; the TLB only caches translations.
pub struct Tlb {
    sets: Vec<LruCache<u64, u64>>,
    pub(crate) stats: TlbStats,
}

impl Tlb {
    pub fn new(entries: usize, ways: usize) -> Self {
        assert!(
            ways > 0 && entries % ways == 0,
            "TLB entries must divide evenly into ways"
        );
        let num_sets = entries / ways;
        let sets = (0..num_sets)
            .map(|_| LruCache::new(NonZeroUsize::new(ways).unwrap()))
            .collect();
        Tlb {
            sets,
            stats: TlbStats::default(),
        }
    }

    fn set_index(&self, vpn: u64) -> usize {
        (vpn as usize) % self.sets.len()
    }

    /// Returns the cached frame number, refreshing the entry's recency.
    pub fn lookup(&mut self, vpn: u64) -> Option<u64> {
        let set = self.set_index(vpn);
        match self.sets[set].get(&vpn) {
            Some(&pfn) => {
                self.stats.hits += 1;
                Some(pfn)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, vpn: u64, pfn: u64) {
        let set = self.set_index(vpn);
        self.sets[set].put(vpn, pfn);
    }

    /// Drops the translation for `vpn`, if cached.
    pub fn invalidate(&mut self, vpn: u64) -> bool {
        let set = self.set_index(vpn);
        self.sets[set].pop(&vpn).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_insert_then_hit() {
        let mut tlb = Tlb::new(16, 4);
        assert_eq!(tlb.lookup(3), None);
        tlb.insert(3, 7);
        assert_eq!(tlb.lookup(3), Some(7));
        assert_eq!(tlb.stats.hits, 1);
        assert_eq!(tlb.stats.misses, 1);
    }

    #[test]
    fn full_set_evicts_the_least_recently_used() {
        // 16 entries, 4 ways: VPNs congruent mod 4 share a set.
        let mut tlb = Tlb::new(16, 4);
        for vpn in [0u64, 4, 8, 12] {
            tlb.insert(vpn, vpn + 100);
        }
        tlb.insert(16, 116); // fifth mapping in set 0
        assert_eq!(tlb.lookup(0), None); // the oldest is gone
        assert_eq!(tlb.lookup(4), Some(104));
        assert_eq!(tlb.lookup(16), Some(116));
    }

    #[test]
    fn lookups_keep_an_entry_resident() {
        let mut tlb = Tlb::new(16, 4);
        tlb.insert(0, 100);
        for vpn in [4u64, 8, 12] {
            tlb.insert(vpn, vpn);
        }
        // Refresh 0, then overflow the set: the refresh must save it.
        assert_eq!(tlb.lookup(0), Some(100));
        tlb.insert(16, 116);
        assert_eq!(tlb.lookup(0), Some(100));
        assert_eq!(tlb.lookup(4), None); // 4 was the LRU way instead
    }

    #[test]
    fn invalidate_drops_a_single_translation() {
        let mut tlb = Tlb::new(16, 4);
        tlb.insert(5, 2);
        tlb.insert(9, 3);
        assert!(tlb.invalidate(5));
        assert!(!tlb.invalidate(5)); // already gone
        assert_eq!(tlb.lookup(5), None);
        assert_eq!(tlb.lookup(9), Some(3));
    }

    #[test]
    fn insert_overwrites_an_existing_mapping() {
        let mut tlb = Tlb::new(16, 4);
        tlb.insert(2, 1);
        tlb.insert(2, 6);
        assert_eq!(tlb.lookup(2), Some(6));
    }
}
