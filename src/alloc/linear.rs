use std::collections::HashMap;

use super::{Allocator, FitStrategy};

/// One record in the block arena. Blocks tile `[0, total_size)` through
/// the `prev`/`next` links; `id` is 0 while the block is free.
#[derive(Clone, Copy, Debug)]
struct Block {
    id: u64,
    start: u64,
    size: u64,
    req_size: u64,
    free: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly linked block list with configurable fit strategies and
/// boundary coalescing.
///
/// The list is backed by an arena of records, so links are plain indices
/// rather than pointers; slots vacated by coalescing are recycled. A side
/// map from id to arena slot makes `deallocate` O(1) in list length.
pub struct LinearAllocator {
    total_size: u64,
    arena: Vec<Block>,
    recycled: Vec<usize>,
    head: Option<usize>,
    next_id: u64,
    id_map: HashMap<u64, usize>,
    attempts: u64,
    successes: u64,
}

/// Usage snapshot computed by [`LinearAllocator::statistics`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearStats {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub largest_free: u64,
    pub internal_fragmentation: u64,
    pub external_fragmentation_pct: f64,
    pub utilization_pct: f64,
    pub success_rate_pct: f64,
}

impl LinearAllocator {
    pub fn new() -> Self {
        LinearAllocator {
            total_size: 0,
            arena: Vec::new(),
            recycled: Vec::new(),
            head: None,
            next_id: 1,
            id_map: HashMap::new(),
            attempts: 0,
            successes: 0,
        }
    }

    fn new_slot(&mut self, block: Block) -> usize {
        match self.recycled.pop() {
            Some(slot) => {
                self.arena[slot] = block;
                slot
            }
            None => {
                self.arena.push(block);
                self.arena.len() - 1
            }
        }
    }

    fn release_slot(&mut self, slot: usize) {
        self.recycled.push(slot);
    }

    /// Walks the block list in address order.
    fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        std::iter::successors(self.head, |&slot| self.arena[slot].next)
            .map(|slot| &self.arena[slot])
    }

    pub fn statistics(&self) -> LinearStats {
        let mut free = 0u64;
        let mut used = 0u64;
        let mut internal = 0u64;
        let mut largest_free = 0u64;
        for block in self.blocks() {
            if block.free {
                free += block.size;
                largest_free = largest_free.max(block.size);
            } else {
                used += block.size;
                internal += block.size - block.req_size;
            }
        }
        let external = if free > 0 {
            (free - largest_free) as f64 / free as f64 * 100.0
        } else {
            0.0
        };
        let utilization = if self.total_size > 0 {
            used as f64 / self.total_size as f64 * 100.0
        } else {
            0.0
        };
        let success_rate = if self.attempts > 0 {
            self.successes as f64 / self.attempts as f64 * 100.0
        } else {
            0.0
        };
        LinearStats {
            total: self.total_size,
            used,
            free,
            largest_free,
            internal_fragmentation: internal,
            external_fragmentation_pct: external,
            utilization_pct: utilization,
            success_rate_pct: success_rate,
        }
    }
}

impl Default for LinearAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for LinearAllocator {
    fn init(&mut self, size: u64) {
        self.arena.clear();
        self.recycled.clear();
        self.id_map.clear();
        self.head = None;
        self.total_size = size;
        self.next_id = 1;
        self.attempts = 0;
        self.successes = 0;
        if size == 0 {
            return;
        }
        let slot = self.new_slot(Block {
            id: 0,
            start: 0,
            size,
            req_size: 0,
            free: true,
            prev: None,
            next: None,
        });
        self.head = Some(slot);
        println!("[System] Linear Memory Initialized: {} bytes.", size);
    }

    fn allocate(&mut self, size: u64, strategy: FitStrategy) -> Option<u64> {
        if size == 0 {
            return None;
        }
        self.attempts += 1;

        let mut chosen: Option<usize> = None;
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let block = &self.arena[slot];
            if block.free && block.size >= size {
                match strategy {
                    FitStrategy::FirstFit => {
                        chosen = Some(slot);
                        break;
                    }
                    // Ties keep the earliest address: strict comparisons only.
                    FitStrategy::BestFit => {
                        if chosen.map_or(true, |c| block.size < self.arena[c].size) {
                            chosen = Some(slot);
                        }
                    }
                    FitStrategy::WorstFit => {
                        if chosen.map_or(true, |c| block.size > self.arena[c].size) {
                            chosen = Some(slot);
                        }
                    }
                }
            }
            cursor = block.next;
        }
        let chosen = chosen?;

        // Split off the tail when the fit is not exact.
        if self.arena[chosen].size > size {
            let Block {
                start,
                size: old_size,
                next,
                ..
            } = self.arena[chosen];
            let remainder = self.new_slot(Block {
                id: 0,
                start: start + size,
                size: old_size - size,
                req_size: 0,
                free: true,
                prev: Some(chosen),
                next,
            });
            if let Some(after) = next {
                self.arena[after].prev = Some(remainder);
            }
            self.arena[chosen].next = Some(remainder);
            self.arena[chosen].size = size;
        }

        let id = self.next_id;
        self.next_id += 1;
        let block = &mut self.arena[chosen];
        block.free = false;
        block.id = id;
        block.req_size = size;
        self.id_map.insert(id, chosen);
        self.successes += 1;
        Some(id)
    }

    fn deallocate(&mut self, id: u64) -> bool {
        let cur = match self.id_map.remove(&id) {
            Some(slot) => slot,
            None => return false,
        };
        {
            let block = &mut self.arena[cur];
            block.free = true;
            block.id = 0;
            block.req_size = 0;
        }

        // Absorb the next neighbor if it is free.
        if let Some(next) = self.arena[cur].next {
            if self.arena[next].free {
                let Block {
                    size: next_size,
                    next: after,
                    ..
                } = self.arena[next];
                self.arena[cur].size += next_size;
                self.arena[cur].next = after;
                if let Some(after) = after {
                    self.arena[after].prev = Some(cur);
                }
                self.release_slot(next);
            }
        }

        // Then fold into the previous neighbor if it is free.
        if let Some(prev) = self.arena[cur].prev {
            if self.arena[prev].free {
                let Block {
                    size: cur_size,
                    next: after,
                    ..
                } = self.arena[cur];
                self.arena[prev].size += cur_size;
                self.arena[prev].next = after;
                if let Some(after) = after {
                    self.arena[after].prev = Some(prev);
                }
                self.release_slot(cur);
            }
        }
        true
    }

    fn address_of(&self, id: u64) -> Option<u64> {
        self.id_map.get(&id).map(|&slot| self.arena[slot].start)
    }

    fn display(&self) {
        for block in self.blocks() {
            let end = block.start + block.size - 1;
            if block.free {
                println!("[0x{:04X} - 0x{:04X}] FREE", block.start, end);
            } else {
                println!("[0x{:04X} - 0x{:04X}] USED (id={})", block.start, end, block.id);
            }
        }
    }

    fn print_statistics(&self) {
        let stats = self.statistics();
        println!("Total memory: {}", stats.total);
        println!("Used memory: {}", stats.used);
        println!("Internal fragmentation: {}", stats.internal_fragmentation);
        println!("External fragmentation: {:.0}%", stats.external_fragmentation_pct);
        println!("Allocation success rate: {:.0}%", stats.success_rate_pct);
        println!("Memory utilization: {:.0}%", stats.utilization_pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(size: u64) -> LinearAllocator {
        let mut alloc = LinearAllocator::new();
        alloc.init(size);
        alloc
    }

    /// (start, size, free, id) tuples in address order.
    fn layout(alloc: &LinearAllocator) -> Vec<(u64, u64, bool, u64)> {
        alloc
            .blocks()
            .map(|b| (b.start, b.size, b.free, b.id))
            .collect()
    }

    fn assert_tiles(alloc: &LinearAllocator) {
        let mut expected_start = 0;
        let mut prev_free = false;
        for (i, block) in alloc.blocks().enumerate() {
            assert_eq!(block.start, expected_start, "gap before block {}", i);
            assert!(block.size > 0);
            if i > 0 {
                assert!(!(prev_free && block.free), "adjacent free blocks at {}", block.start);
            }
            prev_free = block.free;
            expected_start += block.size;
        }
        assert_eq!(expected_start, alloc.total_size);
    }

    #[test]
    fn first_fit_reuses_earliest_hole() {
        let mut alloc = fresh(1024);
        assert_eq!(alloc.allocate(100, FitStrategy::FirstFit), Some(1));
        assert_eq!(alloc.allocate(200, FitStrategy::FirstFit), Some(2));
        assert!(alloc.deallocate(1));
        assert_eq!(alloc.allocate(50, FitStrategy::FirstFit), Some(3));
        // Block 3 lands at the start of block 1's hole.
        assert_eq!(alloc.address_of(3), Some(0));
        assert_eq!(
            layout(&alloc),
            vec![
                (0, 50, false, 3),
                (50, 50, true, 0),
                (100, 200, false, 2),
                (300, 724, true, 0),
            ]
        );
        assert_tiles(&alloc);
    }

    #[test]
    fn best_and_worst_fit_pick_by_hole_size() {
        // Carve holes of 100 and 50 bytes, with the 830-byte tail free.
        let mut alloc = fresh(1000);
        let a = alloc.allocate(100, FitStrategy::FirstFit).unwrap();
        alloc.allocate(10, FitStrategy::FirstFit).unwrap();
        let c = alloc.allocate(50, FitStrategy::FirstFit).unwrap();
        alloc.allocate(10, FitStrategy::FirstFit).unwrap();
        alloc.deallocate(a);
        alloc.deallocate(c);

        let best = alloc.allocate(40, FitStrategy::BestFit).unwrap();
        assert_eq!(alloc.address_of(best), Some(110)); // the 50-byte hole
        let worst = alloc.allocate(40, FitStrategy::WorstFit).unwrap();
        assert_eq!(alloc.address_of(worst), Some(170)); // the tail
        let first = alloc.allocate(40, FitStrategy::FirstFit).unwrap();
        assert_eq!(alloc.address_of(first), Some(0));
        assert_tiles(&alloc);
    }

    #[test]
    fn freeing_everything_coalesces_to_one_block() {
        let mut alloc = fresh(512);
        let ids: Vec<u64> = (0..4)
            .map(|_| alloc.allocate(64, FitStrategy::FirstFit).unwrap())
            .collect();
        // Free out of order; every release must keep the tiling intact.
        for &id in &[ids[2], ids[0], ids[3], ids[1]] {
            assert!(alloc.deallocate(id));
            assert_tiles(&alloc);
        }
        assert_eq!(layout(&alloc), vec![(0, 512, true, 0)]);
    }

    #[test]
    fn exact_fit_consumes_the_hole_without_splitting() {
        let mut alloc = fresh(128);
        let id = alloc.allocate(128, FitStrategy::FirstFit).unwrap();
        assert_eq!(layout(&alloc), vec![(0, 128, false, id)]);
        assert!(alloc.allocate(1, FitStrategy::FirstFit).is_none());
    }

    #[test]
    fn rejects_zero_and_oversize_requests() {
        let mut alloc = fresh(100);
        assert!(alloc.allocate(0, FitStrategy::FirstFit).is_none());
        assert!(alloc.allocate(101, FitStrategy::FirstFit).is_none());
        // Zero-size requests are not counted as attempts; the oversize one is.
        let stats = alloc.statistics();
        assert_eq!(stats.success_rate_pct, 0.0);
        assert_eq!(alloc.attempts, 1);
    }

    #[test]
    fn unknown_id_free_is_a_noop() {
        let mut alloc = fresh(256);
        alloc.allocate(10, FitStrategy::FirstFit).unwrap();
        let before = layout(&alloc);
        assert!(!alloc.deallocate(42));
        assert_eq!(layout(&alloc), before);
        // Ids are never reused, so a stale id stays dead.
        alloc.deallocate(1);
        assert!(!alloc.deallocate(1));
    }

    #[test]
    fn init_zero_yields_empty_allocator() {
        let mut alloc = fresh(0);
        assert!(alloc.allocate(1, FitStrategy::FirstFit).is_none());
        assert_eq!(layout(&alloc), vec![]);
        assert_eq!(alloc.statistics().total, 0);
    }

    #[test]
    fn reinit_discards_previous_blocks() {
        let mut alloc = fresh(1024);
        alloc.allocate(100, FitStrategy::FirstFit).unwrap();
        alloc.init(64);
        assert_eq!(layout(&alloc), vec![(0, 64, true, 0)]);
        assert_eq!(alloc.address_of(1), None);
        // Ids restart after a reinit.
        assert_eq!(alloc.allocate(8, FitStrategy::FirstFit), Some(1));
    }

    #[test]
    fn statistics_track_fragmentation() {
        let mut alloc = fresh(1024);
        alloc.allocate(100, FitStrategy::FirstFit).unwrap();
        alloc.allocate(200, FitStrategy::FirstFit).unwrap();
        alloc.deallocate(1);
        alloc.allocate(50, FitStrategy::FirstFit).unwrap();

        let stats = alloc.statistics();
        assert_eq!(stats.used, 250);
        assert_eq!(stats.free, 774);
        assert_eq!(stats.largest_free, 724);
        // Splits are byte-exact, so no internal fragmentation accrues.
        assert_eq!(stats.internal_fragmentation, 0);
        assert!((stats.external_fragmentation_pct - 50.0 / 774.0 * 100.0).abs() < 1e-9);
        assert!((stats.utilization_pct - 250.0 / 1024.0 * 100.0).abs() < 1e-9);
        assert_eq!(stats.success_rate_pct, 100.0);
    }
}
