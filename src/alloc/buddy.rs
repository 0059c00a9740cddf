use std::collections::HashMap;

use super::{Allocator, FitStrategy};

#[derive(Clone, Copy, Debug)]
struct AllocatedBlock {
    addr: u64,
    size: u64,
}

/// Power-of-two buddy system.
///
/// Free lists are indexed by order `k` (block size `2^k`) and hold block
/// start addresses. A block's buddy sits at `addr ^ size`, so splitting
/// and merging are pure address arithmetic; freed blocks merge upward
/// until the buddy is busy or the whole arena is free again.
pub struct BuddyAllocator {
    total_size: u64,
    next_id: u64,
    free_lists: Vec<Vec<u64>>,
    allocated: HashMap<u64, AllocatedBlock>,
}

/// Usage snapshot computed by [`BuddyAllocator::statistics`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuddyStats {
    pub total: u64,
    pub allocated_blocks: usize,
    pub free_blocks: usize,
    pub free: u64,
    pub used: u64,
}

fn order_of(size: u64) -> usize {
    debug_assert!(size.is_power_of_two());
    size.trailing_zeros() as usize
}

impl BuddyAllocator {
    pub fn new() -> Self {
        BuddyAllocator {
            total_size: 0,
            next_id: 1,
            free_lists: Vec::new(),
            allocated: HashMap::new(),
        }
    }

    pub fn statistics(&self) -> BuddyStats {
        let mut free = 0u64;
        let mut free_blocks = 0usize;
        for (order, list) in self.free_lists.iter().enumerate() {
            free += (1u64 << order) * list.len() as u64;
            free_blocks += list.len();
        }
        BuddyStats {
            total: self.total_size,
            allocated_blocks: self.allocated.len(),
            free_blocks,
            free,
            used: self.total_size - free,
        }
    }
}

impl Default for BuddyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for BuddyAllocator {
    fn init(&mut self, size: u64) {
        self.allocated.clear();
        self.free_lists.clear();
        self.next_id = 1;
        self.total_size = 0;

        let total = match size.checked_next_power_of_two() {
            Some(total) => total,
            None => {
                error!("requested size too large for the buddy allocator");
                return;
            }
        };
        self.total_size = total;
        let max_order = order_of(total);
        self.free_lists = vec![Vec::new(); max_order + 1];
        self.free_lists[max_order].push(0);
        println!(
            "[System] Buddy Memory Initialized: {} bytes (Order {}).",
            total, max_order
        );
    }

    fn allocate(&mut self, size: u64, _strategy: FitStrategy) -> Option<u64> {
        if size == 0 || self.free_lists.is_empty() {
            return None;
        }
        let req = size.checked_next_power_of_two()?;
        if req > self.total_size {
            return None;
        }
        let req_order = order_of(req);

        // Lowest stocked order that can satisfy the request.
        let order = (req_order..self.free_lists.len()).find(|&k| !self.free_lists[k].is_empty())?;
        let addr = self.free_lists[order].pop()?;

        // Split down to the requested order, shelving the upper halves.
        let mut block_size = 1u64 << order;
        let mut k = order;
        while k > req_order {
            k -= 1;
            block_size /= 2;
            self.free_lists[k].push(addr + block_size);
        }

        let id = self.next_id;
        self.next_id += 1;
        self.allocated.insert(
            id,
            AllocatedBlock {
                addr,
                size: block_size,
            },
        );
        Some(id)
    }

    fn deallocate(&mut self, id: u64) -> bool {
        let block = match self.allocated.remove(&id) {
            Some(block) => block,
            None => return false,
        };
        let mut addr = block.addr;
        let mut size = block.size;

        // Merge with the buddy while it is also free.
        while size < self.total_size {
            let buddy = addr ^ size;
            let order = order_of(size);
            match self.free_lists[order].iter().position(|&a| a == buddy) {
                Some(pos) => {
                    self.free_lists[order].remove(pos);
                    addr = addr.min(buddy);
                    size *= 2;
                }
                None => break,
            }
        }
        self.free_lists[order_of(size)].push(addr);
        true
    }

    fn address_of(&self, id: u64) -> Option<u64> {
        self.allocated.get(&id).map(|block| block.addr)
    }

    fn display(&self) {
        println!("--- Free Lists ---");
        for (order, list) in self.free_lists.iter().enumerate() {
            let size = 1u64 << order;
            print!("Order {:2} ({:5}):", order, size);
            if list.is_empty() {
                print!(" (empty)");
            }
            for addr in list {
                print!(" [addr {}, size {}]", addr, size);
            }
            println!();
        }
    }

    fn print_statistics(&self) {
        let stats = self.statistics();
        println!("Total Memory      : {}", stats.total);
        println!("Allocated Blocks  : {}", stats.allocated_blocks);
        println!("Free Blocks       : {}", stats.free_blocks);
        println!("Free Memory       : {}", stats.free);
        println!("Used Memory       : {}", stats.used);
    }
}
