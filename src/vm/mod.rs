mod tlb;

pub use tlb::{Tlb, TlbStats};

use clap::ValueEnum;
use std::fmt;

use crate::cache::CacheHierarchy;
use crate::constants::{NUM_FRAMES, NUM_PAGES, PAGE_SIZE, TLB_ENTRIES, TLB_WAYS, VIRTUAL_MEM_SIZE};

/// Page replacement policy.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
pub enum PageReplacement {
    Lru,
    Fifo,
    Clock,
}

impl fmt::Display for PageReplacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PageReplacement::Lru => "LRU",
            PageReplacement::Fifo => "FIFO",
            PageReplacement::Clock => "CLOCK",
        })
    }
}

/// How a translation was satisfied, as reported to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Translation {
    TlbHit,
    PageTableHit,
    PageFault,
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Translation::TlbHit => "TLB Hit",
            Translation::PageTableHit => "Page Table Hit",
            Translation::PageFault => "Page Fault",
        })
    }
}

#[derive(Clone, Copy, Default, Debug)]
struct PageTableEntry {
    valid: bool,
    dirty: bool,
    referenced: bool,
    frame: usize,
    last_access: u64,
    loaded_at: u64,
}

/// Counter snapshot for the `stats` command.
#[derive(Clone, Copy, Debug)]
pub struct VmStats {
    pub page_hits: u64,
    pub page_faults: u64,
    pub disk_accesses: u64,
    pub tlb: TlbStats,
}

/// Demand pager: page table, inverted frame table, and TLB.
///
/// The cache hierarchy is borrowed per call rather than stored, so page
/// eviction can scrub the victim frame's physical lines before the caller
/// issues any request against the reclaimed frame.
pub struct Mmu {
    page_table: Vec<PageTableEntry>,
    frame_table: Vec<Option<u64>>,
    tlb: Tlb,
    policy: PageReplacement,
    clock_hand: usize,
    access_counter: u64,
    page_hits: u64,
    page_faults: u64,
    disk_accesses: u64,
}

impl Mmu {
    pub fn new(policy: PageReplacement) -> Self {
        Mmu {
            page_table: vec![PageTableEntry::default(); NUM_PAGES],
            frame_table: vec![None; NUM_FRAMES],
            tlb: Tlb::new(TLB_ENTRIES, TLB_WAYS),
            policy,
            clock_hand: 0,
            access_counter: 0,
            page_hits: 0,
            page_faults: 0,
            disk_accesses: 0,
        }
    }

    /// Applies to subsequent evictions; the clock hand and reference bits
    /// are left as they are.
    pub fn set_replacement_policy(&mut self, policy: PageReplacement) {
        self.policy = policy;
    }

    /// Translates a virtual address, faulting the page in if needed.
    ///
    /// `v_addr` must lie inside the virtual address space; the dispatcher
    /// rejects out-of-range input before calling.
    pub fn translate(
        &mut self,
        v_addr: u64,
        is_write: bool,
        caches: &mut CacheHierarchy,
    ) -> (u64, Translation) {
        debug_assert!(v_addr < VIRTUAL_MEM_SIZE);
        self.access_counter += 1;
        let vpn = v_addr / PAGE_SIZE;
        let offset = v_addr % PAGE_SIZE;

        if let Some(pfn) = self.tlb.lookup(vpn) {
            self.page_hits += 1;
            return (pfn * PAGE_SIZE + offset, Translation::TlbHit);
        }

        let page = vpn as usize;
        if self.page_table[page].valid {
            self.page_hits += 1;
            let entry = &mut self.page_table[page];
            entry.last_access = self.access_counter;
            entry.referenced = true;
            entry.dirty |= is_write;
            let frame = entry.frame;
            self.tlb.insert(vpn, frame as u64);
            return (frame as u64 * PAGE_SIZE + offset, Translation::PageTableHit);
        }

        // Page fault: bring the page in from "disk".
        self.page_faults += 1;
        self.disk_accesses += 1;
        let frame = match self.find_free_frame() {
            Some(frame) => frame,
            None => self.evict_page(caches),
        };
        self.page_table[page] = PageTableEntry {
            valid: true,
            dirty: is_write,
            referenced: true,
            frame,
            last_access: self.access_counter,
            loaded_at: self.access_counter,
        };
        self.frame_table[frame] = Some(vpn);
        self.tlb.insert(vpn, frame as u64);
        (frame as u64 * PAGE_SIZE + offset, Translation::PageFault)
    }

    fn find_free_frame(&self) -> Option<usize> {
        self.frame_table.iter().position(|occupant| occupant.is_none())
    }

    /// Selects a victim frame, scrubs its cached lines, and unmaps it.
    /// Only called when every frame is occupied.
    fn evict_page(&mut self, caches: &mut CacheHierarchy) -> usize {
        let policy = self.policy;
        let (frame, vpn) = match policy {
            PageReplacement::Lru | PageReplacement::Fifo => self
                .frame_table
                .iter()
                .enumerate()
                .filter_map(|(frame, occupant)| occupant.map(|vpn| (frame, vpn)))
                .min_by_key(|&(_, vpn)| {
                    let entry = &self.page_table[vpn as usize];
                    match policy {
                        PageReplacement::Lru => entry.last_access,
                        _ => entry.loaded_at,
                    }
                })
                .expect("eviction with no resident pages"),
            PageReplacement::Clock => loop {
                let vpn = self.frame_table[self.clock_hand]
                    .expect("clock sweep over an unoccupied frame");
                let entry = &mut self.page_table[vpn as usize];
                if entry.referenced {
                    entry.referenced = false;
                    self.clock_hand = (self.clock_hand + 1) % NUM_FRAMES;
                } else {
                    let victim = (self.clock_hand, vpn);
                    self.clock_hand = (self.clock_hand + 1) % NUM_FRAMES;
                    break victim;
                }
            },
        };

        // Stale physical lines must go before the frame is reused.
        caches.invalidate_physical_range(frame as u64 * PAGE_SIZE, PAGE_SIZE);

        let page = vpn as usize;
        if self.page_table[page].dirty {
            self.disk_accesses += 1;
        }
        debug!("evicted page {} from frame {} ({})", vpn, frame, policy);
        self.page_table[page].valid = false;
        self.frame_table[frame] = None;
        self.tlb.invalidate(vpn);
        frame
    }

    pub fn statistics(&self) -> VmStats {
        VmStats {
            page_hits: self.page_hits,
            page_faults: self.page_faults,
            disk_accesses: self.disk_accesses,
            tlb: self.tlb.stats,
        }
    }

    pub fn print_statistics(&self) {
        let stats = self.statistics();
        println!(
            "VM: Hits={}, Faults={}, Disk={}",
            stats.page_hits, stats.page_faults, stats.disk_accesses
        );
        println!("TLB: Hits={}, Misses={}", stats.tlb.hits, stats.tlb.misses);
    }
}
