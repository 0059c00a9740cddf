//! Fixed geometry of the simulated machine.

/// Bytes per virtual page (and per physical frame).
pub const PAGE_SIZE: u64 = 64;
/// Bytes of virtual address space.
pub const VIRTUAL_MEM_SIZE: u64 = 4096;
/// Bytes of physical memory backing the pager.
pub const PHYSICAL_MEM_SIZE: u64 = 1024;

pub const NUM_PAGES: usize = (VIRTUAL_MEM_SIZE / PAGE_SIZE) as usize;
pub const NUM_FRAMES: usize = (PHYSICAL_MEM_SIZE / PAGE_SIZE) as usize;

pub const TLB_ENTRIES: usize = 16;
pub const TLB_WAYS: usize = 4;

/// Per-level cache geometry: (total bytes, block bytes, ways).
pub const L1_GEOMETRY: (u64, u64, usize) = (64, 8, 1);
pub const L2_GEOMETRY: (u64, u64, usize) = (256, 16, 2);
pub const L3_GEOMETRY: (u64, u64, usize) = (512, 32, 4);
