#[macro_use]
extern crate log;

mod alloc;
mod cache;
mod cli;
mod constants;
mod shell;
mod vm;

pub use crate::alloc::{
    Allocator, BuddyAllocator, BuddyStats, FitStrategy, LinearAllocator, LinearStats,
};
pub use crate::cache::{
    CacheHierarchy, CacheLevel, CacheLevelStats, EvictedLine, ReplacementPolicy, RequestOutcome,
};
pub use crate::cli::{parse_num, Args};
pub use crate::constants::*;
pub use crate::shell::{Signal, Simulator};
pub use crate::vm::{Mmu, PageReplacement, Tlb, TlbStats, Translation, VmStats};
