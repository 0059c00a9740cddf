mod buddy;
mod linear;

pub use buddy::{BuddyAllocator, BuddyStats};
pub use linear::{LinearAllocator, LinearStats};

/// Placement strategy for the linear allocator. The buddy allocator
/// ignores it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum FitStrategy {
    #[default]
    FirstFit,
    BestFit,
    WorstFit,
}

/// Capability set shared by both allocator designs.
pub trait Allocator {
    /// Discards all prior state and installs `size` bytes of free memory.
    fn init(&mut self, size: u64);
    /// Returns the id of the new block, or `None` when the request cannot
    /// be satisfied.
    fn allocate(&mut self, size: u64, strategy: FitStrategy) -> Option<u64>;
    /// Releases a block. Returns false when the id is unknown.
    fn deallocate(&mut self, id: u64) -> bool;
    /// Start address of a live block.
    fn address_of(&self, id: u64) -> Option<u64>;
    /// Prints the block map.
    fn display(&self);
    /// Prints usage statistics.
    fn print_statistics(&self);
}
