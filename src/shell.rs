use clap::ValueEnum;

use crate::alloc::{Allocator, BuddyAllocator, FitStrategy, LinearAllocator};
use crate::cache::{CacheHierarchy, ReplacementPolicy};
use crate::cli::parse_num;
use crate::constants::VIRTUAL_MEM_SIZE;
use crate::vm::{Mmu, PageReplacement};

/// What the driver loop should do after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ActiveAllocator {
    Linear,
    Buddy,
}

/// The whole simulated machine, threaded through every command handler.
///
/// Both allocators stay live so `set allocator` can switch between them
/// without losing state; `init memory` reinitializes both and leaves the
/// caches and the pager alone.
pub struct Simulator {
    linear: LinearAllocator,
    buddy: BuddyAllocator,
    active: ActiveAllocator,
    strategy: FitStrategy,
    caches: CacheHierarchy,
    mmu: Mmu,
    initialized: bool,
}

impl Simulator {
    pub fn new(cache_policy: ReplacementPolicy, page_policy: PageReplacement) -> Self {
        let mut caches = CacheHierarchy::default();
        caches.set_policy(cache_policy);
        Simulator {
            linear: LinearAllocator::new(),
            buddy: BuddyAllocator::new(),
            active: ActiveAllocator::Linear,
            strategy: FitStrategy::FirstFit,
            caches,
            mmu: Mmu::new(page_policy),
            initialized: false,
        }
    }

    pub fn print_banner() {
        println!("====================================================");
        println!("   Memory Management Simulator CLI");
        println!("   Commands:");
        println!("   - init memory <size>");
        println!("   - set cache_policy <LRU|FIFO|LFU>");
        println!("   - set page_policy <LRU|FIFO|CLOCK>");
        println!("   - set allocator <buddy|first_fit|best_fit|worst_fit>");
        println!("   - malloc <size> | free <id> | stats");
        println!("   - read <v_addr> | write <v_addr>");
        println!("   - dump memory | exit");
        println!("====================================================");
    }

    fn active_mut(&mut self) -> &mut dyn Allocator {
        match self.active {
            ActiveAllocator::Linear => &mut self.linear,
            ActiveAllocator::Buddy => &mut self.buddy,
        }
    }

    fn active_ref(&self) -> &dyn Allocator {
        match self.active {
            ActiveAllocator::Linear => &self.linear,
            ActiveAllocator::Buddy => &self.buddy,
        }
    }

    /// Runs one whitespace-tokenized command line.
    pub fn execute(&mut self, line: &str) -> Signal {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => {}
            ["exit", ..] => return Signal::Exit,
            ["init", "memory", size, ..] => self.init_memory(size),
            _ if !self.initialized => {
                println!("Error: Memory not initialized. Run 'init memory <size>' first.");
            }
            ["set", "cache_policy", policy, ..] => self.set_cache_policy(policy),
            ["set", "page_policy", policy, ..] => self.set_page_policy(policy),
            ["set", "allocator", which, ..] => self.set_allocator(which),
            ["malloc", size, ..] => self.malloc(size),
            ["free", id, ..] => self.free(id),
            [cmd @ ("read" | "write"), addr, ..] => self.mem_access(addr, *cmd == "write"),
            ["stats", ..] => {
                self.active_ref().print_statistics();
                self.caches.print_statistics();
                self.mmu.print_statistics();
            }
            ["dump", "memory", ..] => self.active_ref().display(),
            [other, ..] => println!("Unknown command: {}", other),
        }
        Signal::Continue
    }

    fn init_memory(&mut self, token: &str) {
        match parse_num(token) {
            Ok(size) => {
                self.linear.init(size);
                self.buddy.init(size);
                self.initialized = true;
                println!("Physical memory initialized to {} bytes.", size);
            }
            Err(_) => println!("Error: Invalid memory size."),
        }
    }

    fn set_cache_policy(&mut self, token: &str) {
        match ReplacementPolicy::from_str(token, true) {
            Ok(policy) => {
                self.caches.set_policy(policy);
                println!("Cache replacement policy set to {} for all levels.", policy);
            }
            Err(_) => println!(
                "Error: Unknown cache policy '{}'. Use LRU, FIFO, or LFU.",
                token
            ),
        }
    }

    fn set_page_policy(&mut self, token: &str) {
        match PageReplacement::from_str(token, true) {
            Ok(policy) => {
                self.mmu.set_replacement_policy(policy);
                println!("Page replacement policy set to {}.", policy);
            }
            Err(_) => println!(
                "Error: Unknown page policy '{}'. Use LRU, FIFO, or CLOCK.",
                token
            ),
        }
    }

    fn set_allocator(&mut self, token: &str) {
        if token == "buddy" {
            self.active = ActiveAllocator::Buddy;
            println!("Allocator set to Buddy System.");
        } else {
            self.active = ActiveAllocator::Linear;
            // Unrecognized strategies fall back to first-fit.
            self.strategy = match token {
                "best_fit" => FitStrategy::BestFit,
                "worst_fit" => FitStrategy::WorstFit,
                _ => FitStrategy::FirstFit,
            };
            println!("Allocator set to Linear ({}).", token);
        }
    }

    fn malloc(&mut self, token: &str) {
        let size = match parse_num(token) {
            Ok(size) => size,
            Err(_) => {
                println!("Error: Invalid size.");
                return;
            }
        };
        let strategy = self.strategy;
        match self.active_mut().allocate(size, strategy) {
            Some(id) => {
                let addr = self
                    .active_ref()
                    .address_of(id)
                    .expect("freshly allocated block has an address");
                println!("Allocated block id={} at address=0x{:04x}", id, addr);
            }
            None => println!("Allocation failed."),
        }
    }

    fn free(&mut self, token: &str) {
        match parse_num(token) {
            Ok(id) => {
                if self.active_mut().deallocate(id) {
                    println!("Block {} freed.", id);
                } else {
                    println!("Block {} not found.", id);
                }
            }
            Err(_) => println!("Error: Invalid id."),
        }
    }

    fn mem_access(&mut self, token: &str, is_write: bool) {
        let v_addr = match parse_num(token) {
            Ok(addr) => addr,
            Err(_) => {
                println!("Error: Invalid address.");
                return;
            }
        };
        if v_addr >= VIRTUAL_MEM_SIZE {
            println!(
                "Error: Virtual address out of range (max {}).",
                VIRTUAL_MEM_SIZE - 1
            );
            return;
        }
        let (p_addr, translation) = self.mmu.translate(v_addr, is_write, &mut self.caches);
        println!("[MMU] {}", translation);
        println!("[Cache] {}", self.caches.request(p_addr, is_write));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> Simulator {
        Simulator::new(ReplacementPolicy::Lru, PageReplacement::Lru)
    }

    #[test]
    fn commands_require_prior_init() {
        let mut s = sim();
        assert_eq!(s.execute("malloc 100"), Signal::Continue);
        assert_eq!(s.execute("read 0"), Signal::Continue);
        assert_eq!(s.linear.statistics().total, 0);
        assert_eq!(s.mmu.statistics().page_faults, 0);
    }

    #[test]
    fn exit_blank_and_unknown_lines() {
        let mut s = sim();
        assert_eq!(s.execute(""), Signal::Continue);
        assert_eq!(s.execute("   "), Signal::Continue);
        assert_eq!(s.execute("bogus 1 2"), Signal::Continue);
        assert_eq!(s.execute("exit"), Signal::Exit);
    }

    #[test]
    fn malloc_free_flow_on_the_linear_allocator() {
        let mut s = sim();
        s.execute("init memory 1024");
        s.execute("malloc 100");
        s.execute("malloc 200");
        assert_eq!(s.linear.address_of(1), Some(0));
        assert_eq!(s.linear.address_of(2), Some(100));
        s.execute("free 1");
        assert_eq!(s.linear.address_of(1), None);
        // First fit lands the next request in the freed hole.
        s.execute("malloc 50");
        assert_eq!(s.linear.address_of(3), Some(0));
    }

    #[test]
    fn switching_allocators_keeps_both_live() {
        let mut s = sim();
        s.execute("init memory 2048");
        s.execute("malloc 10");
        s.execute("set allocator buddy");
        s.execute("malloc 64");
        assert_eq!(s.buddy.address_of(1), Some(0));
        // The linear allocator kept its block across the switch.
        assert_eq!(s.linear.address_of(1), Some(0));
        s.execute("set allocator worst_fit");
        assert_eq!(s.active, ActiveAllocator::Linear);
        assert_eq!(s.strategy, FitStrategy::WorstFit);
        s.execute("set allocator nonsense");
        assert_eq!(s.strategy, FitStrategy::FirstFit);
    }

    #[test]
    fn policy_tokens_are_case_insensitive() {
        let mut s = sim();
        s.execute("init memory 1024");
        assert_eq!(s.execute("set cache_policy fifo"), Signal::Continue);
        assert_eq!(s.execute("set cache_policy LFU"), Signal::Continue);
        assert_eq!(s.execute("set page_policy Clock"), Signal::Continue);
        assert_eq!(s.execute("set page_policy bogus"), Signal::Continue);
    }

    #[test]
    fn read_drives_translation_and_the_caches() {
        let mut s = sim();
        s.execute("init memory 1024");
        s.execute("read 0");
        s.execute("read 0");
        let stats = s.mmu.statistics();
        assert_eq!(stats.page_faults, 1);
        assert_eq!(stats.page_hits, 1);
    }

    #[test]
    fn out_of_range_addresses_are_rejected() {
        let mut s = sim();
        s.execute("init memory 1024");
        s.execute("read 4096");
        s.execute("write 999999");
        let stats = s.mmu.statistics();
        assert_eq!(stats.page_faults, 0);
        assert_eq!(stats.page_hits, 0);
    }

    #[test]
    fn hex_arguments_are_accepted() {
        let mut s = sim();
        s.execute("init memory 0x400");
        assert_eq!(s.linear.statistics().total, 1024);
        s.execute("malloc 0x40");
        assert_eq!(s.linear.address_of(1), Some(0));
    }

    #[test]
    fn invalid_numbers_do_not_initialize() {
        let mut s = sim();
        s.execute("init memory lots");
        assert!(!s.initialized);
        s.execute("init memory 512");
        assert!(s.initialized);
        s.execute("malloc banana");
        assert_eq!(s.linear.statistics().success_rate_pct, 0.0);
    }
}
