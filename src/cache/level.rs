use clap::ValueEnum;
use std::fmt;

/// Victim-selection policy within a set.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
pub enum ReplacementPolicy {
    Lru,
    Fifo,
    Lfu,
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReplacementPolicy::Lru => "LRU",
            ReplacementPolicy::Fifo => "FIFO",
            ReplacementPolicy::Lfu => "LFU",
        })
    }
}

/// Line metadata. No payload is modeled.
#[derive(Clone, Copy, Default, Debug)]
struct CacheLine {
    valid: bool,
    dirty: bool,
    tag: u64,
    last_access: u64,
    inserted_at: u64,
    freq: u64,
}

/// A valid line displaced by [`CacheLevel::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvictedLine {
    /// Block-aligned address reconstructed from the victim's tag and set.
    pub addr: u64,
    pub dirty: bool,
}

/// Hit/miss counters for one level.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheLevelStats {
    pub hits: u64,
    pub misses: u64,
    pub accesses: u64,
}

impl CacheLevelStats {
    pub fn hit_rate_pct(&self) -> f64 {
        if self.accesses > 0 {
            self.hits as f64 / self.accesses as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// One set-associative cache level.
///
/// `access` and `insert` are deliberately separate steps: a lookup miss
/// returns to the hierarchy first, so that fills and writeback cascades
/// happen in the order the protocol requires.
pub struct CacheLevel {
    level: usize,
    block_size: u64,
    num_sets: u64,
    offset_bits: u32,
    index_bits: u32,
    policy: ReplacementPolicy,
    sets: Vec<Vec<CacheLine>>,
    hits: u64,
    misses: u64,
    access_counter: u64,
}

impl CacheLevel {
    pub fn new(
        level: usize,
        size: u64,
        block_size: u64,
        associativity: usize,
        policy: ReplacementPolicy,
    ) -> Self {
        assert!(
            size > 0 && block_size > 0 && associativity > 0,
            "cache parameters must be nonzero"
        );
        assert!(block_size.is_power_of_two(), "block size must be a power of two");
        let num_sets = size / (block_size * associativity as u64);
        assert!(
            num_sets > 0 && num_sets.is_power_of_two(),
            "set count must be a power of two"
        );
        CacheLevel {
            level,
            block_size,
            num_sets,
            offset_bits: block_size.trailing_zeros(),
            index_bits: num_sets.trailing_zeros(),
            policy,
            sets: vec![vec![CacheLine::default(); associativity]; num_sets as usize],
            hits: 0,
            misses: 0,
            access_counter: 0,
        }
    }

    fn locate(&self, addr: u64) -> (usize, u64) {
        let index = (addr >> self.offset_bits) % self.num_sets;
        let tag = addr >> (self.offset_bits + self.index_bits);
        (index as usize, tag)
    }

    /// Looks up `addr`, refreshing recency and frequency on a hit. A write
    /// hit marks the line dirty. Misses do not allocate; see [`Self::insert`].
    pub fn access(&mut self, addr: u64, is_write: bool) -> bool {
        self.access_counter += 1;
        let (index, tag) = self.locate(addr);
        for line in &mut self.sets[index] {
            if line.valid && line.tag == tag {
                self.hits += 1;
                line.last_access = self.access_counter;
                line.freq += 1;
                if is_write {
                    line.dirty = true;
                }
                return true;
            }
        }
        self.misses += 1;
        false
    }

    /// Installs a line for `addr`, evicting if the set is full. The victim
    /// is the first invalid way, else the way minimizing the policy key
    /// (recency, insertion age, or frequency), lowest way on ties.
    pub fn insert(&mut self, addr: u64, is_write: bool) -> Option<EvictedLine> {
        let (index, tag) = self.locate(addr);
        let policy = self.policy;

        let mut victim = 0;
        let mut min_key = u64::MAX;
        for (way, line) in self.sets[index].iter().enumerate() {
            if !line.valid {
                victim = way;
                break;
            }
            let key = match policy {
                ReplacementPolicy::Lru => line.last_access,
                ReplacementPolicy::Fifo => line.inserted_at,
                ReplacementPolicy::Lfu => line.freq,
            };
            if key < min_key {
                min_key = key;
                victim = way;
            }
        }

        let old = self.sets[index][victim];
        let evicted = old.valid.then(|| EvictedLine {
            addr: (old.tag << (self.offset_bits + self.index_bits))
                | ((index as u64) << self.offset_bits),
            dirty: old.dirty,
        });

        self.sets[index][victim] = CacheLine {
            valid: true,
            dirty: is_write,
            tag,
            last_access: self.access_counter,
            inserted_at: self.access_counter,
            freq: 1,
        };
        evicted
    }

    /// Drops the line holding `addr`, returning its dirty bit. Returns
    /// false when the line is absent.
    pub fn invalidate(&mut self, addr: u64) -> bool {
        let (index, tag) = self.locate(addr);
        for line in &mut self.sets[index] {
            if line.valid && line.tag == tag {
                line.valid = false;
                return line.dirty;
            }
        }
        false
    }

    /// Invalidates every block-aligned address in `[start, start + len)`.
    pub fn invalidate_range(&mut self, start: u64, len: u64) {
        let mut addr = start;
        while addr < start + len {
            self.invalidate(addr);
            addr += self.block_size;
        }
    }

    /// Applies to subsequent victim selection only; timestamps are untouched.
    pub fn set_policy(&mut self, policy: ReplacementPolicy) {
        self.policy = policy;
    }

    pub fn stats(&self) -> CacheLevelStats {
        CacheLevelStats {
            hits: self.hits,
            misses: self.misses,
            accesses: self.access_counter,
        }
    }

    pub fn print_stats(&self) {
        let stats = self.stats();
        println!(
            "L{} Stats: Hits={:<5} | Misses={:<5} | Hit Rate={:>6.2}%",
            self.level,
            stats.hits,
            stats.misses,
            stats.hit_rate_pct()
        );
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, addr: u64) -> bool {
        let (index, tag) = self.locate(addr);
        self.sets[index].iter().any(|line| line.valid && line.tag == tag)
    }
}
