//! Flag-subset enumeration for a single utility.
//!
//! Rather than the full power set, the combiner walks every strictly
//! increasing index window of `max_arity` flags. When each flag in the window
//! is usable, every prefix of the window (sizes 1 through `max_arity`) becomes
//! an option block. With the default arity of 3 this is `O(n^3)` and emits
//! exactly `3 * C(n, 3)` fragments before deduplication.
use crate::catalog::{Flag, FlagCatalog};
use std::collections::HashSet;

pub const DEFAULT_MAX_ARITY: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct OptionCombiner {
    max_arity: usize,
}

impl Default for OptionCombiner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ARITY)
    }
}

impl OptionCombiner {
    /// Arity is clamped to at least one flag per window.
    pub fn new(max_arity: usize) -> Self {
        Self {
            max_arity: max_arity.max(1),
        }
    }

    /// Distinct option blocks, in first-emitted order.
    pub fn combine(&self, catalog: &FlagCatalog) -> Vec<String> {
        let mut seen = HashSet::new();
        self.emissions(catalog)
            .into_iter()
            .filter(|fragment| seen.insert(fragment.clone()))
            .collect()
    }

    /// Every fragment the windows produce, duplicates included.
    fn emissions(&self, catalog: &FlagCatalog) -> Vec<String> {
        let flags = catalog.flags();
        let arity = self.max_arity;
        let mut out = Vec::new();
        if flags.len() < arity {
            return out;
        }

        let mut window: Vec<usize> = (0..arity).collect();
        loop {
            let picked: Vec<&Flag> = window.iter().map(|&index| &flags[index]).collect();
            if picked.iter().all(|flag| flag.argument.is_valid()) {
                let rendered: Vec<String> = picked.iter().map(|flag| flag.render()).collect();
                for len in 1..=arity {
                    out.push(rendered[..len].join(" "));
                }
            }
            if !advance(&mut window, flags.len()) {
                break;
            }
        }
        out
    }
}

/// Step to the next lexicographic k-combination of `0..n`.
fn advance(window: &mut [usize], n: usize) -> bool {
    let k = window.len();
    let mut slot = k;
    while slot > 0 {
        slot -= 1;
        if window[slot] < n - k + slot {
            window[slot] += 1;
            let mut value = window[slot];
            for entry in &mut window[slot + 1..] {
                value += 1;
                *entry = value;
            }
            return true;
        }
    }
    false
}
