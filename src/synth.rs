//! Command synthesis: syntax templates crossed with option combinations.
use crate::catalog::CatalogStore;
use crate::combine::OptionCombiner;
use crate::lexicon::Lexicon;
use rand::Rng;
use std::collections::HashMap;

pub const DEFAULT_TOP_N: usize = 20;

/// Knobs for frequency-matched generation.
#[derive(Debug, Clone, Copy)]
pub struct ScaleOptions {
    /// How many of the most frequent reference utilities to cover.
    pub top_n: usize,
    /// Commands per reference occurrence; derived from the data when unset.
    pub multiplier: Option<usize>,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            multiplier: None,
        }
    }
}

/// A utility whose natural yield fell short of the requested volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    pub utility: String,
    pub requested: usize,
    pub generated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScaledOutput {
    pub commands: Vec<String>,
    pub multiplier: Option<usize>,
    pub shortfalls: Vec<Shortfall>,
    /// Reference utilities with no template or catalog.
    pub unsupported: Vec<String>,
}

pub struct Synthesizer<'a> {
    store: &'a CatalogStore,
    lexicon: &'a Lexicon,
    combiner: OptionCombiner,
}

impl<'a> Synthesizer<'a> {
    pub fn new(store: &'a CatalogStore, lexicon: &'a Lexicon, combiner: OptionCombiner) -> Self {
        Self {
            store,
            lexicon,
            combiner,
        }
    }

    /// Every command the utility can yield. Missing or invalid templates
    /// produce nothing.
    pub fn natural_yield(&self, utility: &str) -> Vec<String> {
        let (Some(template), Some(catalog)) =
            (self.store.template(utility), self.store.catalog(utility))
        else {
            tracing::debug!(utility, "no template or catalog");
            return Vec::new();
        };
        if !template.is_valid() {
            tracing::debug!(utility, template = template.text(), "invalid template");
            return Vec::new();
        }
        self.combiner
            .combine(catalog)
            .iter()
            .filter_map(|options| template.fill(options))
            .collect()
    }

    /// Commands for one utility, sampled down to `max_commands` when that is
    /// below the natural yield.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        utility: &str,
        max_commands: Option<usize>,
        rng: &mut R,
    ) -> Vec<String> {
        sample(self.natural_yield(utility), max_commands, rng)
    }

    /// Concatenated natural yields in input order, then sampled as a whole.
    pub fn generate_many<R: Rng + ?Sized>(
        &self,
        utilities: &[String],
        max_commands: Option<usize>,
        rng: &mut R,
    ) -> Vec<String> {
        let combined = utilities
            .iter()
            .flat_map(|utility| self.natural_yield(utility))
            .collect();
        sample(combined, max_commands, rng)
    }

    /// Full yield for every lexicon utility that has both a template and a
    /// catalog. Missing entries are reported and skipped.
    pub fn generate_all(&self) -> Vec<String> {
        let mut out = Vec::new();
        for utility in self.lexicon.utilities() {
            if self.store.template(utility).is_none() {
                tracing::warn!(utility = %utility, "no syntax template, skipping");
                continue;
            }
            if self.store.catalog(utility).is_none() {
                tracing::warn!(utility = %utility, "no flag catalog, skipping");
                continue;
            }
            let commands = self.natural_yield(utility);
            tracing::debug!(utility = %utility, count = commands.len(), "generated");
            out.extend(commands);
        }
        out
    }

    /// Match the utility distribution of a reference corpus.
    pub fn generate_scaled<R: Rng + ?Sized>(
        &self,
        reference: &[String],
        options: ScaleOptions,
        rng: &mut R,
    ) -> ScaledOutput {
        let top: Vec<(String, usize)> = utility_frequencies(reference)
            .into_iter()
            .take(options.top_n)
            .collect();

        let multiplier = options.multiplier.or_else(|| self.derive_multiplier(&top));
        let Some(multiplier) = multiplier.filter(|value| *value > 0) else {
            tracing::warn!("reference utilities are not supported by the generator");
            return ScaledOutput::default();
        };

        let mut output = ScaledOutput {
            multiplier: Some(multiplier),
            ..ScaledOutput::default()
        };
        for (utility, count) in top {
            if !self.store.has_utility(&utility) {
                tracing::warn!(utility = %utility, "no support for utility, not included");
                output.unsupported.push(utility);
                continue;
            }
            let requested = count.saturating_mul(multiplier);
            let commands = self.generate(&utility, Some(requested), rng);
            if commands.len() < requested {
                tracing::warn!(
                    utility = %utility,
                    generated = commands.len(),
                    requested,
                    "unable to generate enough commands"
                );
                output.shortfalls.push(Shortfall {
                    utility,
                    requested,
                    generated: commands.len(),
                });
            } else {
                tracing::info!(utility = %utility, generated = commands.len(), "generated");
            }
            output.commands.extend(commands);
        }
        output
    }

    /// The first supported utility among the most frequent sets the scale:
    /// natural yield divided by its reference count.
    fn derive_multiplier(&self, top: &[(String, usize)]) -> Option<usize> {
        let (utility, count) = top.iter().find(|(utility, _)| {
            self.lexicon.supports(utility) && self.store.has_utility(utility)
        })?;
        let multiplier = self.natural_yield(utility).len() / count;
        tracing::info!(utility = %utility, multiplier, "derived scale multiplier");
        Some(multiplier)
    }
}

/// Utility name (first whitespace token) counts, most frequent first. Ties
/// keep first-appearance order.
pub fn utility_frequencies(commands: &[String]) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for command in commands {
        let Some(utility) = command.split_whitespace().next() else {
            continue;
        };
        let count = counts.entry(utility).or_insert(0);
        if *count == 0 {
            order.push(utility.to_string());
        }
        *count += 1;
    }
    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|utility| {
            let count = counts[utility.as_str()];
            (utility, count)
        })
        .collect();
    ranked.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    ranked
}

fn sample<R: Rng + ?Sized>(items: Vec<String>, max: Option<usize>, rng: &mut R) -> Vec<String> {
    match max {
        Some(max) if max < items.len() => rand::seq::index::sample(rng, items.len(), max)
            .into_iter()
            .map(|index| items[index].clone())
            .collect(),
        _ => items,
    }
}

#[cfg(test)]
#[path = "synth_tests.rs"]
mod tests;
