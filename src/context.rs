//! Immutable run context: resolved config plus the lexicon built from it.
//!
//! Built once in `main` and passed by reference to each command, so no stage
//! reads vocabulary or settings from global state.
use crate::combine::OptionCombiner;
use crate::config::{resolve_config, Config};
use crate::exec::BoundedExecutor;
use crate::lexicon::Lexicon;
use anyhow::{Context as _, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub lexicon: Lexicon,
}

impl Context {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = resolve_config(config_path)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        let lexicon = if config.utilities.is_empty() {
            Lexicon::default()
        } else {
            Lexicon::new(config.utilities.clone())
        };
        Self { config, lexicon }
    }

    pub fn combiner(&self, max_arity: Option<usize>) -> OptionCombiner {
        OptionCombiner::new(max_arity.unwrap_or(self.config.generation.max_arity))
    }

    /// Seeded when a seed is given on the command line or in config.
    pub fn rng(&self, seed: Option<u64>) -> StdRng {
        match seed.or(self.config.generation.seed) {
            Some(seed) => {
                tracing::debug!(seed, "seeded sampling");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        }
    }

    /// Executor for the configured shell, which must resolve on `PATH` or as
    /// an absolute path.
    pub fn executor(&self) -> Result<BoundedExecutor> {
        let shell = which::which(&self.config.shell)
            .with_context(|| format!("locate shell {}", self.config.shell))?;
        tracing::debug!(shell = %shell.display(), "using shell");
        Ok(BoundedExecutor::new(&shell.to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn empty_utility_list_falls_back_to_defaults() {
        let config = Config {
            utilities: Vec::new(),
            ..Config::default()
        };
        let context = Context::from_config(config);
        assert!(context.lexicon.supports("grep"));

        let config = Config {
            utilities: vec!["wc".to_string()],
            ..Config::default()
        };
        let context = Context::from_config(config);
        assert!(context.lexicon.supports("wc"));
        assert!(!context.lexicon.supports("grep"));
    }

    #[test]
    fn command_line_seed_beats_config_seed() {
        let mut config = Config::default();
        config.generation.seed = Some(1);
        let context = Context::from_config(config);
        let from_config: u64 = context.rng(None).gen();
        let same: u64 = StdRng::seed_from_u64(1).gen();
        let overridden: u64 = context.rng(Some(2)).gen();
        assert_eq!(from_config, same);
        assert_eq!(overridden, StdRng::seed_from_u64(2).gen::<u64>());
    }

    #[test]
    fn missing_shell_is_an_error() {
        let config = Config {
            shell: "/nonexistent/cmdsynth-shell".to_string(),
            ..Config::default()
        };
        assert!(Context::from_config(config).executor().is_err());
        assert!(Context::from_config(Config::default()).executor().is_ok());
    }
}
