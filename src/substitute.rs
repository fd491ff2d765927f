//! Placeholder substitution between templated and executable command text.
//!
//! Two strategies share one replacement map:
//! - [`Strategy::Token`] replaces every occurrence of a key anywhere in the
//!   command, which is how `[File]` becomes `temp.txt`.
//! - [`Strategy::Word`] splits on single spaces and replaces a word only when
//!   it equals a key, so `/abc` is not rewritten inside `/abcdef`.
//!
//! Substitution is textual only. Nothing is quoted or escaped.
use crate::persist::read_json;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Strategy {
    #[default]
    Token,
    Word,
}

/// Ordered placeholder-to-literal pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementMap {
    pairs: Vec<(String, String)>,
}

impl ReplacementMap {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Load a JSON object of string to string, keeping document order.
    pub fn load(path: &Path) -> Result<Self> {
        let object: Map<String, Value> =
            read_json(path).with_context(|| format!("load replacements {}", path.display()))?;
        let mut pairs = Vec::with_capacity(object.len());
        for (key, value) in object {
            let Value::String(value) = value else {
                anyhow::bail!("replacement for {key} must be a string");
            };
            pairs.push((key, value));
        }
        Ok(Self::new(pairs))
    }

    /// Swap keys and values.
    pub fn inverted(&self) -> Self {
        Self {
            pairs: self
                .pairs
                .iter()
                .map(|(key, value)| (value.clone(), key.clone()))
                .collect(),
        }
    }
}

pub fn substitute(
    commands: &[String],
    map: &ReplacementMap,
    strategy: Strategy,
    reverse: bool,
) -> Vec<String> {
    let inverted;
    let map = if reverse {
        inverted = map.inverted();
        &inverted
    } else {
        map
    };
    match strategy {
        Strategy::Token => commands
            .iter()
            .map(|command| replace_tokens(command, map))
            .collect(),
        Strategy::Word => {
            // Later pairs win, as with a JSON object that repeats a key.
            let lookup: HashMap<&str, &str> = map
                .pairs
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .collect();
            commands
                .iter()
                .map(|command| replace_words(command, &lookup))
                .collect()
        }
    }
}

fn replace_tokens(command: &str, map: &ReplacementMap) -> String {
    let mut out = command.to_string();
    for (key, value) in &map.pairs {
        if !key.is_empty() {
            out = out.replace(key.as_str(), value);
        }
    }
    out
}

fn replace_words(command: &str, lookup: &HashMap<&str, &str>) -> String {
    command
        .split(' ')
        .map(|word| lookup.get(word).copied().unwrap_or(word))
        .collect::<Vec<_>>()
        .join(" ")
}
