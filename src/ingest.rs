//! Turn a plain-text man page into a syntax template and a flag catalog.
//!
//! This is the offline half of documentation scraping: given `man grep | col -b`
//! style text, find the synopsis and the option table and express both in the
//! placeholder vocabulary the generator understands.
use crate::catalog::FlagCatalog;
use crate::lexicon::{Lexicon, OPTIONS_TOKEN};
use regex::Regex;
use std::sync::OnceLock;

/// Template text and flags recovered for one utility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedUtility {
    pub utility: String,
    pub template: String,
    pub catalog: FlagCatalog,
}

pub fn ingest_manpage(utility: &str, text: &str, lexicon: &Lexicon) -> IngestedUtility {
    let template = match lexicon.manual_syntax(utility) {
        Some(manual) => manual.to_string(),
        None => match synopsis_line(utility, text) {
            Some(synopsis) => template_from_synopsis(utility, synopsis, lexicon),
            None => format!("Invalid syntax for utility {utility}, no synopsis found"),
        },
    };

    let mut pairs: Vec<(String, Option<String>)> = Vec::new();
    for line in text.lines().filter(|line| looks_like_option_row(line)) {
        let Some((flag, raw)) = parse_flag_line(line) else {
            continue;
        };
        if pairs.iter().any(|(seen, _)| *seen == flag) {
            continue;
        }
        let argument = raw.map(|raw| match lexicon.classify(&raw) {
            Some(kind) => kind.token().to_string(),
            None => raw,
        });
        pairs.push((flag, argument));
    }
    let catalog = FlagCatalog::from_pairs(pairs);

    tracing::debug!(
        utility,
        template = %template,
        flags = catalog.flags().len(),
        "ingested man page"
    );
    IngestedUtility {
        utility: utility.to_string(),
        template,
        catalog,
    }
}

/// First non-empty line under a `SYNOPSIS` header, else the first line that
/// starts with the utility name.
fn synopsis_line<'t>(utility: &str, text: &'t str) -> Option<&'t str> {
    let mut lines = text.lines();
    if lines.any(|line| line.trim() == "SYNOPSIS") {
        if let Some(line) = lines.find(|line| !line.trim().is_empty()) {
            return Some(line.trim());
        }
    }
    text.lines()
        .map(str::trim)
        .find(|line| line.split_whitespace().next() == Some(utility))
}

/// Normalize a synopsis into template form: the utility name, one
/// `[Options]` slot, and argument placeholders for operands the lexicon can
/// classify. A synopsis that never mentions options is marked invalid.
pub fn template_from_synopsis(utility: &str, synopsis: &str, lexicon: &Lexicon) -> String {
    if !synopsis.to_lowercase().contains("option") {
        return format!("Invalid syntax for utility {utility}, {synopsis}");
    }
    let cleaned: String = synopsis
        .chars()
        .filter(|ch| !matches!(ch, ',' | '.' | '(' | ')' | '[' | ']'))
        .collect();
    let cleaned = cleaned.to_lowercase();

    let mut words: Vec<String> = Vec::new();
    let mut has_options = false;
    for word in cleaned.split_whitespace() {
        if word == utility {
            words.push(word.to_string());
        } else if word.contains("option") {
            if !has_options {
                words.push(OPTIONS_TOKEN.to_string());
                has_options = true;
            }
        } else if !word.starts_with('-') {
            if let Some(kind) = lexicon.classify(word) {
                words.push(kind.token().to_string());
            }
        }
    }
    words.join(" ")
}

fn looks_like_option_row(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('-') && !trimmed.starts_with("---")
}

/// Split an option row into its flag and raw argument name.
///
/// Only the option column is considered (text before the first run of two
/// spaces). The argument comes from `[...]`, then `=VALUE`, then a trailing
/// upper-case metavariable such as `-m NUM`.
pub fn parse_flag_line(line: &str) -> Option<(String, Option<String>)> {
    let spec = option_column(line.trim());
    let flag = flag_token()
        .find(spec)
        .map(|found| found.as_str().to_string())?;
    if flag == "-" || flag == "--" {
        return None;
    }

    let argument = if let Some(captures) = bracket_argument().captures(spec) {
        Some(captures[1].replace('=', ""))
    } else if let Some((_, rest)) = spec.split_once('=') {
        rest.split(|ch: char| ch.is_whitespace() || ch == ',')
            .next()
            .map(str::to_string)
    } else {
        spec.split_whitespace()
            .nth(1)
            .map(|word| word.trim_end_matches(','))
            .filter(|word| metavar().is_match(word))
            .map(str::to_string)
    };
    let argument = argument.map(|arg| arg.trim().to_string()).filter(|arg| !arg.is_empty());
    Some((flag, argument))
}

fn option_column(line: &str) -> &str {
    line.find("  ").map_or(line, |end| &line[..end])
}

fn flag_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-[^\s\[\].,()=]*").expect("regex for flag tokens"))
}

fn bracket_argument() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\]]*)\]").expect("regex for bracketed arguments"))
}

fn metavar() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_-]*$").expect("regex for metavariables"))
}
