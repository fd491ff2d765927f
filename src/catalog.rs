//! Flag catalogs and syntax templates, keyed by utility.
//!
//! Both stores are JSON objects produced by the scraper. Catalog flag order is
//! taken from the JSON document so combination output is reproducible for a
//! given input file.
use crate::lexicon::{ArgKind, Lexicon, OPTIONS_TOKEN};
use crate::persist::{read_json, write_json};
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Argument requirement for a single flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentSpec {
    NoArgument,
    Kind(ArgKind),
    /// A scraped argument name outside the known kind set. Kept for
    /// diagnostics, never combined.
    Unrecognized(String),
}

impl ArgumentSpec {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => ArgumentSpec::NoArgument,
            Some(raw) if raw.is_empty() => ArgumentSpec::NoArgument,
            Some(raw) => ArgKind::from_token(raw)
                .map(ArgumentSpec::Kind)
                .unwrap_or_else(|| ArgumentSpec::Unrecognized(raw.to_string())),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, ArgumentSpec::Unrecognized(_))
    }

    fn to_json(&self) -> Value {
        match self {
            ArgumentSpec::NoArgument => Value::Null,
            ArgumentSpec::Kind(kind) => Value::String(kind.token().to_string()),
            ArgumentSpec::Unrecognized(raw) => Value::String(raw.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub token: String,
    pub argument: ArgumentSpec,
}

impl Flag {
    /// Render as a command-line fragment: `-n` or `-x [File]`.
    pub fn render(&self) -> String {
        match &self.argument {
            ArgumentSpec::NoArgument => self.token.clone(),
            ArgumentSpec::Kind(kind) => format!("{} {}", self.token, kind.token()),
            ArgumentSpec::Unrecognized(raw) => format!("{} {}", self.token, raw),
        }
    }
}

/// Ordered flag table for one utility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagCatalog {
    flags: Vec<Flag>,
}

impl FlagCatalog {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<S>)>,
        S: AsRef<str>,
    {
        let mut catalog = FlagCatalog::default();
        for (token, raw) in pairs {
            let raw = raw.as_ref().map(|raw| raw.as_ref());
            catalog.insert(token.as_ref(), ArgumentSpec::parse(raw));
        }
        catalog
    }

    fn from_json(utility: &str, value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("catalog entry for {utility} must be an object"))?;
        let mut catalog = FlagCatalog::default();
        for (token, raw) in object {
            let argument = match raw {
                Value::Null => ArgumentSpec::NoArgument,
                Value::String(raw) => ArgumentSpec::parse(Some(raw.as_str())),
                other => {
                    return Err(anyhow!(
                        "flag {token} of {utility} has non-string argument {other}"
                    ))
                }
            };
            catalog.insert(token, argument);
        }
        Ok(catalog)
    }

    fn to_json(&self) -> Value {
        let mut object = Map::new();
        for flag in &self.flags {
            object.insert(flag.token.clone(), flag.argument.to_json());
        }
        Value::Object(object)
    }

    /// Insert or replace a flag; replacement keeps the original position.
    pub fn insert(&mut self, token: &str, argument: ArgumentSpec) {
        match self.flags.iter_mut().find(|flag| flag.token == token) {
            Some(flag) => flag.argument = argument,
            None => self.flags.push(Flag {
                token: token.to_string(),
                argument,
            }),
        }
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }
}

/// Command skeleton with one options slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTemplate {
    text: String,
    valid: bool,
}

impl SyntaxTemplate {
    /// A template is usable only when it carries exactly one options token and
    /// is not a scraper failure marker.
    pub fn new(text: &str) -> Self {
        let valid = !text.contains("Invalid") && text.matches(OPTIONS_TOKEN).count() == 1;
        Self {
            text: text.to_string(),
            valid,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Fill the options slot. Invalid templates never produce a command.
    pub fn fill(&self, options: &str) -> Option<String> {
        self.valid.then(|| self.text.replacen(OPTIONS_TOKEN, options, 1))
    }
}

/// One flag whose argument kind is outside the known set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonConformingFlag {
    pub utility: String,
    pub flag: String,
    pub kind: String,
}

impl std::fmt::Display for NonConformingFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.utility, self.flag, self.kind)
    }
}

/// Syntax templates plus flag catalogs for every scraped utility.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    templates: BTreeMap<String, SyntaxTemplate>,
    catalogs: Vec<(String, FlagCatalog)>,
}

impl CatalogStore {
    /// Load `syntax.json` and `utility_map.json` style stores.
    pub fn load(syntax_path: &Path, catalog_path: &Path) -> Result<Self> {
        let mut store = CatalogStore::default();
        store.read_templates(syntax_path)?;
        store.read_catalogs(catalog_path)?;
        tracing::debug!(
            templates = store.templates.len(),
            catalogs = store.catalogs.len(),
            "catalog store loaded"
        );
        Ok(store)
    }

    /// Like [`CatalogStore::load`], but a missing file starts that half empty.
    pub fn load_or_default(syntax_path: &Path, catalog_path: &Path) -> Result<Self> {
        let mut store = CatalogStore::default();
        if syntax_path.exists() {
            store.read_templates(syntax_path)?;
        }
        if catalog_path.exists() {
            store.read_catalogs(catalog_path)?;
        }
        Ok(store)
    }

    fn read_templates(&mut self, path: &Path) -> Result<()> {
        let syntax: BTreeMap<String, String> = read_json(path)
            .with_context(|| format!("load syntax templates {}", path.display()))?;
        for (utility, text) in syntax {
            self.set_template(&utility, &text);
        }
        Ok(())
    }

    fn read_catalogs(&mut self, path: &Path) -> Result<()> {
        let catalogs: Map<String, Value> = read_json(path)
            .with_context(|| format!("load flag catalog {}", path.display()))?;
        for (utility, value) in &catalogs {
            self.set_catalog(utility, FlagCatalog::from_json(utility, value)?);
        }
        Ok(())
    }

    pub fn save_templates(&self, path: &Path) -> Result<()> {
        let templates: BTreeMap<&str, &str> = self
            .templates
            .iter()
            .map(|(utility, template)| (utility.as_str(), template.text()))
            .collect();
        write_json(path, &templates)
    }

    pub fn save_catalogs(&self, path: &Path) -> Result<()> {
        let mut object = Map::new();
        for (utility, catalog) in &self.catalogs {
            object.insert(utility.clone(), catalog.to_json());
        }
        write_json(path, &Value::Object(object))
    }

    pub fn set_template(&mut self, utility: &str, text: &str) {
        self.templates
            .insert(utility.to_string(), SyntaxTemplate::new(text));
    }

    pub fn set_catalog(&mut self, utility: &str, catalog: FlagCatalog) {
        match self.catalogs.iter_mut().find(|(name, _)| name == utility) {
            Some((_, existing)) => *existing = catalog,
            None => self.catalogs.push((utility.to_string(), catalog)),
        }
    }

    pub fn template(&self, utility: &str) -> Option<&SyntaxTemplate> {
        self.templates.get(utility)
    }

    pub fn catalog(&self, utility: &str) -> Option<&FlagCatalog> {
        self.catalogs
            .iter()
            .find(|(name, _)| name == utility)
            .map(|(_, catalog)| catalog)
    }

    pub fn has_utility(&self, utility: &str) -> bool {
        self.template(utility).is_some() && self.catalog(utility).is_some()
    }

    /// Lexicon utilities that have both a template and a catalog, in lexicon order.
    pub fn registered_utilities(&self, lexicon: &Lexicon) -> Vec<String> {
        lexicon
            .utilities()
            .iter()
            .filter(|utility| self.has_utility(utility))
            .cloned()
            .collect()
    }

    /// Flags whose argument kind is unknown, in catalog order.
    pub fn non_conforming_flags(&self) -> Vec<NonConformingFlag> {
        let mut out = Vec::new();
        for (utility, catalog) in &self.catalogs {
            for flag in catalog.flags() {
                if let ArgumentSpec::Unrecognized(raw) = &flag.argument {
                    out.push(NonConformingFlag {
                        utility: utility.clone(),
                        flag: flag.token.clone(),
                        kind: raw.clone(),
                    });
                }
            }
        }
        out
    }

    /// Rewrite raw argument names to known kinds where the lexicon recognizes
    /// them. Returns how many flags changed.
    pub fn normalize_kinds(&mut self, lexicon: &Lexicon) -> usize {
        let mut changed = 0;
        for (_, catalog) in &mut self.catalogs {
            for flag in &mut catalog.flags {
                if let ArgumentSpec::Unrecognized(raw) = &flag.argument {
                    if let Some(kind) = lexicon.classify(raw) {
                        flag.argument = ArgumentSpec::Kind(kind);
                        changed += 1;
                    }
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn template_without_options_slot_is_invalid() {
        assert!(SyntaxTemplate::new("grep [Options] [Pattern] [File]").is_valid());
        assert!(!SyntaxTemplate::new("pwd").is_valid());
        assert!(!SyntaxTemplate::new("Invalid syntax for utility ls, ls [Options]").is_valid());
        assert!(!SyntaxTemplate::new("x [Options] [Options]").is_valid());
        assert_eq!(SyntaxTemplate::new("pwd").fill("-L"), None);
    }

    #[test]
    fn unknown_kinds_are_kept_but_flagged() {
        let catalog = FlagCatalog::from_pairs([
            ("-n", None),
            ("-x", Some("[File]")),
            ("--color", Some("WHEN")),
        ]);
        assert_eq!(catalog.flags().len(), 3);
        assert!(catalog.flags()[0].argument.is_valid());
        assert_eq!(catalog.flags()[1].render(), "-x [File]");
        assert_eq!(
            catalog.flags()[2].argument,
            ArgumentSpec::Unrecognized("WHEN".to_string())
        );
    }

    #[test]
    fn load_preserves_flag_order_and_reports_non_conforming() {
        let dir = tempfile::tempdir().expect("tempdir");
        let syntax = dir.path().join("syntax.json");
        let map = dir.path().join("utility_map.json");
        fs::write(&syntax, r#"{"ls": "ls [Options] [File]"}"#).expect("write syntax");
        fs::write(
            &map,
            r#"{"ls": {"-z": null, "-a": null, "--block-size": "SIZE", "-I": "[Pattern]"}}"#,
        )
        .expect("write map");

        let mut store = CatalogStore::load(&syntax, &map).expect("load");
        let tokens: Vec<&str> = store
            .catalog("ls")
            .expect("ls catalog")
            .flags()
            .iter()
            .map(|flag| flag.token.as_str())
            .collect();
        assert_eq!(tokens, ["-z", "-a", "--block-size", "-I"]);

        let report: Vec<String> = store
            .non_conforming_flags()
            .iter()
            .map(|flag| flag.to_string())
            .collect();
        assert_eq!(report, ["ls:--block-size:SIZE"]);

        assert_eq!(store.normalize_kinds(&Lexicon::default()), 1);
        assert!(store.non_conforming_flags().is_empty());

        store.save_catalogs(&map).expect("save");
        let saved = fs::read_to_string(&map).expect("read saved");
        assert!(saved.contains("\"--block-size\": \"[Small Number]\""));
        assert!(saved.find("-z").expect("z") < saved.find("-a").expect("a"));
    }

    #[test]
    fn missing_store_files_start_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let syntax = dir.path().join("syntax.json");
        fs::write(&syntax, r#"{"wc": "wc [Options] [File]"}"#).expect("write syntax");
        let store = CatalogStore::load_or_default(&syntax, &dir.path().join("absent.json"))
            .expect("load");
        assert!(store.template("wc").is_some());
        assert!(store.catalog("wc").is_none());
        assert!(CatalogStore::load(&syntax, &dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn registered_utilities_need_both_stores() {
        let mut store = CatalogStore::default();
        store.set_template("grep", "grep [Options] [Pattern]");
        store.set_template("ls", "ls [Options]");
        store.set_catalog("grep", FlagCatalog::from_pairs([("-n", None::<&str>)]));
        let lexicon = Lexicon::default();
        assert_eq!(store.registered_utilities(&lexicon), ["grep"]);
    }
}
