//! Static vocabulary shared by every stage: supported utilities, the closed set
//! of argument kinds, and the keyword tables used to classify scraped argument
//! names.
//!
//! The vocabulary is loaded once into a [`Lexicon`] and handed to components
//! through the run context; nothing here is mutable after startup.
use std::collections::BTreeMap;
use std::fmt;

/// Utilities in descending order of real-world usage.
pub const DEFAULT_UTILITIES: &[&str] = &[
    "find", "xargs", "grep", "rm", "echo", "ls", "sort", "chmod", "wc", "cat", "cut", "head",
    "mv", "chown", "cp", "mkdir", "tr", "tail", "dirname", "tar", "uniq", "ln", "split", "tee",
    "date", "pwd", "ssh", "diff", "du", "file", "rename", "md5sum", "comm", "mktemp", "df", "rev",
    "rmdir", "od", "hostname",
];

/// Placeholder for the options block inside a syntax template.
pub const OPTIONS_TOKEN: &str = "[Options]";

/// Closed set of argument placeholder kinds a flag may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgKind {
    /// e.g. `*.txt`
    Pattern,
    /// e.g. `%m:%u:%g:%p\0`
    FormattedString,
    /// e.g. `|`
    Separator,
    Directory,
    File,
    /// Second file operand in the same command.
    File2,
    /// One of b, c, d, p, f, l, s, D.
    FileType,
    FilesystemType,
    /// e.g. `744`
    Permission,
    Mode,
    SmallNumber,
    MediumNumber,
    LargeNumber,
    /// e.g. read, skip, recurse
    Action,
    Command,
}

impl ArgKind {
    /// Every kind, in the order keyword classification visits them.
    pub const ALL: [ArgKind; 15] = [
        ArgKind::Pattern,
        ArgKind::FormattedString,
        ArgKind::Separator,
        ArgKind::Directory,
        ArgKind::File,
        ArgKind::File2,
        ArgKind::FileType,
        ArgKind::FilesystemType,
        ArgKind::Permission,
        ArgKind::Mode,
        ArgKind::SmallNumber,
        ArgKind::MediumNumber,
        ArgKind::LargeNumber,
        ArgKind::Action,
        ArgKind::Command,
    ];

    /// Bracketed placeholder as it appears in templates and catalogs.
    pub fn token(self) -> &'static str {
        match self {
            ArgKind::Pattern => "[Pattern]",
            ArgKind::FormattedString => "[Formatted String]",
            ArgKind::Separator => "[Separator]",
            ArgKind::Directory => "[Directory]",
            ArgKind::File => "[File]",
            ArgKind::File2 => "[File2]",
            ArgKind::FileType => "[File Type]",
            ArgKind::FilesystemType => "[Filesystem Type]",
            ArgKind::Permission => "[Permission]",
            ArgKind::Mode => "[Mode]",
            ArgKind::SmallNumber => "[Small Number]",
            ArgKind::MediumNumber => "[Medium Number]",
            ArgKind::LargeNumber => "[Large Number]",
            ArgKind::Action => "[Action]",
            ArgKind::Command => "[Command]",
        }
    }

    /// Parse a placeholder token; anything outside the closed set is `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.token() == token)
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            ArgKind::Pattern => &["pattern", "patterns", "glob"],
            ArgKind::Separator => &["delim", "sep", "str"],
            ArgKind::FormattedString => &["format", "lfmt", "fmt"],
            ArgKind::Directory => &["directory", "dest", "dir"],
            ArgKind::File => &["file", "file1", "source"],
            ArgKind::File2 => &["file2"],
            ArgKind::FileType => &["c"],
            ArgKind::FilesystemType => &["type"],
            ArgKind::Permission => &["permission"],
            ArgKind::Mode => &["mode"],
            ArgKind::SmallNumber => &[
                "depth", "levels", "level", "n", "num", "max-lines", "max-args", "max-procs",
                "size", "quantity", "pid", "uid", "gid",
            ],
            ArgKind::MediumNumber => &["number"],
            ArgKind::LargeNumber => &["port", "bytes"],
            ArgKind::Action => &["max-chars"],
            ArgKind::Command => &["command"],
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Immutable vocabulary handed to the generator, normalizer and ingester.
#[derive(Debug, Clone)]
pub struct Lexicon {
    utilities: Vec<String>,
    keywords: Vec<(ArgKind, &'static [&'static str])>,
    manual_syntax: BTreeMap<&'static str, &'static str>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(DEFAULT_UTILITIES.iter().map(|name| name.to_string()).collect())
    }
}

impl Lexicon {
    pub fn new(utilities: Vec<String>) -> Self {
        let keywords = ArgKind::ALL
            .into_iter()
            .map(|kind| (kind, kind.keywords()))
            .collect();
        let manual_syntax = BTreeMap::from([
            ("find", "find [Directory] [Options]"),
            ("tar", "tar [Options] [File] [File2]"),
            ("file", "file [Options] [File]"),
            ("hostname", "hostname [Options]"),
        ]);
        Self {
            utilities,
            keywords,
            manual_syntax,
        }
    }

    pub fn utilities(&self) -> &[String] {
        &self.utilities
    }

    pub fn supports(&self, utility: &str) -> bool {
        self.utilities.iter().any(|name| name == utility)
    }

    /// Hand-written template that overrides whatever was scraped for `utility`.
    pub fn manual_syntax(&self, utility: &str) -> Option<&'static str> {
        self.manual_syntax.get(utility).copied()
    }

    /// Classify a raw argument name by case-insensitive keyword containment.
    ///
    /// The longest contained keyword decides, so `PATTERN` is a pattern even
    /// though it also contains the single-letter `n` keyword. Ties go to the
    /// kind listed first.
    pub fn classify(&self, raw: &str) -> Option<ArgKind> {
        let lowered = raw.to_lowercase();
        let mut best: Option<(ArgKind, usize)> = None;
        for (kind, words) in &self.keywords {
            for word in words.iter() {
                if !lowered.contains(word) {
                    continue;
                }
                match best {
                    Some((_, len)) if len >= word.len() => {}
                    _ => best = Some((*kind, word.len())),
                }
            }
        }
        best.map(|(kind, _)| kind)
    }
}
