use super::{utility_frequencies, ScaleOptions, Shortfall, Synthesizer};
use crate::catalog::{CatalogStore, FlagCatalog};
use crate::combine::OptionCombiner;
use crate::lexicon::Lexicon;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn grep_store() -> CatalogStore {
    let mut store = CatalogStore::default();
    store.set_template("grep", "grep [Options] [Pattern] [File]");
    store.set_catalog(
        "grep",
        FlagCatalog::from_pairs([("-n", None), ("-v", None), ("-x", Some("[File]"))]),
    );
    store
}

fn wide_store() -> CatalogStore {
    let mut store = grep_store();
    store.set_template("ls", "ls [Options] [Directory]");
    store.set_catalog(
        "ls",
        FlagCatalog::from_pairs((0..6).map(|i| (format!("-{i}"), None))),
    );
    store.set_template("pwd", "Invalid syntax for utility pwd, pwd");
    store.set_catalog("pwd", FlagCatalog::from_pairs([("-L", None), ("-P", None), ("-Q", None)]));
    store
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[test]
fn fills_the_options_slot_for_each_combination() {
    let store = grep_store();
    let lexicon = Lexicon::default();
    let synth = Synthesizer::new(&store, &lexicon, OptionCombiner::default());
    let commands = synth.generate("grep", None, &mut rng());
    assert_eq!(
        commands,
        [
            "grep -n [Pattern] [File]",
            "grep -n -v [Pattern] [File]",
            "grep -n -v -x [File] [Pattern] [File]",
        ]
    );
}

#[test]
fn invalid_or_missing_templates_yield_nothing() {
    let store = wide_store();
    let lexicon = Lexicon::default();
    let synth = Synthesizer::new(&store, &lexicon, OptionCombiner::default());
    assert!(synth.generate("pwd", None, &mut rng()).is_empty());
    assert!(synth.generate("tar", Some(5), &mut rng()).is_empty());
}

#[test]
fn sampling_returns_distinct_members_of_the_natural_yield() {
    let store = wide_store();
    let lexicon = Lexicon::default();
    let synth = Synthesizer::new(&store, &lexicon, OptionCombiner::default());
    let natural: HashSet<String> = synth.natural_yield("ls").into_iter().collect();
    assert!(natural.len() > 10);

    let sampled = synth.generate("ls", Some(10), &mut rng());
    assert_eq!(sampled.len(), 10);
    let unique: HashSet<&String> = sampled.iter().collect();
    assert_eq!(unique.len(), 10);
    assert!(sampled.iter().all(|command| natural.contains(command)));

    let everything = synth.generate("ls", Some(natural.len() + 5), &mut rng());
    assert_eq!(everything.len(), natural.len());
}

#[test]
fn generate_many_concatenates_in_input_order() {
    let store = wide_store();
    let lexicon = Lexicon::default();
    let synth = Synthesizer::new(&store, &lexicon, OptionCombiner::default());
    let commands = synth.generate_many(&strings(&["grep", "ls"]), None, &mut rng());
    assert_eq!(commands.len(), 3 + synth.natural_yield("ls").len());
    assert!(commands[..3].iter().all(|command| command.starts_with("grep ")));
    assert!(commands[3..].iter().all(|command| command.starts_with("ls ")));
}

#[test]
fn generate_all_follows_lexicon_order_and_skips_gaps() {
    let store = wide_store();
    let lexicon = Lexicon::new(strings(&["ls", "tar", "grep", "pwd"]));
    let synth = Synthesizer::new(&store, &lexicon, OptionCombiner::default());
    let commands = synth.generate_all();
    assert!(commands[0].starts_with("ls "));
    assert!(commands.last().expect("non-empty").starts_with("grep "));
    assert!(!commands.iter().any(|command| command.starts_with("pwd")));
}

#[test]
fn frequencies_rank_by_count_then_first_appearance() {
    let reference = strings(&["ls -a", "grep x", "", "grep -n y", "cat f", "ls", "du -h"]);
    assert_eq!(
        utility_frequencies(&reference),
        [
            ("ls".to_string(), 2),
            ("grep".to_string(), 2),
            ("cat".to_string(), 1),
            ("du".to_string(), 1),
        ]
    );
}

#[test]
fn scaled_generation_reports_shortfalls_and_unsupported() {
    let store = wide_store();
    let lexicon = Lexicon::default();
    let synth = Synthesizer::new(&store, &lexicon, OptionCombiner::default());
    let reference = strings(&["ls -a", "ls -l", "grep -n x f", "awk '{print}'"]);

    let output = synth.generate_scaled(
        &reference,
        ScaleOptions {
            top_n: 20,
            multiplier: Some(4),
        },
        &mut rng(),
    );
    assert_eq!(output.multiplier, Some(4));
    assert_eq!(output.unsupported, ["awk"]);
    assert_eq!(
        output.shortfalls,
        [Shortfall {
            utility: "grep".to_string(),
            requested: 4,
            generated: 3,
        }]
    );
    let ls_count = output
        .commands
        .iter()
        .filter(|command| command.starts_with("ls "))
        .count();
    assert_eq!(ls_count, 8);
    assert_eq!(output.commands.len(), 8 + 3);
}

#[test]
fn scaled_generation_derives_the_multiplier_from_the_top_supported_utility() {
    let store = wide_store();
    let lexicon = Lexicon::default();
    let synth = Synthesizer::new(&store, &lexicon, OptionCombiner::default());
    let reference = strings(&["grep a", "ls -a"]);
    let output = synth.generate_scaled(&reference, ScaleOptions::default(), &mut rng());
    // grep yields three commands for one reference line.
    assert_eq!(output.multiplier, Some(3));
    assert!(output.shortfalls.is_empty());
    assert_eq!(output.commands.len(), 6);
}

#[test]
fn scaled_generation_with_no_supported_utility_is_empty() {
    let store = wide_store();
    let lexicon = Lexicon::default();
    let synth = Synthesizer::new(&store, &lexicon, OptionCombiner::default());
    let output = synth.generate_scaled(&strings(&["awk x"]), ScaleOptions::default(), &mut rng());
    assert!(output.commands.is_empty());
    assert_eq!(output.multiplier, None);
}

#[test]
fn huge_multiplier_saturates_instead_of_overflowing() {
    let store = wide_store();
    let lexicon = Lexicon::default();
    let synth = Synthesizer::new(&store, &lexicon, OptionCombiner::default());
    let output = synth.generate_scaled(
        &strings(&["grep a", "grep b"]),
        ScaleOptions {
            top_n: 20,
            multiplier: Some(usize::MAX),
        },
        &mut rng(),
    );
    assert_eq!(output.commands.len(), 3);
    assert_eq!(
        output.shortfalls,
        [Shortfall {
            utility: "grep".to_string(),
            requested: usize::MAX,
            generated: 3,
        }]
    );
}
