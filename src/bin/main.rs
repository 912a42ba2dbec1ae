use crossterm::style::Stylize;
use std::io::{stdin, stdout, Write};
use steno_core::config::DictionaryConfig;
use steno_core::core::collection::SearchResult;
use steno_core::core::stroke::sort_steno_strokes;
use steno_core::core::system;
use steno_core::{logging, DictionaryCollection, EngineConfig, FormatRegistry, StenoKey};

const DEFAULT_DICTIONARY: &str = "user.json";
const SEARCH_LIMIT: usize = 10;

fn main() {
    logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{} {}", "[ERROR]".red(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig {
            dictionaries: vec![DictionaryConfig { path: DEFAULT_DICTIONARY.into(), enabled: true }],
            ..EngineConfig::default()
        },
    };

    let mut collection = match config.open_collection(&FormatRegistry::with_defaults()) {
        Ok(collection) => collection,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red(), e);
            std::process::exit(1);
        }
    };

    println!("{}", "Steno dictionary lookup. Type 'help' for commands, 'exit' to save and quit.".bold());
    println!("{}", collection);

    loop {
        print!("\n> ");
        if stdout().flush().is_err() {
            break;
        }
        let mut input = String::new();
        match stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let (cmd, rest) = match input.trim().split_once(' ') {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input.trim(), ""),
        };

        match cmd {
            "" => {}
            "exit" => break,
            "help" => print_help(),
            "lookup" => match collection.lookup(&StenoKey::parse(rest, &system::active())) {
                Some(translation) => println!("{}", translation.as_str().green()),
                None => println!("{}", "not found".dark_grey()),
            },
            "reverse" => {
                let mut keys: Vec<StenoKey> = collection.reverse_lookup(rest).into_iter().collect();
                sort_steno_strokes(&mut keys);
                print_keys(&keys);
            }
            "similar" => print_results(&collection.find_similar(rest)),
            "partial" => print_results(&collection.find_partial(rest, Some(SEARCH_LIMIT))),
            "regex" => match collection.find_regex(rest, Some(SEARCH_LIMIT)) {
                Ok(results) => print_results(&results),
                Err(e) => eprintln!("{} {}", "[ERROR]".red(), e),
            },
            "add" => add_entry(&mut collection, rest),
            "delete" => delete_entry(&mut collection, rest),
            "save" => match collection.save(None) {
                Ok(()) => println!("{}", "saved".green()),
                Err(e) => eprintln!("{} {}", "[ERROR]".red(), e),
            },
            other => println!("unknown command '{}', try 'help'", other),
        }
    }

    println!("\nSaving dictionaries...");
    if let Err(e) = collection.save(None) {
        eprintln!("{} Could not save dictionaries: {}", "[ERROR]".red(), e);
    }
    collection.wait_for_saves();
}

/// `add STROKES translation text`
fn add_entry(collection: &mut DictionaryCollection, args: &str) {
    let Some((steno, translation)) = args.split_once(' ') else {
        println!("usage: add STROKES translation");
        return;
    };
    let key = StenoKey::parse(steno, &system::active());
    match collection.set(key.clone(), translation.trim().to_string(), None) {
        Ok(()) => println!("{} -> {}", key.to_string().cyan(), translation.trim().green()),
        Err(e) => eprintln!("{} {}", "[ERROR]".red(), e),
    }
}

/// Removes the entry from the first writable dictionary.
fn delete_entry(collection: &mut DictionaryCollection, steno: &str) {
    let key = StenoKey::parse(steno, &system::active());
    let deleted = collection.first_writable_mut().and_then(|d| d.delete(&key));
    match deleted {
        Ok(translation) => println!("deleted {} ({})", key.to_string().cyan(), translation),
        Err(e) => eprintln!("{} {}", "[ERROR]".red(), e),
    }
}

fn print_keys(keys: &[StenoKey]) {
    if keys.is_empty() {
        println!("{}", "no strokes".dark_grey());
        return;
    }
    let joined: Vec<String> = keys.iter().map(ToString::to_string).collect();
    println!("{}", joined.join(", ").cyan());
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("{}", "No matches found.".dark_grey());
        return;
    }
    for (translation, keys) in results {
        let mut keys: Vec<StenoKey> = keys.iter().cloned().collect();
        sort_steno_strokes(&mut keys);
        print!("  {}  ", translation.as_str().green());
        print_keys(&keys);
    }
}

fn print_help() {
    println!("  lookup STROKES          translation for a stroke sequence");
    println!("  reverse TEXT            strokes producing exactly TEXT");
    println!("  similar TEXT            translations equal to TEXT ignoring case and braces");
    println!("  partial TEXT            translations starting with TEXT");
    println!("  regex PATTERN           translations matching PATTERN from the start");
    println!("  add STROKES TEXT        add an entry to the first writable dictionary");
    println!("  delete STROKES          remove an entry from the first writable dictionary");
    println!("  save                    save every writable dictionary");
    println!("  exit                    save and quit");
}
