/// Catalog Query: interactive shell for exploring the reference catalog
/// and trying out name resolution.
///
/// Usage: catalog_query --catalog <dir> [--aliases <file>] [--config <file>]
///
/// Commands:
///   find <name>                   canonical entry for a name
///   all <name>                    every source version of a name
///   sources <name>                which sources hold a name, and which wins
///   search <term>                 substring search over canonical names
///   group <group>                 canonical entries in a creature group
///   match <name> [@level]         resolve an NPC name
///   item <name>                   resolve an item name
///   custom <new> = <base> [@level] preview a custom NPC
///   professions                   list professions and their levels
///   help                          list commands
///   quit                          exit

use indexmap::IndexMap;
use module_forge::core::matcher::{EntityMatcher, MatchResult};
use module_forge::core::pipeline::ModuleGenerator;
use module_forge::schema::entity::CatalogEntry;
use module_forge::schema::field::Field;
use std::io::{self, BufRead, Write};

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut catalog_dir = None;
    let mut aliases_path = None;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_dir = Some(args[i].clone());
            }
            "--aliases" if i + 1 < args.len() => {
                i += 1;
                aliases_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(catalog_dir) = catalog_dir else {
        print_usage();
        std::process::exit(1);
    };

    let mut builder = ModuleGenerator::builder().catalog_dir(&catalog_dir);
    if let Some(ref path) = aliases_path {
        builder = builder.aliases(path);
    }
    if let Some(ref path) = config_path {
        builder = builder.config(path);
    }
    let generator = match builder.build() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let library = generator.library();
    println!(
        "Loaded {} NPC entries ({} names), {} item entries",
        library.npcs.len(),
        library.npcs.canonical_names().len(),
        library.items.len()
    );
    for warning in generator.load_warnings() {
        println!("  Skipped {}: {}", warning.path.display(), warning.message);
    }
    println!("Type 'help' for commands.\n");

    let matcher = generator.matcher();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("catalog> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
            None => (line.to_lowercase(), ""),
        };

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "find" => match library.npcs.find_by_name(rest, None) {
                Some(entry) => print_entry(entry),
                None => println!("'{}' not found", rest),
            },
            "all" => {
                let versions = library.npcs.find_all_by_name(rest);
                if versions.is_empty() {
                    println!("'{}' not found", rest);
                }
                for entry in versions {
                    println!("  {} [{}] id={}", entry.name, entry.source, entry.id);
                }
            }
            "sources" => match library.npcs.source_info(rest) {
                Some(info) => {
                    println!("{}:", info.name);
                    for version in &info.sources {
                        println!(
                            "  {}{} (rank {}) {}",
                            if version.is_default { "* " } else { "  " },
                            version.source,
                            version.rank,
                            version.reference.as_deref().unwrap_or("-")
                        );
                    }
                }
                None => println!("'{}' not found", rest),
            },
            "search" => {
                let hits = library.npcs.search_by_name(rest);
                println!("{} match(es)", hits.len());
                for entry in hits.iter().take(25) {
                    println!("  {} [{}]", entry.name, entry.source);
                }
            }
            "group" => {
                for entry in library.npcs.search_by_group(rest) {
                    println!("  {} (level {})", entry.name, entry.level().unwrap_or_default());
                }
            }
            "match" => {
                let (name, level) = split_level(rest);
                print_match(&matcher.match_npc(name, level));
            }
            "item" => print_match(&matcher.match_item(rest)),
            "custom" => {
                let Some((new_name, base)) = rest.split_once('=') else {
                    println!("Usage: custom <new name> = <base> [@level]");
                    continue;
                };
                let (base, level) = split_level(base.trim());
                preview_custom(&matcher, new_name.trim(), base, level);
            }
            "professions" => {
                for profession in library.npcs.list_professions() {
                    let levels: Vec<String> = library
                        .npcs
                        .levels_for_profession(profession)
                        .iter()
                        .map(|l| l.to_string())
                        .collect();
                    println!("  {}: {}", profession, levels.join(", "));
                }
            }
            _ => println!("Unknown command '{}'. Type 'help' for commands.", cmd),
        }
    }
}

/// Split a trailing `@<level>` off a name.
fn split_level(input: &str) -> (&str, Option<u32>) {
    match input.rsplit_once('@') {
        Some((name, level)) => match level.trim().parse() {
            Ok(level) => (name.trim(), Some(level)),
            Err(_) => (input, None),
        },
        None => (input, None),
    }
}

fn print_entry(entry: &CatalogEntry) {
    println!("{} [{}] id={}", entry.name, entry.source, entry.id);
    if let Some(ref reference) = entry.reference {
        println!("  reference: {}", reference);
    }
    for (key, field) in &entry.fields {
        match field {
            Field::Value(value) => println!("  {} ({}): {}", key, value.field_type.tag(), value.raw),
            Field::Group(group) => println!("  {}: {} entries", key, group.len()),
        }
    }
}

fn print_match(result: &MatchResult<'_>) {
    if result.found {
        print!(
            "'{}' -> '{}' via {}",
            result.original_name,
            result.matched_name.as_deref().unwrap_or_default(),
            result.method.tag()
        );
        if let Some(score) = result.fuzzy_score {
            print!(" (score {:.3})", score);
        }
        if let Some(level) = result.level_used {
            print!(" at level {}{}", level, if result.level_defaulted { " (default)" } else { "" });
        }
        println!();
    } else if result.suggestions.is_empty() {
        println!("'{}' not found", result.original_name);
    } else {
        println!(
            "'{}' not found; did you mean: {}",
            result.original_name,
            result.suggestions.join(", ")
        );
    }
}

fn preview_custom(matcher: &EntityMatcher<'_>, new_name: &str, base: &str, level: Option<u32>) {
    match matcher.create_custom_npc(new_name, base, level, IndexMap::new()) {
        Ok(custom) => {
            println!(
                "'{}' based on '{}' via {}",
                new_name,
                custom.based_on,
                custom.method.tag()
            );
            print_entry(&custom.entity.entry);
        }
        Err(e) => {
            println!("ERROR: {}", e);
            if !e.suggestions().is_empty() {
                println!("  did you mean: {}", e.suggestions().join(", "));
            }
        }
    }
}

fn print_usage() {
    println!("Catalog Query: interactive shell for the reference catalog.");
    println!();
    println!("Usage: catalog_query --catalog <dir> [--aliases <file>] [--config <file>]");
    println!();
    println!("  --catalog <dir>   Directory holding npcs/ and items/ catalog sources");
    println!("  --aliases <file>  Alias table (optional)");
    println!("  --config <file>   Generator config (optional)");
}

fn print_help() {
    println!("Commands:");
    println!("  find <name>                    Show the canonical entry for a name");
    println!("  all <name>                     List every source version of a name");
    println!("  sources <name>                 Show sources and the default pick (*)");
    println!("  search <term>                  Substring search over canonical names");
    println!("  group <group>                  List canonical entries in a group");
    println!("  match <name> [@level]          Resolve an NPC name");
    println!("  item <name>                    Resolve an item name");
    println!("  custom <new> = <base> [@level] Preview a custom NPC");
    println!("  professions                    List professions and levels");
    println!("  help                           Show this help");
    println!("  quit                           Exit");
}
