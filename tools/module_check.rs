/// Module Check: validates module content against the reference catalog
/// before generation.
///
/// Usage: module_check <content.ron|dir> --catalog <dir> [--aliases <file>] [--config <file>]

use module_forge::core::pipeline::{load_content, ModuleGenerator};
use std::process;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!(
            "Usage: module_check <content.ron|dir> --catalog <dir> [--aliases <file>] [--config <file>]"
        );
        process::exit(0);
    }

    let content_path = &args[1];
    let mut catalog_dir = None;
    let mut aliases_path = None;
    let mut config_path = None;

    let mut i = 2;
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
                process::exit(2);
            }
        }
        i += 1;
    }

    let Some(catalog_dir) = catalog_dir else {
        eprintln!("ERROR: --catalog <dir> is required");
        process::exit(2);
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
            eprintln!("ERROR: Failed to load reference library: {}", e);
            process::exit(1);
        }
    };

    let content = match load_content(std::path::Path::new(content_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: Failed to load content '{}': {}", content_path, e);
            process::exit(1);
        }
    };

    let library = generator.library();
    println!(
        "Loaded {} NPC and {} item catalog entries",
        library.npcs.len(),
        library.items.len()
    );
    for warning in generator.load_warnings() {
        println!("  Skipped {}: {}", warning.path.display(), warning.message);
    }

    let report = generator.validate(&content);

    println!("\n=== Module Check Report ===\n");

    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }

    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    let stats = &report.stats;
    println!(
        "\nResolved {} of {} records ({} exact, {} mapped, {} fuzzy, {} custom); {} links checked",
        stats.records - stats.unresolved,
        stats.records,
        stats.exact,
        stats.mapped,
        stats.fuzzy,
        stats.custom,
        stats.links
    );
    println!(
        "Summary: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );

    if report.is_ok() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}
