//! List Registered Effects
//!
//! Utility to list the effects the host can instantiate and to dump the
//! resolved knob tree of any of them.

use clap::{Parser, Subcommand};
use photon::effect_host::{EffectInstance, EffectRegistry, MockBlur};
use photon::knob::SharedKnob;
use photon::project::Project;
use photon::ui::HeadlessUi;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "list_effects")]
#[command(about = "List and describe hostable effects", long_about = None)]
struct Cli {
    /// Also load cached effect metadata from this file
    #[arg(long)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered effect
    List,
    /// Instantiate an effect and print its knob tree
    Describe {
        /// Effect identifier (e.g. photon.mock.blur)
        id: String,
    },
}

fn build_registry(cache: Option<&PathBuf>) -> EffectRegistry {
    let mut registry = EffectRegistry::new();
    // Built-in effects; external plugin binaries register through the
    // loading subsystem.
    if let Err(e) = registry.register(Box::new(|| Box::new(MockBlur::new()))) {
        eprintln!("Error registering built-in effects: {}", e);
    }
    if let Some(path) = cache {
        match registry.load_cache(path) {
            Ok(count) => println!("Loaded {} cached effect(s) from {}\n", count, path.display()),
            Err(e) => eprintln!("Error loading cache {}: {}", path.display(), e),
        }
    }
    registry
}

fn print_knob(knob: &SharedKnob, indent: usize) {
    let (name, label, kind, secret, children) = {
        let knob = knob.lock().unwrap();
        (
            knob.name().to_string(),
            knob.label().to_string(),
            knob.kind_name(),
            knob.is_secret(),
            knob.children(),
        )
    };
    let secrecy = if secret { " (hidden)" } else { "" };
    println!(
        "{:indent$}- {} [{}] \"{}\"{}",
        "",
        name,
        kind,
        label,
        secrecy,
        indent = indent
    );
    for child in &children {
        print_knob(child, indent + 2);
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let registry = build_registry(cli.cache.as_ref());

    match cli.command {
        Commands::List => {
            if registry.is_empty() {
                println!("No effects registered.");
                return;
            }
            println!("Found {} effect(s):\n", registry.len());
            for (i, info) in registry.list().iter().enumerate() {
                println!("{}. {} ({})", i + 1, info.label, info.id);
                println!("   Version: {}", info.version);
                if !info.grouping.is_empty() {
                    println!("   Group: {}", info.grouping);
                }
                println!(
                    "   Parameters: {}, Clips: {}",
                    info.params.len(),
                    info.clips.join(", ")
                );
                println!();
            }
        }
        Commands::Describe { id } => {
            let plugin = match registry.create(&id) {
                Ok(plugin) => plugin,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let fx = match EffectInstance::new(
                plugin,
                Arc::new(Project::new()),
                Arc::new(HeadlessUi),
                "describe",
            ) {
                Ok(fx) => fx,
                Err(e) => {
                    eprintln!("Error instantiating {}: {}", id, e);
                    std::process::exit(1);
                }
            };

            println!("{} ({})\n", fx.label(), id);
            println!("Clips:");
            for (name, clip) in fx.clips() {
                let role = if clip.is_output() { "output" } else { "input" };
                let optional = if clip.is_optional() { ", optional" } else { "" };
                println!("  - {} ({}{})", name, role, optional);
            }
            println!("\nKnobs:");
            // Top-level knobs only; containers print their children
            for knob in fx.knobs() {
                if knob.lock().unwrap().parent().is_none() {
                    print_knob(knob, 2);
                }
            }
        }
    }
}
