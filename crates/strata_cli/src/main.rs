//! Compose a JSON layer and print the resulting scene.
//!
//! Run with: cargo run -- assets/demo/shot.json

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use strata_core::compose::{Composer, CompositionConfig};
use strata_core::json::{JsonLayerEngine, JsonSceneProjector};
use strata_core::FileResolver;

/// Progressive layer composition.
///
/// Examples:
///   strata assets/demo/shot.json
///   strata assets/demo/cycle.json --lenient --max-iterations 4
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root layer to compose.
    #[arg(value_name = "ROOT_LAYER")]
    root: PathBuf,

    /// Load composition bounds from a JSON file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Deepest sublayer nesting to fetch (default 16).
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Bound on the composition loop (default 16).
    #[arg(long, value_name = "N")]
    max_iterations: Option<usize>,

    /// Report hit bounds instead of failing.
    #[arg(long)]
    lenient: bool,

    /// Include class prims in the output.
    #[arg(long)]
    classes: bool,
}

impl Args {
    /// The config file if given, with flags layered on top.
    fn composition_config(&self) -> Result<CompositionConfig> {
        let mut config = match &self.config {
            Some(path) => CompositionConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config '{}'", path.display()))?,
            None => CompositionConfig::default(),
        };
        if let Some(depth) = self.max_depth {
            config = config.with_max_sublayer_depth(depth);
        }
        if let Some(iterations) = self.max_iterations {
            config = config.with_max_iterations(iterations);
        }
        if self.lenient {
            config = config.lenient();
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.composition_config()?;
    let root_path: &Path = &args.root;
    let file_name = root_path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("'{}' does not name a layer file", root_path.display()))?;

    let resolver = FileResolver::for_layer(root_path);
    let mut composer = Composer::new(resolver, JsonLayerEngine::new()).with_config(config);
    let projector = JsonSceneProjector {
        include_classes: args.classes,
    };

    println!("Composing layer: {}", root_path.display());
    let (scene, report) = pollster::block_on(composer.compose_and_project(file_name, &projector))
        .with_context(|| format!("Failed to compose '{}'", root_path.display()))?;

    println!("\n=== Scene: {} ===", scene.name);
    println!("Prims: {}", scene.prim_count());
    println!("Attributes: {}", scene.attribute_count());

    println!("\n--- Composition ---");
    println!("  Sublayers visited: {}", report.sublayers_visited);
    println!("  Iterations: {} ({} composing)", report.iterations, report.composing_iterations);
    let operators: Vec<&str> = report.operators.iter().map(|kind| kind.as_str()).collect();
    println!("  Operators: {}", operators.join(", "));
    println!("  Assets cached: {}", composer.resolver().cache().len());
    for bound in &report.bounds_exceeded {
        println!("  Bound exceeded: {}", bound);
    }

    println!("\n--- Prims ---");
    for prim in &scene.prims {
        let indent = "  ".repeat(prim.depth());
        println!(
            "{}{} ({})",
            indent,
            prim.path,
            prim.type_name.as_deref().unwrap_or("untyped")
        );
        for (name, value) in &prim.attributes {
            println!("{}    {} = {}", indent, name, value);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use strata_core::BoundPolicy;

    fn parse(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("strata").chain(list.iter().copied()))
    }

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_defaults() {
        let args = parse(&["shot.json"]).unwrap();
        assert_eq!(args.root, PathBuf::from("shot.json"));
        assert_eq!(args.composition_config().unwrap(), CompositionConfig::default());
        assert!(!args.classes);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&[
            "--max-depth",
            "4",
            "shot.json",
            "--max-iterations",
            "2",
            "--lenient",
            "--classes",
        ])
        .unwrap();
        let config = args.composition_config().unwrap();
        assert_eq!(config.max_sublayer_depth, 4);
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.bound_policy, BoundPolicy::Lenient);
        assert!(args.classes);
    }

    #[test]
    fn test_rejected_arguments() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a.json", "b.json"]).is_err());
        assert!(parse(&["a.json", "--max-depth", "many"]).is_err());
        assert!(parse(&["a.json", "--bogus"]).is_err());

        // Parses, but the bound is invalid
        let args = parse(&["a.json", "--max-depth", "0"]).unwrap();
        assert!(args.composition_config().is_err());
    }
}
