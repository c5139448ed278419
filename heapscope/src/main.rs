//! # heapscope - Main Entry Point
//!
//! Replays a saved sampling heap profile: builds the allocation tree, prints
//! a summary with the largest allocation sites, and optionally exports the
//! tree as nested JSON.

use anyhow::{Context, Result};
use clap::Parser;
use heapscope::analysis::analyze_allocation_sites;
use heapscope::cli::Args;
use heapscope::domain::{BuildError, Bytes, LoadError};
use heapscope::export::TreeJsonExporter;
use heapscope::heap::{HeapTree, HeapTreeBuilder, RawHeapProfile};
use log::info;
use serde_json::error::Category;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_DATAERR: i32 = 65;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

/// Malformed profile data exits with `EXIT_DATAERR`, everything else with
/// `EXIT_ERROR`. A read failure surfaced through the JSON parser is not
/// malformed data.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    let malformed = err.chain().any(|cause| {
        cause.downcast_ref::<BuildError>().is_some()
            || matches!(
                cause.downcast_ref::<LoadError>(),
                Some(LoadError::Json(json)) if json.classify() != Category::Io
            )
    });
    if malformed {
        EXIT_DATAERR
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let raw = RawHeapProfile::from_file(&args.profile)
        .with_context(|| format!("Failed to load {}", args.profile.display()))?;

    let mut builder = HeapTreeBuilder::new();
    if let Some(limit) = args.max_depth {
        builder = builder.with_max_depth(limit);
    }
    let tree = builder.build_profile(&raw).context("Invalid heap profile")?;
    info!("Loaded {} nodes from {}", tree.len(), args.profile.display());

    if !args.quiet {
        print_summary(&args, &tree);
    }

    if let Some(ref path) = args.export {
        TreeJsonExporter::new(&tree)
            .with_min_total_size(Bytes(args.min_size))
            .export_to_file(path)
            .with_context(|| format!("Failed to export tree to {}", path.display()))?;
        if !args.quiet {
            println!("exported: {}", path.display());
        }
    }

    Ok(())
}

fn print_summary(args: &Args, tree: &HeapTree) {
    println!("heapscope v{}", env!("CARGO_PKG_VERSION"));
    println!("profile: {}", args.profile.display());
    if let Some(root_path) = tree.root_path() {
        println!("root: {root_path}");
    }
    println!("nodes: {}", tree.len());
    println!("samples: {}", tree.samples().len());
    println!("total: {}", tree.total_size());

    let sites = analyze_allocation_sites(tree);
    if sites.is_empty() {
        return;
    }

    println!();
    println!("TOP ALLOCATION SITES");
    for site in sites.iter().take(args.top) {
        let location = match site.line {
            Some(line) if !site.url.is_empty() => format!("{}:{line}", site.url),
            _ => site.url.clone(),
        };
        println!("  {:>10}  {:>5.1}%  {}  {}", site.bytes.to_string(), site.percentage, site.name, location);
    }
}
