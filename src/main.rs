use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use codeintake::cache::{CacheBackend, MemoryBackend, SledBackend};
use codeintake::cli;
use codeintake::logging::{self, Verbosity};
use codeintake::output::OutputFormatter;
use codeintake::pipeline::Analyzer;
use codeintake::FingerprintCache;

fn main() -> Result<ExitCode> {
    let args = cli::Args::parse();
    logging::init(Verbosity::from_flags(args.verbose, args.quiet));
    args.validate().context("Invalid arguments")?;

    let config = args.load_config()?;

    let backend: Arc<dyn CacheBackend> = match args.cache_dir {
        Some(ref dir) => Arc::new(
            SledBackend::open(dir)
                .with_context(|| format!("Failed to open cache at {}", dir.display()))?,
        ),
        None => Arc::new(MemoryBackend::new()),
    };
    let cache = FingerprintCache::new(backend, config.cache.clone());

    if args.clear_cache {
        let removed = cache.clear();
        info!(removed, "cache cleared");
    }

    let analyzer = Analyzer::new(&config, cache);

    let outcomes = analyzer.analyze_paths(&args.path);

    let report = OutputFormatter::format(&outcomes, args.format)?;
    match args.output_file {
        Some(ref path) => {
            fs::write(path, &report)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            info!(path = %path.display(), format = args.format.as_str(), "report written");
        }
        None => println!("{report}"),
    }

    if outcomes.iter().any(|o| o.result.is_err()) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
