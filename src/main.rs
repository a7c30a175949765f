//! OpenAPI from annotations - command-line tool.
//!
//! Compiles an annotation document (operations documented with `url`, `verb`,
//! `param`, `response` and similar tags) plus the Rust types it references
//! into OpenAPI 3.0 documents, one per document variant.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-annotations [OPTIONS] <ANNOTATIONS>
//! ```
//!
//! # Examples
//!
//! Generate the result as YAML on stdout:
//! ```bash
//! openapi-from-annotations annotations.yaml -m ./src/models
//! ```
//!
//! Use a configuration and write every variant document to `docs/`:
//! ```bash
//! openapi-from-annotations annotations.yaml -c config.yaml -m ./src -d docs -f json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_annotations::cli;

fn main() -> Result<()> {
    // Parse once for the verbose flag, validate after the logger is up
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from annotations starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
