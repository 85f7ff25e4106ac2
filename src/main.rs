//! OpenAPI from routes - Command-line tool for generating OpenAPI documentation.
//!
//! Builds an OpenAPI 3 document from a route catalog file, imports and merges existing
//! specifications, and renders a static documentation site.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-routes [OPTIONS] <COMMAND>
//! ```
//!
//! # Examples
//!
//! Generate `openapi.json` and `openapi.yaml` into the storage directory:
//! ```bash
//! openapi-from-routes generate routes.json
//! ```
//!
//! Render a Swagger UI and ReDoc site from an existing specification:
//! ```bash
//! openapi-from-routes static --spec openapi.json --theme swagger --theme redoc -o site
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-routes -v status routes.json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_routes::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from routes starting...");

    cli::run(args)?;

    Ok(())
}
