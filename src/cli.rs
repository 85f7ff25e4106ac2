use crate::cache::{cache_key, CacheSource, DocumentCache, FileCacheStore};
use crate::catalog::load_catalog;
use crate::config::Config;
use crate::document::Document;
use crate::merge::merge;
use crate::openapi_builder::{BuildOptions, OpenApiBuilder};
use crate::serializer::{import_document, read_document, serialize, write_to_file, Format};
use crate::site::SiteGenerator;
use crate::theme::ThemeRegistry;
use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

/// OpenAPI from routes - Generate OpenAPI documentation and static docs sites from a route catalog
#[derive(Parser, Debug)]
#[command(name = "openapi-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Configuration file (YAML or JSON); built-in defaults when omitted
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the specification from a route catalog and store it
    Generate(GenerateArgs),
    /// Import an existing specification file
    Import(ImportArgs),
    /// Generate the static documentation site
    Static(StaticArgs),
    /// Show route and document statistics
    Status(StatusArgs),
    /// Remove backups, cache entries or generated files
    Clean(CleanArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Both JSON and YAML
    Both,
}

impl OutputFormat {
    fn formats(self) -> &'static [Format] {
        match self {
            OutputFormat::Json => &[Format::Json],
            OutputFormat::Yaml => &[Format::Yaml],
            OutputFormat::Both => &[Format::Json, Format::Yaml],
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Route catalog file (JSON or YAML)
    #[arg(value_name = "ROUTES")]
    pub routes: PathBuf,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "both")]
    pub format: OutputFormat,

    /// Additional include glob (repeatable)
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Additional exclude glob (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Write compact JSON
    #[arg(long)]
    pub minify: bool,

    /// Fail when the built document has violations
    #[arg(long)]
    pub validate: bool,

    /// Rebuild even when a cached document exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Specification file to import (JSON or YAML)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Validate the imported document
    #[arg(long)]
    pub validate: bool,

    /// Keep going when validation reports violations
    #[arg(long = "allow-invalid")]
    pub allow_invalid: bool,

    /// Back up the stored openapi.json first
    #[arg(long)]
    pub backup: bool,

    /// Merge into the stored openapi.json instead of replacing it
    #[arg(long)]
    pub merge: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["routes", "spec"])))]
pub struct StaticArgs {
    /// Build the document from this route catalog
    #[arg(long, value_name = "FILE")]
    pub routes: Option<PathBuf>,

    /// Use this specification file as is
    #[arg(long, value_name = "FILE")]
    pub spec: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Theme to render (repeatable); configured themes when omitted
    #[arg(short = 't', long = "theme", value_name = "THEME")]
    pub themes: Vec<String>,

    /// Base URL the site is served under
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Minify HTML pages and the JSON specification
    #[arg(long)]
    pub minify: bool,

    /// Skip the shared assets
    #[arg(long = "no-assets")]
    pub no_assets: bool,

    /// Skip sitemap.xml
    #[arg(long = "no-sitemap")]
    pub no_sitemap: bool,

    /// Write into a non-empty output directory
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Route catalog file (JSON or YAML)
    #[arg(value_name = "ROUTES")]
    pub routes: PathBuf,

    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Remove backup files
    #[arg(long)]
    pub backups: bool,

    /// Remove cache entries
    #[arg(long)]
    pub cache: bool,

    /// Remove generated and imported specification files
    #[arg(long)]
    pub generated: bool,

    /// Remove everything above
    #[arg(long)]
    pub all: bool,

    /// Only remove files older than this many days
    #[arg(long = "older-than", value_name = "DAYS")]
    pub older_than: Option<u64>,

    /// List what would be removed without removing it
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// Run the selected subcommand
pub fn run(args: CliArgs) -> Result<()> {
    debug!("Parsed arguments: {:?}", args);
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Generate(cmd) => generate(&config, cmd),
        Command::Import(cmd) => import(&config, cmd),
        Command::Static(cmd) => generate_static(&config, cmd),
        Command::Status(cmd) => status(&config, cmd),
        Command::Clean(cmd) => clean(&config, cmd),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::load(path).with_context(|| format!("Failed to load {}", path.display()))
        }
        None => {
            debug!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

fn document_cache(config: &Config) -> DocumentCache {
    if config.cache.enabled {
        let directory = config.cache_directory();
        debug!("Caching documents under {}", directory.display());
        DocumentCache::new(Box::new(FileCacheStore::new(directory)))
    } else {
        DocumentCache::disabled()
    }
}

/// Build through the document cache
fn build_document(
    config: &Config,
    options: BuildOptions,
    routes_path: &Path,
    force: bool,
) -> Result<Arc<Document>> {
    info!("Loading route catalog from {}", routes_path.display());
    let routes = load_catalog(routes_path)
        .with_context(|| format!("Failed to load route catalog {}", routes_path.display()))?;
    info!("Loaded {} routes", routes.len());

    let cache = document_cache(config);
    let key = cache_key(&config.cache.key_prefix, &options)?;
    let builder = OpenApiBuilder::new(options);

    info!("Building OpenAPI document...");
    let lookup = cache.get_or_build(&key, config.cache.ttl(), force, || builder.build(&routes))?;
    match lookup.source {
        CacheSource::Hit => info!("Using cached document ({})", key),
        CacheSource::Built => info!("OpenAPI document built successfully"),
        CacheSource::Shared => info!("Reused a document built concurrently"),
    }
    for warning in &lookup.warnings {
        warn!("{}", warning);
    }
    Ok(lookup.document)
}

fn generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let mut options = config.build_options();
    options.include_patterns.extend(args.include);
    options.exclude_patterns.extend(args.exclude);
    options.validate = args.validate;

    let document = build_document(config, options, &args.routes, args.force)?;

    for &format in args.format.formats() {
        let path = config
            .storage_path
            .join(format!("openapi.{}", format.extension()));
        info!("Serializing to {} format...", format);
        let content = serialize(&document, format, args.minify)?;
        write_to_file(&content, &path)?;
        println!("Wrote {}", path.display());
    }

    print_document_stats(&document);
    Ok(())
}

fn import(config: &Config, args: ImportArgs) -> Result<()> {
    info!("Importing {}", args.file.display());
    let strict = args.validate && !args.allow_invalid;
    let report = import_document(&args.file, strict)
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    let stored = config.storage_path.join("openapi.json");
    if args.backup {
        backup_specification(&config.storage_path, &stored)?;
    }

    let document = if args.merge && stored.exists() {
        info!("Merging into {}", stored.display());
        let base = read_document(&stored)?;
        merge(&base, &report.document)
    } else {
        if args.merge {
            warn!("No stored specification at {}, nothing to merge into", stored.display());
        }
        report.document
    };

    for format in [Format::Json, Format::Yaml] {
        let path = config
            .storage_path
            .join(format!("imported_openapi.{}", format.extension()));
        write_to_file(&serialize(&document, format, false)?, &path)?;
        println!("Wrote {}", path.display());
    }

    print_document_stats(&document);
    if args.validate {
        println!("Violations:  {}", report.violations.len());
        for violation in &report.violations {
            println!("  - {}", violation);
        }
    }
    Ok(())
}

fn backup_specification(storage: &Path, stored: &Path) -> Result<()> {
    if !stored.exists() {
        warn!("No stored specification at {}, skipping backup", stored.display());
        return Ok(());
    }

    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let backup = storage
        .join("backups")
        .join(format!("openapi_backup_{}.json", stamp));
    if let Some(parent) = backup.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::copy(stored, &backup).with_context(|| format!("Failed to back up {}", stored.display()))?;
    println!("Backed up {} to {}", stored.display(), backup.display());
    Ok(())
}

fn generate_static(config: &Config, args: StaticArgs) -> Result<()> {
    let mut site = config.static_config();
    if let Some(output) = args.output {
        site.output_path = output;
    }
    if !args.themes.is_empty() {
        site.themes = args.themes;
    }
    if let Some(base_url) = args.base_url {
        site.base_url = base_url;
    }
    site.minify_html |= args.minify;
    site.include_assets &= !args.no_assets;
    site.generate_sitemap &= !args.no_sitemap;

    if !args.force && is_non_empty_dir(&site.output_path) {
        anyhow::bail!(
            "Output directory {} is not empty (use --force to write into it)",
            site.output_path.display()
        );
    }

    let document = match (args.spec, args.routes) {
        (Some(spec), _) => {
            info!("Reading specification from {}", spec.display());
            Arc::new(read_document(&spec)?)
        }
        (None, Some(routes)) => build_document(config, config.build_options(), &routes, false)?,
        (None, None) => anyhow::bail!("Either --routes or --spec is required"),
    };

    let registry = ThemeRegistry::with_builtin_themes(&config.available_themes);
    let result = SiteGenerator::new(site, &registry).generate(&document)?;

    println!("Static documentation generated in {}", result.output_root.display());
    for file in &result.files {
        println!("  {}", file.display());
    }
    println!("Files: {}  Size: {}", result.files.len(), format_size(result.total_bytes));
    Ok(())
}

fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn status(config: &Config, args: StatusArgs) -> Result<()> {
    let routes = load_catalog(&args.routes)
        .with_context(|| format!("Failed to load route catalog {}", args.routes.display()))?;
    let builder = OpenApiBuilder::new(config.build_options());
    let route_stats = builder.route_stats(&routes)?;
    let document_stats = builder.build(&routes)?.stats();

    if args.json {
        let report = serde_json::json!({
            "routes": route_stats,
            "document": document_stats,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Routes");
    println!("  Total:       {}", route_stats.total_routes);
    println!("  Documented:  {}", route_stats.documented_routes);
    for (method, count) in &route_stats.methods {
        println!("  {:<12} {}", method, count);
    }
    if !route_stats.middleware.is_empty() {
        println!("Middleware");
        for (tag, count) in &route_stats.middleware {
            println!("  {:<12} {}", tag, count);
        }
    }
    println!("Document");
    println!("  Paths:       {}", document_stats.path_count);
    println!("  Operations:  {}", document_stats.operation_count);
    println!("  Tags:        {}", document_stats.tag_count);
    println!("  Schemas:     {}", document_stats.schema_count);

    let stored = config.storage_path.join("openapi.json");
    if stored.exists() {
        println!("Stored specification: {}", stored.display());
    } else {
        println!("Stored specification: none");
    }
    Ok(())
}

fn print_document_stats(document: &Document) {
    let stats = document.stats();
    println!("Paths:       {}", stats.path_count);
    println!("Operations:  {}", stats.operation_count);
    println!("Tags:        {}", stats.tag_count);
    println!("Schemas:     {}", stats.schema_count);
}

const GENERATED_PATTERNS: [&str; 6] = [
    "openapi.json",
    "openapi.yaml",
    "imported_openapi.json",
    "imported_openapi.yaml",
    "api-docs-*.json",
    "api-docs-*.yaml",
];

fn clean(config: &Config, args: CleanArgs) -> Result<()> {
    if !(args.backups || args.cache || args.generated || args.all) {
        anyhow::bail!("Specify what to clean: --backups, --cache, --generated or --all");
    }
    if args.dry_run {
        println!("Dry run: nothing will be deleted");
    }

    let cutoff = args.older_than.map(cutoff_for_days).transpose()?;

    let mut candidates = Vec::new();
    if args.backups || args.all {
        candidates.extend(files_under(&config.storage_path.join("backups")));
    }
    if args.cache || args.all {
        candidates.extend(files_under(&config.cache_directory()));
    }
    if args.generated || args.all {
        candidates.extend(generated_files(&config.storage_path)?);
    }

    let targets = older_than(candidates, cutoff);
    let mut total_bytes = 0;
    for (path, size) in &targets {
        if !args.dry_run {
            fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        total_bytes += size;
        println!("  {}", path.display());
    }

    let verb = if args.dry_run { "Would remove" } else { "Removed" };
    println!("{} {} files ({})", verb, targets.len(), format_size(total_bytes));
    Ok(())
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("{} does not exist", dir.display());
        return Vec::new();
    }
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error accessing entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn generated_files(storage: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in GENERATED_PATTERNS {
        let full = storage.join(pattern);
        for path in glob::glob(&full.to_string_lossy())?.flatten() {
            if path.is_file() {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// Keep files last modified before `cutoff` (all of them without one), with their sizes
fn cutoff_for_days(days: u64) -> Result<SystemTime> {
    days.checked_mul(24 * 60 * 60)
        .and_then(|secs| SystemTime::now().checked_sub(Duration::from_secs(secs)))
        .with_context(|| format!("--older-than {} days is out of range", days))
}

fn older_than(files: Vec<PathBuf>, cutoff: Option<SystemTime>) -> Vec<(PathBuf, u64)> {
    files
        .into_iter()
        .filter_map(|path| {
            let metadata = fs::metadata(&path).ok()?;
            if let Some(cutoff) = cutoff {
                let modified = metadata.modified().ok()?;
                if modified > cutoff {
                    return None;
                }
            }
            Some((path, metadata.len()))
        })
        .collect()
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
