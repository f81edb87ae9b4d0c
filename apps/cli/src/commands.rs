//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use tracing::info;

use tagtrace_core::{
    DocumentSession, GroundTruthReport, MatchResult, ProgressReporter, SessionSummary,
    contact_mappings, generate_wire_paths,
};
use tagtrace_shared::{
    AppConfig, Component, ContactConfig, PageKind, PageTransform, RoutingConfig, ScanConfig,
    WireSpec, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TagTrace: find device tags in schematic PDFs and route wires between them.
#[derive(Parser)]
#[command(
    name = "tagtrace",
    version,
    about = "Locate device tags in vector-PDF schematics, match tag lists and route wires.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.tagtrace/tagtrace.toml.
    #[arg(long, global = true, env = "TAGTRACE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Options shared by every command that scans a document.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct ScanArgs {
    /// Document to scan: a text-run dump (.json) or, with the `pdf` feature, a PDF.
    pub document: PathBuf,

    /// Worker threads for page extraction (0 = one per core).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Dedup distance in points.
    #[arg(long)]
    pub threshold: Option<f64>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover every tag in a document and build a ground-truth report.
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Write the report to this file.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also print the position count over every page. Summary only: the
        /// report always covers schematic pages.
        #[arg(long)]
        all_pages: bool,

        /// Print the report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Resolve a list of tags against a document.
    Find {
        #[command(flatten)]
        scan: ScanArgs,

        /// Tag to look for (repeatable).
        #[arg(short, long = "tag", allow_hyphen_values = true)]
        tags: Vec<String>,

        /// File with one tag per line (`#` starts a comment).
        #[arg(long)]
        tags_file: Option<PathBuf>,

        /// Search every page, not only schematics.
        #[arg(long)]
        all_pages: bool,

        /// Print the full match result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show where a relay's auxiliary contacts are drawn.
    Contacts {
        #[command(flatten)]
        scan: ScanArgs,

        /// Base device tag, e.g. -K1 (use `--` before tags that start with a hyphen).
        #[arg(allow_hyphen_values = true)]
        base_tag: String,
    },

    /// Route wires between placed components.
    Route {
        /// JSON array of placed components.
        #[arg(long)]
        components: PathBuf,

        /// JSON array of wires (terminal pairs).
        #[arg(long)]
        wires: PathBuf,

        /// Also emit device-space waypoints at this resolution.
        #[arg(long)]
        dpi: Option<f64>,

        /// Zoom factor for device-space waypoints.
        #[arg(long, default_value = "1.0")]
        zoom: f64,

        /// Page height in points for the y flip.
        #[arg(long, default_value = "842.0")]
        page_height: f64,
    },

    /// Check a document against a saved ground-truth report.
    Validate {
        #[command(flatten)]
        scan: ScanArgs,

        /// Report produced earlier by `tagtrace scan --out`.
        #[arg(long)]
        ground_truth: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tagtrace=info",
        1 => "tagtrace=debug",
        _ => "tagtrace=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    match cli.command {
        Command::Scan {
            scan,
            out,
            all_pages,
            json,
        } => cmd_scan(&config, &scan, out.as_deref(), all_pages, json).await,
        Command::Find {
            scan,
            tags,
            tags_file,
            all_pages,
            json,
        } => {
            let mut tags = tags;
            if let Some(file) = tags_file {
                tags.extend(read_tag_list(&file)?);
            }
            cmd_find(&config, &scan, &tags, all_pages, json).await
        }
        Command::Contacts { scan, base_tag } => cmd_contacts(&config, &scan, &base_tag).await,
        Command::Route {
            components,
            wires,
            dpi,
            zoom,
            page_height,
        } => cmd_route(&config, &components, &wires, dpi, zoom, page_height),
        Command::Validate { scan, ground_truth } => {
            cmd_validate(&config, &scan, &ground_truth).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => Ok(load_config_from(p)?),
        None => Ok(load_config()?),
    }
}

/// Scan config from the config file with CLI flags applied on top.
fn scan_config(config: &AppConfig, args: &ScanArgs) -> Result<ScanConfig> {
    let mut scan = ScanConfig::from(config);
    if let Some(workers) = args.workers {
        scan.workers = workers;
    }
    if let Some(threshold) = args.threshold {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(eyre!("--threshold must be a positive number, got {threshold}"));
        }
        scan.matching.dedup_threshold_pt = threshold;
    }
    Ok(scan)
}

async fn open_session(config: &AppConfig, args: &ScanArgs) -> Result<DocumentSession> {
    let scan = scan_config(config, args)?;
    let reporter = Arc::new(CliProgress::new());
    let session = DocumentSession::open(&args.document, &scan, reporter.clone()).await;
    reporter.clear();
    Ok(session?)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_scanned(&self, page: u32, total: u32, kind: PageKind) {
        self.spinner
            .set_message(format!("Scanning [{page}/{total}] {kind}"));
    }

    fn done(&self, _summary: &SessionSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_scan(
    config: &AppConfig,
    args: &ScanArgs,
    out: Option<&Path>,
    all_pages: bool,
    json: bool,
) -> Result<()> {
    info!(document = %args.document.display(), "scanning document");
    let session = open_session(config, args).await?;
    let report = session.ground_truth_report();

    if let Some(path) = out {
        report.write(path)?;
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let summary = session.summary();
    println!();
    println!("  Document:    {}", args.document.display());
    println!("  SHA-256:     {}", summary.document_id);
    println!("  Pages:       {}", summary.page_count);
    for (kind, pages) in &summary.pages_by_kind {
        println!("    {:<14} {}", kind.to_string(), join(pages));
    }
    if !summary.failed_pages.is_empty() {
        println!("  Unreadable:  {}", join(&summary.failed_pages));
    }
    println!(
        "  Tags:        {} distinct, {} positions",
        report.tags_with_counts.len(),
        report.total_tag_occurrences
    );
    if all_pages {
        println!("  All pages:   {} positions", session.positions(true).len());
    }
    println!("  Multi-page:  {}", report.multi_page_tags.len());
    println!("  Parts list:  {}", report.parts_list_count);
    if let Some(path) = out {
        println!("  Report:      {}", path.display());
    }
    println!("  Time:        {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_find(
    config: &AppConfig,
    args: &ScanArgs,
    tags: &[String],
    all_pages: bool,
    json: bool,
) -> Result<()> {
    if tags.is_empty() {
        return Err(eyre!("no tags given: use --tag or --tags-file"));
    }
    let session = open_session(config, args).await?;
    let search_all = all_pages || config.matching.search_all_pages;
    let result = session.find_positions(tags, search_all);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    print_match(&result);
    Ok(())
}

fn print_match(result: &MatchResult) {
    println!();
    for p in &result.positions {
        println!(
            "  {:<12} p{:<4} ({:>7.1}, {:>7.1})  {:<8} {:.1}  {}",
            p.tag,
            p.page,
            p.center.x,
            p.center.y,
            format!("{:?}", p.match_type).to_lowercase(),
            p.confidence,
            p.matched_tag,
        );
    }
    if !result.ambiguous.is_empty() {
        println!();
        for (tag, positions) in &result.ambiguous {
            println!("  {tag}: {} positions", positions.len());
        }
    }
    if !result.missing.is_empty() {
        println!();
        for tag in &result.missing {
            let note = if result.invalid_syntax.contains(tag) {
                " (not a device tag)"
            } else {
                ""
            };
            println!("  missing: {tag}{note}");
        }
    }
    println!();
}

async fn cmd_contacts(config: &AppConfig, args: &ScanArgs, base_tag: &str) -> Result<()> {
    let session = open_session(config, args).await?;
    let found = session.find_contact_positions(base_tag);
    let contacts = ContactConfig::from(config);

    println!();
    for mapping in contact_mappings(&contacts) {
        let kind = if mapping.normally_closed { "NC" } else { "NO" };
        let positions = found.get(&mapping.suffix).map(Vec::as_slice).unwrap_or_default();
        let places: Vec<String> = positions
            .iter()
            .map(|p| format!("p{} ({:.1}, {:.1})", p.page, p.center.x, p.center.y))
            .collect();
        let places = if places.is_empty() {
            "not drawn".to_string()
        } else {
            places.join(", ")
        };
        println!("  {base_tag}{:<4} {} {kind}  {places}", mapping.suffix, mapping.pair);
    }
    println!();
    Ok(())
}

fn cmd_route(
    config: &AppConfig,
    components_path: &Path,
    wires_path: &Path,
    dpi: Option<f64>,
    zoom: f64,
    page_height: f64,
) -> Result<()> {
    let components: Vec<Component> = read_json(components_path)?;
    let wires: Vec<WireSpec> = read_json(wires_path)?;
    let routing = generate_wire_paths(&components, &wires, &RoutingConfig::from(config));

    let mut value = serde_json::to_value(&routing)?;
    if let Some(dpi) = dpi {
        let transform = PageTransform::new(page_height, dpi, zoom);
        let device: Vec<_> = routing.paths.iter().map(|p| p.to_device(&transform)).collect();
        value["device_waypoints"] = serde_json::to_value(device)?;
    }
    println!("{}", serde_json::to_string_pretty(&value)?);

    if routing.unresolved > 0 {
        eprintln!("{} of {} wires unresolved", routing.unresolved, routing.paths.len());
    }
    Ok(())
}

async fn cmd_validate(config: &AppConfig, args: &ScanArgs, ground_truth: &Path) -> Result<()> {
    let report = GroundTruthReport::load(ground_truth)?;
    let session = open_session(config, args).await?;
    let summary = session.validate(&report);

    println!();
    println!("  Expected:  {}", summary.expected);
    println!("  Found:     {}", summary.found);
    println!("  Recall:    {:.1}%", summary.recall * 100.0);
    for tag in &summary.missing {
        println!("  missing:   {tag}");
    }
    for m in &summary.count_mismatches {
        println!("  count:     {} expected {} found {}", m.tag, m.expected, m.found);
    }
    for m in &summary.page_mismatches {
        println!(
            "  pages:     {} expected [{}] found [{}]",
            m.tag,
            join(&m.expected),
            join(&m.found)
        );
    }
    println!();

    if !summary.is_clean() {
        return Err(eyre!(
            "document does not match {}",
            ground_truth.display()
        ));
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&content).wrap_err_with(|| format!("invalid JSON in {}", path.display()))
}

/// Tags from a file, one per line; blank lines and `#` comments are skipped.
fn read_tag_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read {}", path.display()))?;
    Ok(parse_tag_list(&content))
}

fn parse_tag_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

fn join(pages: &[u32]) -> String {
    pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
