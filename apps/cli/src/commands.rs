//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sunbird_core::{ArtifactsPayload, ContentService, ToolResponse, UrlsPayload};
use sunbird_resolver::ProgressReporter;
use sunbird_search::{FilterValue, SearchParams};
use sunbird_shared::{
    AppConfig, Deployment, LeafItem, init_config, load_config, load_config_from,
};
use tracing::info;

use crate::mcp::{SunbirdMcp, serve_stdio};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Sunbird: resolve educational content into downloadable artifacts.
#[derive(Parser)]
#[command(
    name = "sunbird",
    version,
    about = "Resolve Sunbird/DIKSHA content into downloadable artifacts, search the catalogue, and serve both over MCP.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.sunbird/sunbird.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Deployment preset: diksha or sandbox.
    #[arg(long, env = "SUNBIRD_DEPLOYMENT", global = true)]
    pub deployment: Option<Deployment>,

    /// Base URL of the content service.
    #[arg(long, env = "SUNBIRD_API_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "SUNBIRD_REQUEST_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Maximum metadata fetches in flight while resolving.
    #[arg(long, env = "SUNBIRD_CONCURRENCY", global = true)]
    pub concurrency: Option<u32>,

    /// JSON object replacing the search filter allow-list.
    #[arg(long, env = "SUNBIRD_CONTENT_FILTERS_JSON", global = true, hide_env_values = true)]
    pub filters_json: Option<String>,

    /// Check search filters and fields against the allow-lists.
    #[arg(long, env = "SUNBIRD_ENABLE_VALIDATION", global = true)]
    pub enable_validation: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Resolve a content identifier into its downloadable artifacts.
    Resolve {
        /// Content identifier, e.g. do_31400742839137075217260.
        content_id: String,

        /// Print only the artifact URLs.
        #[arg(long)]
        urls_only: bool,

        /// Print the JSON payload instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Search the content catalogue.
    Search {
        /// Free-text query.
        #[arg(short, long)]
        query: Option<String>,

        /// Filter as key=value (repeatable; repeated keys accumulate values).
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Maximum results to return.
        #[arg(long)]
        limit: Option<i64>,

        /// Number of results to skip.
        #[arg(long)]
        offset: Option<i64>,

        /// Sort order as field:asc or field:desc.
        #[arg(long, value_name = "FIELD:DIR")]
        sort: Option<String>,

        /// Print the JSON payload instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// MCP server operations.
    #[command(name = "mcp")]
    Mcp {
        /// Subcommand for MCP operations.
        #[command(subcommand)]
        action: McpAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// MCP server subcommands.
#[derive(Subcommand)]
pub(crate) enum McpAction {
    /// Start the MCP server on stdio.
    Serve,
    /// Print MCP client configuration snippets.
    Config {
        /// Target client: vscode, claude-desktop, or cursor.
        #[arg(long, default_value = "vscode")]
        target: String,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// free for command output and the MCP stdio transport.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sunbird=info",
        1 => "sunbird=debug",
        _ => "sunbird=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
// Configuration layering
// ---------------------------------------------------------------------------

/// Config file, then deployment preset, then individual flag/env overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    apply_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(deployment) = cli.deployment {
        config.apply_deployment(deployment);
    }
    if let Some(base_url) = &cli.base_url {
        config.upstream.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = cli.timeout {
        config.upstream.timeout_secs = secs;
        config.resolver.fetch_timeout_secs = secs;
    }
    if let Some(concurrency) = cli.concurrency {
        config.resolver.concurrency = concurrency;
    }
    if let Some(json) = &cli.filters_json {
        config.apply_filters_json(json);
    }
    if let Some(enabled) = cli.enable_validation {
        config.search.enable_validation = enabled;
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Resolve {
            content_id,
            urls_only,
            json,
        } => cmd_resolve(&cli, content_id, *urls_only, *json).await,
        Command::Search {
            query,
            filters,
            limit,
            offset,
            sort,
            json,
        } => {
            let params = SearchParams {
                query: query.clone(),
                filters: parse_filters(filters)?,
                limit: *limit,
                offset: *offset,
                sort_by: sort.as_deref().map(parse_sort).transpose()?.unwrap_or_default(),
                fields: Vec::new(),
            };
            cmd_search(&cli, &params, *json).await
        }
        Command::Mcp { action } => match action {
            McpAction::Serve => cmd_mcp_serve(&cli).await,
            McpAction::Config { target } => cmd_mcp_config(&cli, target),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&cli),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_resolve(cli: &Cli, content_id: &str, urls_only: bool, json: bool) -> Result<()> {
    let config = resolve_config(cli)?;

    info!(
        content_id,
        base_url = %config.upstream.base_url,
        concurrency = config.resolver.concurrency,
        "resolving content"
    );

    let progress = (!json).then(|| Arc::new(CliProgress::new()));
    let mut service = ContentService::new(&config)?;
    if let Some(progress) = &progress {
        service = service.with_progress(progress.clone());
    }

    let result = service.resolve(content_id, None).await;
    if let Some(progress) = &progress {
        progress.finish();
    }
    let resolution = result?;

    let elapsed = resolution.elapsed;
    let nodes = resolution.nodes_visited;
    let skipped = resolution.diagnostics.len();
    let payload = ArtifactsPayload::new(resolution.items);

    if json {
        let text = if urls_only {
            ToolResponse::Ok(UrlsPayload::from(payload)).to_json()
        } else {
            ToolResponse::Ok(payload).to_json()
        };
        println!("{text}");
        return Ok(());
    }

    if urls_only {
        for url in UrlsPayload::from(payload).artifact_urls {
            println!("{url}");
        }
        return Ok(());
    }

    println!();
    for item in &payload.artifacts {
        print_item(item);
    }
    println!("  {}", payload.message);
    println!("  Artifacts: {}", payload.count);
    println!("  Nodes:     {nodes}");
    if skipped > 0 {
        println!("  Skipped:   {skipped} (see log)");
    }
    println!("  Time:      {:.1}s", elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn print_item(item: &LeafItem) {
    println!("  {} ({})", item.name, item.identifier);
    if !item.subjects.is_empty() {
        println!("    Subjects: {}", item.subjects.join(", "));
    }
    if !item.grade_levels.is_empty() {
        println!("    Grades:   {}", item.grade_levels.join(", "));
    }
    if let Some(url) = &item.artifact_url {
        println!("    URL:      {url}");
    }
}

async fn cmd_search(cli: &Cli, params: &SearchParams, json: bool) -> Result<()> {
    let config = resolve_config(cli)?;
    let service = ContentService::new(&config)?;

    let payload = match service.search(params).await {
        Ok(payload) => payload,
        Err(e) if !e.details().is_empty() => {
            for detail in e.details() {
                eprintln!("  - {detail}");
            }
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", ToolResponse::Ok(payload).to_json());
        return Ok(());
    }

    println!();
    for (i, book) in payload.books.iter().enumerate() {
        println!("  {:>3}. {} ({})", i + 1, book.name, book.identifier);
        let tags: Vec<&str> = book
            .se_boards
            .iter()
            .chain(&book.se_grade_levels)
            .chain(&book.se_subjects)
            .chain(&book.se_mediums)
            .map(String::as_str)
            .collect();
        if !tags.is_empty() {
            println!("       {}", tags.join(" | "));
        }
    }
    println!();
    println!("  Showing {} of {} results", payload.books.len(), payload.count);
    println!();

    Ok(())
}

async fn cmd_mcp_serve(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let service = Arc::new(ContentService::new(&config)?);

    info!(
        deployment = %config.deployment,
        base_url = %config.upstream.base_url,
        "MCP server configured"
    );

    serve_stdio(SunbirdMcp::new(service, None)).await
}

fn cmd_mcp_config(cli: &Cli, target: &str) -> Result<()> {
    let command = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "sunbird".to_string());

    let mut args = Vec::new();
    if let Some(deployment) = cli.deployment {
        args.push("--deployment".to_string());
        args.push(deployment.to_string());
    }
    args.push("mcp".to_string());
    args.push("serve".to_string());

    let (label, config) = mcp_client_config(target, &command, &args)?;
    println!("{label}");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Client config snippet for `target`, with a comment naming the file it belongs in.
fn mcp_client_config(
    target: &str,
    command: &str,
    args: &[String],
) -> Result<(&'static str, serde_json::Value)> {
    match target {
        "vscode" => Ok((
            "// .vscode/mcp.json",
            serde_json::json!({
                "servers": {
                    "sunbird": {
                        "type": "stdio",
                        "command": command,
                        "args": args,
                    }
                }
            }),
        )),
        "claude-desktop" | "cursor" => Ok((
            if target == "cursor" {
                "// Cursor MCP settings"
            } else {
                "// claude_desktop_config.json"
            },
            serde_json::json!({
                "mcpServers": {
                    "sunbird": {
                        "command": command,
                        "args": args,
                    }
                }
            }),
        )),
        _ => Err(eyre!(
            "unknown config target '{target}': expected 'vscode', 'claude-desktop', or 'cursor'"
        )),
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Argument parsing helpers
// ---------------------------------------------------------------------------

/// `["se_boards=CBSE", "se_mediums=English", "se_mediums=Hindi"]` into a
/// filter map; repeated keys become lists.
fn parse_filters(raw: &[String]) -> Result<BTreeMap<String, FilterValue>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in raw {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| eyre!("invalid filter '{entry}': expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(eyre!("invalid filter '{entry}': empty key"));
        }
        grouped
            .entry(key.to_string())
            .or_default()
            .push(value.trim().to_string());
    }

    Ok(grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                FilterValue::One(values.remove(0))
            } else {
                FilterValue::Many(values)
            };
            (key, value)
        })
        .collect())
}

/// `lastPublishedOn:desc` into a one-entry sort map. A bare field sorts descending.
fn parse_sort(raw: &str) -> Result<BTreeMap<String, String>> {
    let (field, direction) = raw.split_once(':').unwrap_or((raw, "desc"));
    if field.trim().is_empty() {
        return Err(eyre!("invalid sort '{raw}': expected FIELD:asc or FIELD:desc"));
    }
    Ok(BTreeMap::from([(
        field.trim().to_string(),
        direction.trim().to_string(),
    )]))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner showing traversal progress on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.set_message("Resolving content");
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn node_fetched(&self, content_id: &str, fetched: usize) {
        self.spinner
            .set_message(format!("Fetched [{fetched}] {content_id}"));
    }

    fn artifact_found(&self, item: &LeafItem, found: usize) {
        self.spinner
            .set_message(format!("Found [{found}] {}", item.name));
    }
}
