//! Sightline CLI - view-backed search over encrypted fields

use clap::{Parser, Subcommand};
use sightline_core::domain::search::{SearchEngine, SearchRequest};
use sightline_core::domain::view::SortOrder;
use sightline_core::infrastructure::crypto::{AesFieldCipher, SearchKey};
use sightline_core::infrastructure::executor::SqliteExecutor;
use sightline_core::storage::{Database, DatabaseConfig};
use std::sync::Arc;
use tracing::warn;

mod config;
mod demo;

use config::CliConfig;
use demo::CustomerSearchView;

#[derive(Parser)]
#[command(name = "sightline")]
#[command(author, version, about = "View-backed search over encrypted fields", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the demo customer view
    Search {
        /// Free-text filter matched against filterable fields
        #[arg(short, long)]
        filter: Option<String>,

        /// Named bound as name=value (repeatable)
        #[arg(short, long = "bound", value_name = "NAME=VALUE")]
        bound: Vec<String>,

        /// Field to sort by (defaults to the view's own ordering)
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort direction (asc or desc)
        #[arg(long, default_value = "asc")]
        order: String,

        /// Rows to skip before the returned page
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page size, at least 1
        #[arg(long, default_value_t = 10, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        size: usize,
    },

    /// Demo data management
    Demo {
        #[command(subcommand)]
        action: DemoAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum DemoAction {
    /// Create the demo schema and seed it with encrypted customers
    Seed {
        /// Number of customers to seed
        #[arg(short, long, default_value_t = 25)]
        count: usize,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sightline=info".parse()?)
                .add_directive("sightline_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            filter,
            bound,
            sort,
            order,
            offset,
            size,
        } => {
            cmd_search(
                filter.as_deref(),
                &bound,
                sort.as_deref(),
                &order,
                offset,
                size,
                cli.format,
                cli.quiet,
            )
            .await
        }

        Commands::Demo { action } => match action {
            DemoAction::Seed { count } => cmd_demo_seed(count, cli.quiet).await,
        },

        Commands::Config { action } => cmd_config(action, cli.quiet),

        Commands::Doctor => cmd_doctor(cli.quiet).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn open_database(config: &CliConfig) -> anyhow::Result<Database> {
    Database::new(DatabaseConfig::with_path(config.database_path())).await
}

fn require_key(config: &CliConfig) -> anyhow::Result<SearchKey> {
    config.resolved_key()?.ok_or_else(|| {
        anyhow::anyhow!(
            "No search key configured. Set the SIGHTLINE_KEY environment variable \
             (run `sightline demo seed` to generate one)."
        )
    })
}

#[allow(clippy::too_many_arguments)]
async fn cmd_search(
    filter: Option<&str>,
    bounds: &[String],
    sort: Option<&str>,
    order: &str,
    offset: usize,
    size: usize,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = CliConfig::load()?;
    let key = require_key(&config)?;

    let sort_order = SortOrder::from_str(order)
        .ok_or_else(|| anyhow::anyhow!("Invalid sort order '{}': use asc or desc", order))?;

    let mut request = SearchRequest::new().with_page(offset, size);
    if let Some(filter) = filter {
        request = request.with_filter(filter);
    }
    if let Some(field) = sort {
        request = request.with_sort(field, sort_order);
    }
    for bound in bounds {
        let (name, value) = bound
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid bound '{}': expected name=value", bound))?;
        request = request.with_bound(name, value);
    }

    let db = open_database(&config).await?;
    let engine = SearchEngine::new(
        Arc::new(SqliteExecutor::from_database(&db)),
        Arc::new(AesFieldCipher::new(key)),
    )
    .with_config(config.search_config());

    let view = CustomerSearchView::new();
    let results = match engine.search(&view, &request).await {
        Ok(results) => results,
        Err(e) => {
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "Showing {} of {} matching customers:",
                    results.results.len(),
                    results.total_count
                );
            }
            for record in &results.results {
                println!("{}", demo::render_line(record));
            }
        }
    }

    Ok(())
}

async fn cmd_demo_seed(count: usize, quiet: bool) -> anyhow::Result<()> {
    let config = CliConfig::load()?;

    let (key, generated) = match config.resolved_key()? {
        Some(key) => (key, false),
        None => (SearchKey::generate(), true),
    };
    let cipher = AesFieldCipher::new(key.clone());

    let db = open_database(&config).await?;
    demo::create_schema(db.pool()).await?;
    demo::seed(db.pool(), &cipher, count).await?;

    if !quiet {
        println!("Seeded {} customers into {}", count, db.path().display());
        if generated {
            println!();
            println!("A new search key was generated for this data set.");
            println!("Export it before searching:");
            println!("  export SIGHTLINE_KEY={}", key.to_hex());
        } else {
            println!("Values encrypted with the key from SIGHTLINE_KEY.");
        }
    }

    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = CliConfig::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = CliConfig::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = CliConfig::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            CliConfig::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = CliConfig::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Sightline Health Check");
        println!("======================");
        println!();
    }

    let mut all_ok = true;

    // Check configuration
    let config = match CliConfig::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            Some(config)
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
            None
        }
    };

    // Check search key
    if let Some(config) = &config {
        match config.redacted_key() {
            Ok(Some(redacted)) => {
                if !quiet {
                    println!("[OK] Search key: Configured ({})", redacted);
                }
            }
            Ok(None) => {
                all_ok = false;
                if !quiet {
                    warn!("search key not configured");
                    println!("[!!] Search key: Not configured");
                    println!("     Set the SIGHTLINE_KEY environment variable");
                }
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Search key: Error - {}", e);
                }
            }
        }
    }

    // Check config file location
    if !quiet {
        match CliConfig::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => {
                println!("[!!] Config file: Error - {}", e);
            }
        }
    }

    // Check database and demo view
    if !quiet {
        let config = config.unwrap_or_default();
        match open_database(&config).await {
            Ok(db) => match db.health_check().await {
                Ok(()) => {
                    println!("[OK] Database: Connected");
                    println!("     Path: {}", db.path().display());

                    match demo::view_row_count(db.pool()).await {
                        Ok(Some(count)) => {
                            println!("[OK] Demo view: {} rows", count);
                        }
                        Ok(None) => {
                            println!("[--] Demo view: Not seeded (run `sightline demo seed`)");
                        }
                        Err(e) => {
                            println!("[!!] Demo view: Error - {}", e);
                        }
                    }
                }
                Err(e) => {
                    all_ok = false;
                    println!("[!!] Database: Health check failed - {}", e);
                }
            },
            Err(e) => {
                all_ok = false;
                println!("[!!] Database: Failed to open - {}", e);
            }
        }
    }

    // Summary
    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
