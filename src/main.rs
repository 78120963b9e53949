//! # Rolodex CLI (`rdx`)
//!
//! The `rdx` binary is the primary interface for Rolodex. It provides
//! commands for database initialization, CSV import, tenant-scoped search,
//! list inspection, tool-doc generation, and starting the HTTP tool server.
//!
//! ## Usage
//!
//! ```bash
//! rdx --config ./config/rolodex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rdx init` | Create the SQLite database and run schema migrations |
//! | `rdx import <csv>` | Import a CSV file into an account's list |
//! | `rdx search "<query>"` | Search records in an account's lists |
//! | `rdx lists` | Show accounts, lists, record counts, and import recency |
//! | `rdx tool-docs` | Print the generated tool documentation for an agent |
//! | `rdx serve` | Start the HTTP tool server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! rdx init --config ./config/rolodex.toml
//!
//! # Import a roster into acme's "physicians" list, validating against
//! # schemas/provider.json
//! rdx import providers.csv --account acme --list physicians --entry-type provider
//!
//! # Substring search (the default mode)
//! rdx search "chen" --account acme --lists physicians
//!
//! # Ranked full-text search with a field filter
//! rdx search "cardiology" --mode fts --account acme --lists physicians \
//!     --filter specialty=Cardiology
//!
//! # Docs for an agent prompt
//! rdx tool-docs --agent front-desk
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rolodex::import::{run_import, ImportArgs};
use rolodex::search::{run_search, SearchArgs};
use rolodex::{config, migrate, server, stats, tooldocs};

/// Rolodex CLI — a multi-tenant directory engine with schema-validated CSV
/// import, scoped search, and generated tool docs for AI agents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rolodex.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rdx",
    about = "Rolodex — a multi-tenant directory engine with CSV import, scoped search, and agent tool docs",
    version,
    long_about = "Rolodex ingests CSV exports into accounts' named lists through per-type field \
    mappers and schema validation, serves exact, substring, and ranked full-text search scoped \
    to what each account owns, and generates tool documentation for AI agents."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rolodex.toml`. Database path, schema directory,
    /// search defaults, server bind address, and agent grants are read from
    /// this file.
    #[arg(long, global = true, default_value = "./config/rolodex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (accounts,
    /// lists, records, records_fts plus its sync triggers). This command is
    /// idempotent — running it multiple times is safe.
    Init,

    /// Import a CSV file into an account's list.
    ///
    /// Streams rows through the entry type's field mapper, validates them
    /// against the schema, and replaces the list's records in one write
    /// transaction. Rows that fail mapping or validation are logged and
    /// skipped; the rest still import.
    Import {
        /// Path to the CSV file.
        csv: PathBuf,

        /// Account (tenant) that owns the list.
        #[arg(long)]
        account: String,

        /// List name. Created on first import; later imports replace its
        /// records wholesale.
        #[arg(long)]
        list: String,

        /// Entry type: selects the field mapper and the default schema file.
        /// One of `provider`, `product`, `service`.
        #[arg(long)]
        entry_type: String,

        /// Schema file override (defaults to `<schemas.dir>/<entry-type>.json`).
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Skip schema validation entirely, keeping rows that would
        /// otherwise be dropped.
        #[arg(long)]
        no_validate: bool,

        /// Parse and report counts without writing to the database.
        #[arg(long)]
        dry_run: bool,

        /// Field delimiter: a single character or `tab`. Defaults to `,`.
        #[arg(long)]
        delimiter: Option<String>,
    },

    /// Search records in an account's lists.
    ///
    /// Only lists owned by the account are searched; requested names the
    /// account does not own are ignored. All given predicates (name query,
    /// tags, field filters) must hold at once.
    Search {
        /// Name query. Optional when `--tag` or `--filter` are given.
        query: Option<String>,

        /// Account (tenant) whose lists are searched.
        #[arg(long)]
        account: String,

        /// List names to search, comma-separated.
        #[arg(long, value_delimiter = ',')]
        lists: Vec<String>,

        /// Name matching mode: `exact` (case-sensitive equality),
        /// `substring` (case-insensitive containment), or `fts` (ranked
        /// full-text over names and entry data).
        #[arg(long, default_value = "substring")]
        mode: String,

        /// Require a tag (repeatable; every given tag must be present).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Require an entry-data field value, as `field=value` (repeatable).
        /// Values match under every typed reading: `--filter sku=00451`
        /// finds the stored string "00451" as well as the number 451.
        #[arg(long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,

        /// Maximum number of results, at least 1 (defaults to
        /// `search.default_limit`).
        #[arg(long, allow_negative_numbers = true,
              value_parser = clap::value_parser!(i64).range(1..))]
        limit: Option<i64>,

        /// Print results as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show lists with record counts and import recency.
    Lists {
        /// Only show lists owned by this account.
        #[arg(long)]
        account: Option<String>,
    },

    /// Print the generated tool documentation for an agent.
    ///
    /// Resolves the agent's account and list grants from config, then
    /// documents each accessible list: record count, tag vocabulary, and
    /// filterable schema fields with example invocations.
    ToolDocs {
        /// Agent name, as configured under `[agents.<name>]`.
        #[arg(long)]
        agent: String,

        /// Print the structured form as JSON instead of rendered text.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP tool server.
    ///
    /// Exposes search, tool_docs, and lists as agent-callable tools via a
    /// JSON API. Binds to the address configured in `[server].bind`.
    Serve,
}

/// Parse a `key=value` pair for `--filter` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Route log output to stderr so command output stays machine-readable.
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rolodex=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import {
            csv,
            account,
            list,
            entry_type,
            schema,
            no_validate,
            dry_run,
            delimiter,
        } => {
            let args = ImportArgs {
                csv_path: csv,
                account,
                list,
                entry_type,
                schema,
                no_validate,
                dry_run,
                delimiter,
            };
            run_import(&cfg, &args).await?;
        }
        Commands::Search {
            query,
            account,
            lists,
            mode,
            tags,
            filters,
            limit,
            json,
        } => {
            let args = SearchArgs {
                query,
                account,
                lists,
                mode,
                tags,
                filters,
                limit,
                json,
            };
            run_search(&cfg, &args).await?;
        }
        Commands::Lists { account } => {
            stats::run_lists(&cfg, account.as_deref()).await?;
        }
        Commands::ToolDocs { agent, json } => {
            tooldocs::run_tool_docs(&cfg, &agent, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
