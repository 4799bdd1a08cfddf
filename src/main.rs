//! Codeschool CLI - site server, LMS API and content tooling

use clap::{Parser, Subcommand};
use codeschool::chat::ChatEngine;
use codeschool::config::{self, SiteConfig};
use codeschool::lms::{FixtureLoader, LmsStore};
use codeschool::ui::{self, Icons};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "codeschool")]
#[command(version)]
#[command(about = "Backend for the coding school website and learning platform")]
#[command(long_about = r#"
Runs the school's public site and its learning platform:
  • Static site with a CRM lead relay and a chat widget endpoint
  • LMS API: courses, quizzes, XP, parent accounts, coupons and payment links
  • Fixture loading for LMS content

Example usage:
  codeschool init
  codeschool serve
  codeschool lms load --fixtures ./content
  codeschool lms serve
  codeschool chat "כמה עולה קורס מיינקראפט?"
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the static site, lead relay and chat endpoint
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory with the built site (overrides config)
        #[arg(long)]
        content_root: Option<PathBuf>,
    },

    /// Learning platform commands
    Lms {
        #[command(subcommand)]
        command: LmsCommands,
    },

    /// Answer one chat message using the rule table
    Chat {
        /// The visitor's message
        message: String,

        /// TOML rule file (defaults to the built-in rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum LmsCommands {
    /// Serve the LMS API
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file (overrides config)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Load fixture JSON files into the database
    Load {
        /// Directory holding courses.json, lessons.json, ...
        #[arg(short, long)]
        fixtures: PathBuf,

        /// Path to the database file (overrides config)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show row counts per table
    Stats {
        /// Path to the database file (overrides config)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let result = run(cli).await;
    if let Err(e) = &result {
        ui::error(&format!("{:#}", e));
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => run_init(config_path, force),
        Commands::Chat { message, rules } => {
            let config = config::resolve_config(config_path)?;
            run_chat(&config, &message, rules.as_deref())
        }
        Commands::Serve { port, content_root } => {
            let mut config = config::resolve_config(config_path)?;
            if let Some(port) = port {
                config.site.port = port;
            }
            if let Some(root) = content_root {
                config.site.content_root = root;
            }
            run_serve(&config).await
        }
        Commands::Lms { command } => {
            let mut config = config::resolve_config(config_path)?;
            match command {
                LmsCommands::Serve { port, database } => {
                    if let Some(port) = port {
                        config.lms.port = port;
                    }
                    if let Some(db) = database {
                        config.lms.database = db;
                    }
                    run_lms_serve(&config).await
                }
                LmsCommands::Load { fixtures, database } => {
                    let database = database.unwrap_or(config.lms.database);
                    run_lms_load(&fixtures, &database)
                }
                LmsCommands::Stats { database } => {
                    let database = database.unwrap_or(config.lms.database);
                    run_lms_stats(&database)
                }
            }
        }
    }
}

fn run_init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config::default_config_path);
    let defaults = SiteConfig::default();
    config::write_config(&path, &defaults, force)?;

    ui::success(&format!("Wrote {}", path.display()));
    ui::status(Icons::FOLDER, "Content root", &defaults.site.content_root.display().to_string());
    ui::status(Icons::DATABASE, "LMS database", &defaults.lms.database.display().to_string());
    Ok(())
}

fn run_chat(config: &SiteConfig, message: &str, rules: Option<&Path>) -> anyhow::Result<()> {
    let rules = rules.or(config.chat.rules_file.as_deref());
    let engine = ChatEngine::load(rules)?;
    tracing::debug!("Chat engine loaded with {} rules", engine.len());

    ui::status(Icons::CHAT, "Message", message);
    ui::chat_reply(engine.respond(message));
    Ok(())
}

async fn run_serve(config: &SiteConfig) -> anyhow::Result<()> {
    let engine = ChatEngine::load(config.chat.rules_file.as_deref())?;

    ui::header("Codeschool site server");
    ui::status(Icons::FOLDER, "Content root", &config.site.content_root.display().to_string());
    ui::status(Icons::LINK, "CRM endpoint", &config.crm.endpoint);
    ui::status(Icons::GEAR, "Port", &config.site.port.to_string());
    if !config.site.content_root.is_dir() {
        ui::warn(&format!(
            "Content root {} does not exist; every static request will 404",
            config.site.content_root.display()
        ));
    }

    codeschool::server::start_server(config, engine).await
}

async fn run_lms_serve(config: &SiteConfig) -> anyhow::Result<()> {
    config::ensure_db_dir(&config.lms.database)?;
    let store = LmsStore::open(&config.lms.database)?;

    ui::header("Codeschool LMS API");
    ui::status(Icons::DATABASE, "Database", &config.lms.database.display().to_string());
    ui::status(Icons::GEAR, "Port", &config.lms.port.to_string());
    if config.payments.endpoint.trim().is_empty() {
        ui::warn("No payment gateway configured; payment links are disabled");
    }

    codeschool::server::start_lms_server(config, store).await
}

fn run_lms_load(fixtures: &Path, database: &Path) -> anyhow::Result<()> {
    config::ensure_db_dir(database)?;
    let store = LmsStore::open(database)?;

    ui::header("Loading LMS fixtures");
    ui::status(Icons::FOLDER, "Fixtures", &fixtures.display().to_string());
    ui::status(Icons::DATABASE, "Database", &database.display().to_string());

    let started = Instant::now();
    let spinner = ui::Spinner::new("Upserting rows");
    let report = FixtureLoader::new(&store).load_dir(fixtures);
    spinner.finish_and_clear();
    let report = report?;

    ui::section("Load report");
    ui::table(&ui::load_report_table(&report));
    ui::timing(started.elapsed());

    if report.total_failed() > 0 {
        ui::warn(&format!(
            "{} rows loaded, {} failed (see log for details)",
            report.total_loaded(),
            report.total_failed()
        ));
    } else {
        ui::success(&format!("{} rows loaded", report.total_loaded()));
    }
    Ok(())
}

fn run_lms_stats(database: &Path) -> anyhow::Result<()> {
    if !database.exists() {
        anyhow::bail!("database {} does not exist (run `codeschool lms load` first)", database.display());
    }
    let store = LmsStore::open(database)?;
    let stats = store.stats()?;

    ui::section(&format!("{} {}", Icons::STATS, database.display()));
    ui::table(&ui::stats_table(&stats));
    Ok(())
}
