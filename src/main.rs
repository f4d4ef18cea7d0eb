// src/main.rs

use anyhow::{Context, Result};
use appcenter::app::AppSummary;
use appcenter::{
    App, AppList, AppQuery, Config, PluginLoader, RefineFlags, RefineJobFlags, RefreshFlags,
};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Data requested for listed apps unless `--require` says otherwise
const DEFAULT_REQUIRE: &str = "license,url,description,version,origin-hostname,provenance,menu-path";

#[derive(Parser)]
#[command(name = "appcenter")]
#[command(author, version, about = "Query apps through the software center plugin engine", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/appcenter/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show plugins in run order and why disabled ones are off
    Plugins,
    /// Search apps matching all terms
    Search {
        #[arg(required = true)]
        terms: Vec<String>,
        /// Comma separated refine flags
        #[arg(long, default_value = DEFAULT_REQUIRE)]
        require: String,
    },
    /// Refine apps by id and print the result
    Refine {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Comma separated refine flags, e.g. icon,license,key-colors
        #[arg(long, default_value = DEFAULT_REQUIRE)]
        require: String,
    },
    /// List pending updates
    Updates {
        #[arg(long, default_value = DEFAULT_REQUIRE)]
        require: String,
    },
    /// List featured apps
    Featured {
        #[arg(long, default_value = DEFAULT_REQUIRE)]
        require: String,
    },
    /// Show the category tree
    Categories,
    /// Describe a local package file
    FileToApp {
        path: PathBuf,
        #[arg(long, default_value = DEFAULT_REQUIRE)]
        require: String,
    },
    /// Refresh plugin metadata
    Refresh {
        /// Refresh data older than this many seconds
        #[arg(long, default_value_t = 0)]
        cache_age: u64,
    },
}

fn init_logging(verbose: u8) {
    let filter = if verbose > 0 {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };
    Ok(config)
}

fn parse_require(list: &str) -> Result<RefineFlags> {
    RefineFlags::parse_list(list).with_context(|| format!("unknown refine flag in '{}'", list))
}

/// Cancel the returned token on Ctrl-C
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling");
            token.cancel();
        }
    });
    cancel
}

fn print_apps(list: &AppList, json: bool) -> Result<()> {
    let summaries: Vec<AppSummary> = list.iter().map(|app| app.summary()).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if summaries.is_empty() {
        println!("No apps found");
        return Ok(());
    }
    for app in &summaries {
        println!(
            "{}  {}  [{}]",
            app.id.as_deref().unwrap_or("(no id)"),
            app.name.as_deref().unwrap_or(""),
            app.state
        );
        if let Some(summary) = &app.summary {
            println!("    {}", summary);
        }
        for related in &app.related {
            println!("    + {}", related);
        }
    }
    Ok(())
}

fn print_events(loader: &PluginLoader) {
    for event in loader.events() {
        eprintln!(
            "warning: {} ({}){}: {}",
            event.plugin,
            event.category,
            event.app.as_deref().map(|a| format!(" on {}", a)).unwrap_or_default(),
            event.message
        );
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let mut loader = PluginLoader::new(config).context("failed to create plugin loader")?;
    let cancel = cancel_on_interrupt();
    loader.setup(&cancel).await.context("plugin setup failed")?;

    match cli.command {
        Commands::Plugins => {
            let state = loader.plugin_state();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                for plugin in state {
                    match (plugin.order, plugin.disabled_reason) {
                        (Some(order), _) => {
                            println!("{:>3}  {}  (priority {})", order, plugin.name, plugin.priority)
                        }
                        (None, reason) => println!(
                            "  -  {}  disabled: {}",
                            plugin.name,
                            reason.as_deref().unwrap_or("unknown")
                        ),
                    }
                }
            }
        }
        Commands::Search { terms, require } => {
            let list = loader.search(&terms, parse_require(&require)?, &cancel).await?;
            print_apps(&list, cli.json)?;
        }
        Commands::Refine { ids, require } => {
            let flags = parse_require(&require)?;
            let mut list = AppList::new();
            for id in &ids {
                list.add(App::wildcard(id.as_str()).shared());
            }
            let report = loader
                .refine(&mut list, flags, RefineJobFlags::INTERACTIVE, &cancel)
                .await?;
            debug!("refine ran {:?} in {:?}", report.plugins_run(), report.total_duration());
            print_apps(&list, cli.json)?;
        }
        Commands::Updates { require } => {
            let flags = parse_require(&require)? | RefineFlags::UPDATE_DETAILS;
            let query = AppQuery::new().with_for_update(true).with_refine_flags(flags);
            let list = loader.list_apps(&query, &cancel).await?;
            print_apps(&list, cli.json)?;
        }
        Commands::Featured { require } => {
            let query = AppQuery::new()
                .with_featured(true)
                .with_refine_flags(parse_require(&require)?);
            let list = loader.list_apps(&query, &cancel).await?;
            print_apps(&list, cli.json)?;
        }
        Commands::Categories => {
            let categories = loader.list_categories(&cancel).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                for category in &categories {
                    println!("{} ({})", category.name, category.id);
                    for child in &category.children {
                        println!("    {} ({})", child.name, child.id);
                    }
                }
            }
        }
        Commands::FileToApp { path, require } => {
            let list = loader
                .file_to_app(&path, parse_require(&require)?, &cancel)
                .await?;
            print_apps(&list, cli.json)?;
        }
        Commands::Refresh { cache_age } => {
            let failed = loader
                .refresh(Duration::from_secs(cache_age), RefreshFlags::METADATA, &cancel)
                .await?;
            if failed == 0 {
                println!("Refreshed");
            } else {
                println!("Refreshed with {} failed plugins", failed);
            }
        }
    }

    print_events(&loader);
    loader.shutdown(&cancel).await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let category = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<appcenter::Error>())
                .map(|err| err.category().as_str())
                .unwrap_or("failed");
            eprintln!("error ({}): {:#}", category, e);
            ExitCode::FAILURE
        }
    }
}
