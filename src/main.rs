use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use feedsync::cloud::MemoryZoneStore;
use feedsync::config::Config;
use feedsync::sidebar::{self, icon_client, FaviconLoader, IconLoader, SidebarRow};
use feedsync::storage::{Database, DatabaseError};
use feedsync::sync::{ArticlesZone, SyncSession};

/// Get the config directory path (~/.config/feedsync/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedsync"))
}

#[derive(Parser, Debug)]
#[command(name = "feedsync", about = "Feed reader article sync and sidebar tools")]
struct Args {
    /// Database file (overrides the config file)
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    /// Config file (default: ~/.config/feedsync/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the sidebar rows for every feed
    Sidebar {
        /// Row width in columns
        #[arg(long)]
        width: Option<u16>,

        /// Drop leading row padding
        #[arg(long)]
        compact: bool,
    },
    /// Print the sync records an article would be saved as
    Records {
        article_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = match args.db.clone().or_else(|| config.database_path.clone()) {
        Some(path) => path,
        None => {
            std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
            config_dir.join("feedsync.db")
        }
    };
    let db = open_database(&db_path).await?;

    match args.command {
        Command::Sidebar { width, compact } => {
            print_sidebar(&db, &config, width, compact).await?;
        }
        Command::Records { article_id } => {
            print_records(&db, &article_id).await?;
        }
    }
    Ok(())
}

async fn open_database(path: &std::path::Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: The database is locked by another process. Please close it and try again.");
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

async fn print_sidebar(
    db: &Database,
    config: &Config,
    width: Option<u16>,
    compact: bool,
) -> Result<()> {
    let items = sidebar::load_items(db)
        .await
        .context("Failed to load sidebar items")?;
    let compact = compact || config.compact_sidebar;
    let width = width.unwrap_or(config.sidebar_width) as usize;

    let client = icon_client(config.icon_timeout()).context("Failed to build HTTP client")?;
    let loader: Arc<dyn IconLoader> = Arc::new(FaviconLoader::new(
        client,
        config.icon_timeout(),
        config.icon_cache_size,
    ));

    let mut rows: Vec<SidebarRow> = items
        .into_iter()
        .map(|item| SidebarRow::new(item, compact))
        .collect();

    let (tx, mut rx) = mpsc::channel(32);
    for row in &mut rows {
        row.on_appear(loader.clone(), tx.clone());
    }
    // Channel closes once every icon task has finished
    drop(tx);
    while let Some(event) = rx.recv().await {
        for row in &mut rows {
            row.apply(&event);
        }
    }

    for row in &rows {
        println!("{}", sidebar::plain_text(&row.line(width)));
    }
    Ok(())
}

async fn print_records(db: &Database, article_id: &str) -> Result<()> {
    let article = db
        .get_article(article_id)
        .await
        .context("Failed to load article")?
        .ok_or_else(|| anyhow::anyhow!("No article with id {article_id}"))?;
    if !article.is_worth_syncing() {
        eprintln!("Note: article is read and unstarred; it would not be uploaded.");
    }

    let session = Arc::new(SyncSession::new(Arc::new(MemoryZoneStore::new())));
    session.load_feeds(db).await?;
    let zone = ArticlesZone::new(&session);
    let feed = session.web_feed(&article.web_feed_id);

    let records = vec![
        zone.make_status_record(&article.status, feed.as_ref()),
        zone.make_article_record(&article, feed.as_ref())?,
    ];
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
