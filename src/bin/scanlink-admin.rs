use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scanlink::analytics::StatsAggregator;
use scanlink::config::{Config, DatabaseBackend};
use scanlink::error::ServiceError;
use scanlink::links::LinkService;
use scanlink::models::{format_timestamp, CreateLinkRequest};
use scanlink::render::PngQrRenderer;
use scanlink::storage;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "scanlink-admin")]
#[command(about = "Scanlink link management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all links, newest first
    List,
    /// Create a link and print its short URL
    Create {
        /// URL or free text to encode
        content: String,
        /// Foreground color (name or #rrggbb)
        #[arg(long)]
        color: Option<String>,
        /// Background color (name or #rrggbb)
        #[arg(long)]
        bg_color: Option<String>,
        #[arg(long)]
        box_size: Option<u32>,
        #[arg(long)]
        border: Option<u32>,
    },
    /// Delete a link and its scan history
    Delete { id: String },
    /// Show scan statistics for a link
    Stats { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if config.database.backend == DatabaseBackend::Memory {
        eprintln!("⚠ DATABASE_BACKEND=memory: changes made here are not visible to the server");
    }

    let storage = storage::connect(&config.database, &config.cache)
        .await
        .context("Failed to open the configured database")?;
    let links = LinkService::new(
        Arc::clone(&storage),
        Arc::new(PngQrRenderer),
        config.allocation.clone(),
        config.domains.clone(),
    );

    match cli.command {
        Commands::List => {
            let all = links.list().await?;
            if all.is_empty() {
                println!("No links found.");
            } else {
                println!("{:<34} {:<6} {:<26} {}", "ID", "Type", "Created", "Content");
                println!("{}", "-".repeat(100));
                for link in all {
                    println!(
                        "{:<34} {:<6} {:<26} {}",
                        link.id,
                        link.content_kind.as_str(),
                        format_timestamp(&link.created_at),
                        link.original_content
                    );
                }
            }
        }
        Commands::Create {
            content,
            color,
            bg_color,
            box_size,
            border,
        } => {
            let created = links
                .create(&CreateLinkRequest {
                    url: content,
                    color,
                    bg_color,
                    box_size,
                    border,
                })
                .await?;
            println!("✓ Created '{}' -> {}", created.link.id, created.short_url);
        }
        Commands::Delete { id } => match links.delete(&id).await {
            Ok(()) => println!("✓ Deleted '{}'", id),
            Err(ServiceError::NotFound) => println!("⚠ Link '{}' does not exist", id),
            Err(e) => return Err(e.into()),
        },
        Commands::Stats { id } => {
            let stats = StatsAggregator::new(storage).stats(&id).await?;
            println!("Total scans: {}", stats.total);
            println!(
                "Devices: mobile {}, desktop {}, unknown {}",
                stats.devices.mobile, stats.devices.desktop, stats.devices.unknown
            );
            println!("By date:");
            for (day, count) in &stats.by_date {
                println!("  {:<12} {}", day, count);
            }
            println!("Locations:");
            for (country, count) in &stats.locations {
                println!("  {:<12} {}", country, count);
            }
        }
    }

    Ok(())
}
