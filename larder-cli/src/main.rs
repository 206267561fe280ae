/*!
Larder CLI - inspect and maintain a larder store file.

The store file normally belongs to the desktop application; this tool opens
it with the same fixed credentials to list what it holds and to remove
workspaces.
*/

use anyhow::Context;
use clap::{Parser, Subcommand};
use larder_core::{
    observability, open_store, RequestAspect, StorageBackend, StoreConfig, WorkbenchStore,
};
use std::io::{self, Write};
use tabled::{Table, Tabled};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "CLI for larder workbench store files")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Store file (or mem://name for a throwaway in-memory store)
    #[arg(short, long, global = true, env = "LARDER_STORE", default_value = "database.db")]
    store: String,

    /// Write the store file without compression when it is rewritten
    #[arg(long, global = true)]
    no_compression: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the store header
    Info,
    /// List stored workspaces
    Workspaces,
    /// Show the open requests of a workspace
    Show {
        /// Workspace name
        name: String,
    },
    /// Delete every workspace with the given name
    Delete {
        /// Workspace name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// List application options
    Options,
    /// Show the workbench state, creating it if absent
    Workbench,
}

#[derive(Tabled)]
struct WorkspaceRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Name")]
    name: String,
}

#[derive(Tabled)]
struct RequestRow {
    #[tabled(rename = "Active")]
    active: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Aspects")]
    aspects: String,
}

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "larder_core=debug,larder=debug"
    } else {
        "larder_core=warn,larder=info"
    };
    observability::init_with_filter(false, filter)?;

    let config = create_store_config(&cli)?;
    if config.backend == StorageBackend::Local
        && !config.path.exists()
        && !matches!(cli.command, Commands::Workbench)
    {
        println!("No store found at: {}", config.path.display());
        return Ok(());
    }

    let store = open_store(&config)
        .with_context(|| format!("Failed to open store at {}", config.location()))?;

    let result = match &cli.command {
        Commands::Info => show_info(&store, &config),
        Commands::Workspaces => list_workspaces(&store),
        Commands::Show { name } => show_workspace(&store, name),
        Commands::Delete { name, force } => delete_workspace(&store, name, *force),
        Commands::Options => list_options(&store),
        Commands::Workbench => show_workbench(&store),
    };

    store.close()?;
    result
}

fn create_store_config(cli: &Cli) -> Result<StoreConfig, anyhow::Error> {
    let config = StoreConfig::from_uri(&cli.store)?;
    let config = if cli.no_compression {
        config.without_compression()
    } else {
        config
    };
    config.validate()?;
    Ok(config)
}

fn show_info(store: &WorkbenchStore, config: &StoreConfig) -> Result<(), anyhow::Error> {
    let header = store.database().header()?;

    println!("Store Details:");
    println!("  Location: {}", config.location());
    println!("  Store ID: {}", header.store_id);
    println!("  Format Version: {}", header.format_version);
    println!("  Compression: {}", header.compression_algorithm);
    println!("  Documents: {}", header.document_count);
    if config.backend == StorageBackend::Local {
        let size = std::fs::metadata(&config.path)
            .map(|meta| format_size(meta.len()))
            .unwrap_or_else(|_| "Unknown".to_string());
        println!("  Size: {size}");
    }
    println!("  Created: {}", format_timestamp(header.created_at.timestamp()));
    println!("  Saved: {}", format_timestamp(header.saved_at.timestamp()));
    println!("  Content Hash: {}", header.content_hash);

    for collection in store.database().collection_names()? {
        println!(
            "  Collection '{collection}': {} documents",
            store.database().count(&collection)?
        );
    }
    Ok(())
}

fn list_workspaces(store: &WorkbenchStore) -> Result<(), anyhow::Error> {
    let rows: Vec<WorkspaceRow> = store
        .list_workspace_names()?
        .into_iter()
        .enumerate()
        .map(|(position, name)| WorkspaceRow { position, name })
        .collect();

    if rows.is_empty() {
        println!("No workspaces found");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

fn show_workspace(store: &WorkbenchStore, name: &str) -> Result<(), anyhow::Error> {
    info!("Showing workspace: {}", name);

    let Some(workspace) = store.load_workspace_by_name(name)? else {
        println!("No workspace named '{name}'");
        return Ok(());
    };

    println!("Workspace Details:");
    println!("  ID: {}", workspace.id);
    println!("  Name: {}", workspace.name);
    println!("  Open Requests: {}", workspace.open_requests.len());

    let rows: Vec<RequestRow> = workspace
        .open_requests
        .iter()
        .map(|handle| {
            let active = workspace
                .active_request
                .as_ref()
                .map_or(false, |active| active.ptr_eq(handle));
            let request = handle.borrow();
            RequestRow {
                active: if active { "*" } else { "" },
                id: request.id.clone(),
                name: request.name.clone(),
                aspects: describe_aspects(&request.aspects),
            }
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }

    if let Some(active) = &workspace.active_request {
        if !workspace.open_requests.iter().any(|r| r.ptr_eq(active)) {
            println!("  Active request '{}' is not among the open requests", active.id());
        }
    }
    Ok(())
}

fn delete_workspace(store: &WorkbenchStore, name: &str, force: bool) -> Result<(), anyhow::Error> {
    if !force {
        print!("Are you sure you want to delete workspace '{name}'? (y/N): ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().to_lowercase().starts_with('y') {
            println!("Deletion cancelled");
            return Ok(());
        }
    }

    match store.delete_workspace(name) {
        Ok(true) => println!("✓ Workspace deleted successfully"),
        Ok(false) => println!("No workspace named '{name}'"),
        Err(e) => {
            error!("✗ Failed to delete workspace: {}", e);
            return Err(e.into());
        }
    }
    Ok(())
}

fn list_options(store: &WorkbenchStore) -> Result<(), anyhow::Error> {
    let rows: Vec<OptionRow> = store
        .load_options()?
        .into_iter()
        .map(|entry| OptionRow {
            id: entry.id,
            name: entry.name,
            value: entry.value.to_string(),
        })
        .collect();

    if rows.is_empty() {
        println!("No options found");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

fn show_workbench(store: &WorkbenchStore) -> Result<(), anyhow::Error> {
    let state = store.load_workbench_state()?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn describe_aspects(aspects: &[RequestAspect]) -> String {
    aspects
        .iter()
        .map(RequestAspect::discriminator)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

fn format_timestamp(timestamp: i64) -> String {
    use chrono::{Local, TimeZone};

    match Local.timestamp_opt(timestamp, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::{BodyAspect, HeaderAspect};

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_describe_aspects() {
        let aspects = vec![
            RequestAspect::Headers(HeaderAspect::default()),
            RequestAspect::Body(BodyAspect::default()),
            RequestAspect::Unknown,
        ];
        assert_eq!(describe_aspects(&aspects), "headers, body, unknown");
    }

    #[test]
    fn test_store_config_from_flags() {
        let cli = Cli::parse_from(["larder", "--store", "mem://scratch", "--no-compression", "info"]);
        let config = create_store_config(&cli).unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.compression_level, None);
        assert_eq!(config.location(), "scratch");
    }
}
