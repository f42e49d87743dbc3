use crate::assets::AssetManager;
use crate::cli::{AssetsArgs, AssetsCommands};
use crate::error::Result;
use std::path::PathBuf;
use tracing::info;

pub async fn run(args: AssetsArgs) -> Result<()> {
    match args.command {
        AssetsCommands::Path => {
            handle_path()?;
        }
        AssetsCommands::SetPath { path } => {
            handle_set_path(path)?;
        }
        AssetsCommands::ResetPath => {
            handle_reset_path()?;
        }
    }
    Ok(())
}

fn handle_path() -> Result<()> {
    let manager = AssetManager::new()?;
    let path = manager.asset_path();
    println!("{}", path.display());
    if !path.is_dir() {
        println!("(directory does not exist yet; auxiliary files will be placeholders)");
    }
    Ok(())
}

fn handle_set_path(path: PathBuf) -> Result<()> {
    let stored = AssetManager::set_custom_path(&path)?;
    info!("Asset path set to {:?}", &stored);
    println!("✓ Asset path set to: {}", stored.display());
    Ok(())
}

fn handle_reset_path() -> Result<()> {
    AssetManager::reset_path()?;
    let manager = AssetManager::new()?;
    println!(
        "✓ Asset path reset to default: {}",
        manager.asset_path().display()
    );
    Ok(())
}
