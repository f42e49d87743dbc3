use crate::error::{CliError, Result};
use directories::ProjectDirs;
use pargamd::core::auxiliary::SearchPaths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "pargamd";
const APPLICATION: &str = "pargamd-forge";
const PATH_CONFIG_FILE: &str = "path.conf";

/// Locates the directory holding existing auxiliary files (helper scripts,
/// AMBER input decks, documentation) that generated bundles copy instead of
/// writing placeholders.
#[derive(Debug)]
pub struct AssetManager {
    base_path: PathBuf,
}

impl AssetManager {
    pub fn new() -> Result<Self> {
        let path = Self::determine_asset_path()?;
        debug!("AssetManager initialized with path: {:?}", &path);
        Ok(Self { base_path: path })
    }

    pub fn with_custom_path(path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: path.into(),
        }
    }

    pub fn asset_path(&self) -> &Path {
        &self.base_path
    }

    /// Fallback lookup order: explicit directories first, then `cwd`, then the
    /// asset directory.
    pub fn search_paths(&self, extra: &[PathBuf], cwd: Option<PathBuf>) -> SearchPaths {
        let mut paths = SearchPaths::new(extra.iter().cloned());
        if let Some(cwd) = cwd {
            paths.push(cwd);
        }
        paths.push(self.base_path.clone());
        paths
    }

    pub fn set_custom_path(path: &Path) -> Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let text = absolute.to_str().ok_or_else(|| {
            CliError::Assets(format!("Path {:?} is not valid UTF-8.", absolute))
        })?;

        let config_path = Self::path_config_file()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(config_path, text)?;
        Ok(absolute)
    }

    pub fn reset_path() -> Result<()> {
        if let Ok(config_path) = Self::path_config_file() {
            if config_path.exists() {
                fs::remove_file(config_path)?;
            }
        }
        Ok(())
    }

    fn determine_asset_path() -> Result<PathBuf> {
        match Self::path_config_file() {
            Ok(config_path) if config_path.exists() => match Self::read_path_config(&config_path)? {
                Some(path) => Ok(path),
                None => {
                    warn!("Custom path config file is empty, falling back to default path.");
                    Self::default_asset_path()
                }
            },
            _ => Self::default_asset_path(),
        }
    }

    fn read_path_config(config_path: &Path) -> Result<Option<PathBuf>> {
        let content = fs::read_to_string(config_path)?;
        let trimmed = content.trim();
        Ok((!trimmed.is_empty()).then(|| PathBuf::from(trimmed)))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or_else(|| {
            CliError::Assets("Could not determine the home directory.".to_string())
        })
    }

    fn path_config_file() -> Result<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(PATH_CONFIG_FILE))
    }

    fn default_asset_path() -> Result<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().join("assets"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pargamd::core::auxiliary::FallbackSource;
    use tempfile::tempdir;

    #[test]
    fn search_order_is_extra_then_cwd_then_assets() {
        let manager = AssetManager::with_custom_path("/opt/assets");
        let paths = manager.search_paths(
            &[PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")],
            Some(PathBuf::from("/work")),
        );
        assert_eq!(
            paths.roots(),
            &[
                PathBuf::from("/tmp/a"),
                PathBuf::from("/tmp/b"),
                PathBuf::from("/work"),
                PathBuf::from("/opt/assets"),
            ]
        );
    }

    #[test]
    fn earlier_roots_shadow_the_asset_directory() {
        let assets = tempdir().unwrap();
        let cwd = tempdir().unwrap();
        fs::write(assets.path().join("run.sh"), "from assets").unwrap();
        fs::write(assets.path().join("init.sh"), "init from assets").unwrap();
        fs::write(cwd.path().join("run.sh"), "from cwd").unwrap();

        let manager = AssetManager::with_custom_path(assets.path());
        let paths = manager.search_paths(&[], Some(cwd.path().to_path_buf()));

        assert_eq!(paths.read("run.sh").as_deref(), Some("from cwd"));
        assert_eq!(paths.read("init.sh").as_deref(), Some("init from assets"));
        assert_eq!(paths.read("node.sh"), None);
    }

    #[test]
    fn empty_path_config_reads_as_unset() {
        let dir = tempdir().unwrap();
        let config = dir.path().join(PATH_CONFIG_FILE);
        fs::write(&config, "  \n").unwrap();
        assert_eq!(AssetManager::read_path_config(&config).unwrap(), None);

        fs::write(&config, "/data/pargamd\n").unwrap();
        assert_eq!(
            AssetManager::read_path_config(&config).unwrap(),
            Some(PathBuf::from("/data/pargamd"))
        );
    }
}
