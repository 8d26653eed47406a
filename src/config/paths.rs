//! Where the config, log and native component live
//!
//! Portable mode keeps everything beside the executable and is switched on by
//! a marker file there. Otherwise the per-user config directory is used.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::{component, config};

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Directory holding the executable (and the shipped component)
    pub base_dir: PathBuf,
    /// Directory holding config, log and staged component
    pub config_dir: PathBuf,
    pub portable: bool,
}

impl ConfigPaths {
    /// Resolve paths for this installation, creating the config dir
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to resolve executable path")?;
        let base_dir = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let portable = base_dir.join(config::PORTABLE_MARKER).exists();

        let config_dir = match override_dir {
            Some(dir) => dir,
            None if portable => base_dir.clone(),
            None => {
                let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
                dir.push(config::APP_DIR);
                dir
            }
        };

        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;
        Ok(Self {
            base_dir,
            config_dir,
            portable,
        })
    }

    /// Everything rooted in one directory (tests, `--config-dir`)
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            base_dir: dir.to_path_buf(),
            config_dir: dir.to_path_buf(),
            portable: true,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(config::FILENAME)
    }

    pub fn mirror_file(&self) -> PathBuf {
        self.config_dir.join(config::MIRROR_FILENAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.config_dir.join(config::LOG_FILENAME)
    }

    pub fn component_file(&self) -> PathBuf {
        self.config_dir.join(component::FILENAME)
    }

    /// Copy the shipped component into the config dir if it is not there yet.
    ///
    /// Returns true when a copy was made. The destination may be locked by the
    /// host process, so permission errors are retried a few times.
    pub fn stage_component(&self) -> Result<bool> {
        let target = self.component_file();
        if target.exists() {
            return Ok(false);
        }
        let source = self.base_dir.join(component::FILENAME);
        if source == target || !source.exists() {
            warn!(source = %source.display(), "No shipped component to stage");
            return Ok(false);
        }

        let mut attempt = 1;
        loop {
            match fs::copy(&source, &target) {
                Ok(_) => {
                    info!(target = %target.display(), "Staged native component");
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::PermissionDenied && attempt < component::STAGE_RETRIES => {
                    warn!(attempt, error = %e, "Component copy denied, retrying");
                    attempt += 1;
                    thread::sleep(Duration::from_millis(component::STAGE_RETRY_DELAY_MS));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to copy {:?} to {:?}", source, target)
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_layout() {
        let root = Path::new("fx");
        let paths = ConfigPaths::in_dir(root);
        assert_eq!(paths.config_file(), root.join("config.json"));
        assert_eq!(paths.mirror_file(), root.join("config.ini"));
        assert_eq!(paths.component_file(), root.join("ExplorerBlurMica.dll"));
    }

    #[test]
    fn test_stage_component_copies_once() {
        let base = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::write(base.path().join(component::FILENAME), b"dll").unwrap();
        let paths = ConfigPaths {
            base_dir: base.path().to_path_buf(),
            config_dir: target.path().to_path_buf(),
            portable: false,
        };
        assert!(paths.stage_component().unwrap());
        assert!(!paths.stage_component().unwrap());
        assert_eq!(fs::read(paths.component_file()).unwrap(), b"dll");
    }

    #[test]
    fn test_stage_component_without_source() {
        let base = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let paths = ConfigPaths {
            base_dir: base.path().to_path_buf(),
            config_dir: target.path().to_path_buf(),
            portable: false,
        };
        assert!(!paths.stage_component().unwrap());
    }
}
