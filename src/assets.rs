//! HRTF asset resolution.
//!
//! On Android packaged assets live inside the APK and cannot be opened by
//! path, so the HRTF file is copied into a writable cache first. Everywhere
//! else the file is read in place. Both strategies are compiled on every
//! platform; [`HrtfAssetResolver::for_platform`] picks the right one.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ListenerConfig;
use crate::error::ListenerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HrtfAssetResolver {
    /// Read the file from the packaged asset directory.
    Direct { assets_dir: PathBuf },
    /// Copy the packaged file into `cache_dir` and read the copy.
    CopyToCache {
        assets_dir: PathBuf,
        cache_dir: PathBuf,
    },
}

impl HrtfAssetResolver {
    pub fn direct(assets_dir: impl Into<PathBuf>) -> Self {
        HrtfAssetResolver::Direct {
            assets_dir: assets_dir.into(),
        }
    }

    pub fn copy_to_cache(assets_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        HrtfAssetResolver::CopyToCache {
            assets_dir: assets_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Resolver for the current platform.
    ///
    /// Android without a configured cache directory uses the system temp dir.
    pub fn for_platform(config: &ListenerConfig) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "android")] {
                let cache_dir = config
                    .cache_dir
                    .clone()
                    .unwrap_or_else(std::env::temp_dir);
                Self::copy_to_cache(config.streaming_assets_dir.clone(), cache_dir)
            } else {
                Self::direct(config.streaming_assets_dir.clone())
            }
        }
    }

    /// Resolve `file_name` to a readable path.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf, ListenerError> {
        match self {
            HrtfAssetResolver::Direct { assets_dir } => {
                let path = assets_dir.join(file_name);
                ensure_readable(&path)?;
                Ok(path)
            }
            HrtfAssetResolver::CopyToCache {
                assets_dir,
                cache_dir,
            } => {
                let packaged = assets_dir.join(file_name);
                ensure_readable(&packaged)?;

                fs::create_dir_all(cache_dir).map_err(|err| asset_error(cache_dir, err))?;
                let cached = cache_dir.join(file_name);
                let bytes = fs::copy(&packaged, &cached).map_err(|err| asset_error(&cached, err))?;
                log::debug!(
                    "[Assets] Copied {} bytes of HRTF data to {:?}",
                    bytes,
                    cached
                );
                Ok(cached)
            }
        }
    }
}

fn ensure_readable(path: &Path) -> Result<(), ListenerError> {
    let metadata = fs::metadata(path).map_err(|err| asset_error(path, err))?;
    if !metadata.is_file() {
        return Err(ListenerError::AssetResolution {
            path: path.display().to_string(),
            reason: "not a regular file".to_string(),
        });
    }
    Ok(())
}

fn asset_error(path: &Path, err: std::io::Error) -> ListenerError {
    ListenerError::AssetResolution {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
