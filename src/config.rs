use std::env;
use std::path::PathBuf;

use crate::camera_roll::DEFAULT_PAGE_SIZE;
use crate::file_cache::FileCacheConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON array of raw photo records, standing in for the device asset library.
    pub photos_json: Option<PathBuf>,
    /// Where the original image files live.
    pub library_path: PathBuf,
    /// Where materialized copies are written.
    pub cache_path: PathBuf,
    pub file_cache: FileCacheConfig,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            photos_json: None,
            library_path: PathBuf::from("./photos"),
            cache_path: PathBuf::from("./data/cache"),
            file_cache: FileCacheConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let file_cache = FileCacheConfig {
            max: lookup("CAMERA_ROLL_FILE_CACHE_MAX")
                .map(|v| v.trim().parse::<usize>())
                .transpose()?
                .unwrap_or(defaults.file_cache.max),
            min: lookup("CAMERA_ROLL_FILE_CACHE_MIN")
                .map(|v| v.trim().parse::<usize>())
                .transpose()?
                .unwrap_or(defaults.file_cache.min),
        };
        if file_cache.min > file_cache.max {
            return Err(format!(
                "CAMERA_ROLL_FILE_CACHE_MIN ({}) must not exceed CAMERA_ROLL_FILE_CACHE_MAX ({})",
                file_cache.min, file_cache.max
            )
            .into());
        }

        Ok(Config {
            photos_json: lookup("CAMERA_ROLL_PHOTOS_JSON")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            library_path: lookup("CAMERA_ROLL_LIBRARY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.library_path),
            cache_path: lookup("CAMERA_ROLL_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            file_cache,
            page_size: lookup("CAMERA_ROLL_PAGE_SIZE")
                .map(|v| v.trim().parse::<usize>())
                .transpose()?
                .unwrap_or(defaults.page_size),
        })
    }
}
