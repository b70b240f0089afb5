/*
 * MIT License
 *
 * Copyright (c) 2022 Joseph Sacchini
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use super::prelude::*;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

// environment variables which override the file
pub const BASE_URL_ENV: &str = "SEMANTLE_BASE_URL";
pub const CACHE_DIR_ENV: &str = "SEMANTLE_CACHE_DIR";

///
/// Everything an Engine needs to know which isn't a collaborator. Every field has a default, so
/// a config file only needs to mention what it changes:
///
/// ```toml
/// base_url = "https://cdn.example.org/semantle"
/// cache_dir = "/var/cache/semantle"
/// preload_concurrency = 8
/// ```
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// shards live at {base_url}/challenges/{id}/{letter}.csv
    pub base_url: String,
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    pub preload_concurrency: usize,
    pub progress_window: usize,
    /// where the durable tier keeps its files, in-memory only when absent
    pub cache_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            preload_concurrency: DEFAULT_PRELOAD_CONCURRENCY,
            progress_window: DEFAULT_PROGRESS_WINDOW,
            cache_dir: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigErr {
    #[error("unable to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigErr> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigErr> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigErr::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let out = Self::from_toml_str(&text)?;
        log::debug!("loaded config from {}: {:?}", path.display(), out);
        Ok(out)
    }

    /// Environment variables win over whatever the file said
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        if let Ok(cache_dir) = std::env::var(CACHE_DIR_ENV) {
            self.cache_dir = Some(PathBuf::from(cache_dir));
        }
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn preload_concurrency(&self) -> usize {
        self.preload_concurrency.max(1)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
