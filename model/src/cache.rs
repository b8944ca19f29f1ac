//! Short-lived on-disk cache for expensive result sources.
//!
//! An entry is one result document stored as `<dir>/<key>.json`, in the same
//! layout as the accessibility result document. Its timestamp is the file's
//! modification time, which `put` sets from the injected [`Clock`]. Anything
//! wrong with an entry (stale, unreadable, corrupt) reads as a miss.

use crate::decode::{parse_with_fallback, TextDecoding};
use crate::loaders::{parse_results, SourceShape};
use crate::types::ResultMap;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedResults {
    pub results: ResultMap,
    pub written_at: DateTime<Utc>,
}

pub struct ResultCache {
    dir: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Fresh entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<CachedResults> {
        let path = self.path_for(key);
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let written_at = DateTime::<Utc>::from(modified);

        // An entry stamped in the future counts as just written.
        let age = (self.clock.now() - written_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if age > self.ttl {
            debug!(
                "Cache entry {} is stale ({}s old, ttl {}s)",
                key,
                age.as_secs(),
                self.ttl.as_secs()
            );
            return None;
        }

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        match parse_with_fallback(&bytes, &TextDecoding::DEFAULT_ORDER, |text| {
            serde_json::from_str::<Value>(text)
        }) {
            Ok((document, _)) => {
                debug!("Cache hit for {} ({}s old)", key, age.as_secs());
                Some(CachedResults {
                    results: parse_results(&document, SourceShape::Flat),
                    written_at,
                })
            }
            Err(failure) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), failure);
                None
            }
        }
    }

    /// Store `results` under `key`, stamped with the clock's current time.
    pub fn put(&self, key: &str, results: &ResultMap) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let body = serde_json::to_vec_pretty(results)?;
        std::fs::write(&path, body)?;

        let file = std::fs::File::options().write(true).open(&path)?;
        file.set_modified(SystemTime::from(self.clock.now()))?;

        debug!("Cached {} results under {}", results.len(), path.display());
        Ok(path)
    }
}
