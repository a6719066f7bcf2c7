use serde::Deserialize;

use crate::error::Result;
use crate::storage::disk::DiskType;

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    /// Persistence backend for the pool.
    pub disk_type: DiskType,
    /// Database file path, used when disk_type is file.
    pub path: String,
    /// Number of frames owned by the buffer pool.
    pub pool_size: usize,
    /// History depth of the LRU-K replacer.
    pub replacer_k: usize,
    /// Capacity of an extendible hash directory bucket.
    pub bucket_size: usize,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("log_level", "debug")?
            .set_default("disk_type", "memory")?
            .set_default("path", "bufpool.db")?
            .set_default("pool_size", 64_i64)?
            .set_default("replacer_k", 10_i64)?
            .set_default("bucket_size", 4_i64)?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("BUFPOOL"));
        Ok(cfg.build()?.try_deserialize()?)
    }
}
