/*!
 * Memory Configuration
 * Backend choice, pool sizes and warm-up settings
 */

use super::select::MemoryBackend;
use super::types::{MemoryError, MemoryResult};
use crate::core::limits::{DEFAULT_PKG_SIZE, DEFAULT_SHM_SIZE, OPTIMIZE};
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Memory warm-up settings
///
/// The warm-up driver replays an allocation pattern at start-up; only its
/// settings live here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    pub enabled: bool,
    pub pattern_file: Option<PathBuf>,
    /// Share of the pool to pre-touch, 0..=100
    pub percentage: u8,
}

impl WarmupConfig {
    pub fn validate(&self) -> MemoryResult<()> {
        if self.percentage > 100 {
            return Err(MemoryError::InvalidConfig(format!(
                "warm-up percentage {} exceeds 100",
                self.percentage
            )));
        }
        if self.enabled && self.pattern_file.is_none() {
            return Err(MemoryError::InvalidConfig(
                "warm-up enabled without a pattern file".into(),
            ));
        }
        Ok(())
    }
}

/// Memory subsystem configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemConfig {
    pub allocator: MemoryBackend,
    /// Private pool size (`-M`)
    pub pkg_size: Size,
    /// Shared pool size (`-m`)
    pub shm_size: Size,
    /// Allocations above this size are accounted as large
    pub large_limit: Size,
    pub warming: WarmupConfig,
}

impl Default for MemConfig {
    fn default() -> Self {
        Self {
            allocator: MemoryBackend::build_default(),
            pkg_size: DEFAULT_PKG_SIZE,
            shm_size: DEFAULT_SHM_SIZE,
            large_limit: OPTIMIZE,
            warming: WarmupConfig::default(),
        }
    }
}

impl MemConfig {
    /// Defaults overridden by `FMALLOC_*` environment variables
    pub fn from_env() -> MemoryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key
    pub fn from_lookup<F>(lookup: F) -> MemoryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("FMALLOC_ALLOCATOR") {
            config.allocator = name.parse()?;
        }
        if let Some(size) = lookup("FMALLOC_PKG_SIZE") {
            config.pkg_size = parse_size(&size)?;
        }
        if let Some(size) = lookup("FMALLOC_SHM_SIZE") {
            config.shm_size = parse_size(&size)?;
        }
        if let Some(size) = lookup("FMALLOC_LARGE_LIMIT") {
            config.large_limit = parse_size(&size)?;
        }
        if let Some(flag) = lookup("FMALLOC_WARMING") {
            config.warming.enabled = parse_bool(&flag)?;
        }
        if let Some(path) = lookup("FMALLOC_WARMING_PATTERN") {
            config.warming.pattern_file = Some(PathBuf::from(path));
        }
        if let Some(pct) = lookup("FMALLOC_WARMING_PERCENTAGE") {
            config.warming.percentage = pct.trim().parse().map_err(|_| {
                MemoryError::InvalidConfig(format!("invalid warm-up percentage '{pct}'"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.pkg_size == 0 || self.shm_size == 0 {
            return Err(MemoryError::InvalidConfig("pool sizes must be non-zero".into()));
        }
        self.warming.validate()
    }
}

/// Parse a byte count with an optional K, M or G suffix
pub fn parse_size(value: &str) -> MemoryResult<Size> {
    let invalid = || MemoryError::InvalidConfig(format!("invalid size '{value}'"));
    let trimmed = value.trim();
    let (digits, shift) = match trimmed.as_bytes().last() {
        Some(b'k' | b'K') => (&trimmed[..trimmed.len() - 1], 10),
        Some(b'm' | b'M') => (&trimmed[..trimmed.len() - 1], 20),
        Some(b'g' | b'G') => (&trimmed[..trimmed.len() - 1], 30),
        _ => (trimmed, 0),
    };
    let base: Size = digits.trim().parse().map_err(|_| invalid())?;
    base.checked_mul(1 << shift).ok_or_else(invalid)
}

fn parse_bool(value: &str) -> MemoryResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MemoryError::InvalidConfig(format!("invalid boolean '{value}'"))),
    }
}
