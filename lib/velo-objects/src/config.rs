// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Remote object registry configuration.

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Json, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Accepted values for [`RegistryConfig::shard_bits`].
pub const SHARD_BITS_RANGE: RangeInclusive<u32> = 1..=16;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("Failed to extract configuration: {0}")]
    Extraction(#[from] Box<figment::Error>),

    /// Values were read but are out of range.
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

/// What a manager does when an id is resolved a second time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleResolvePolicy {
    /// Log and return [`RegistryError::AlreadyResolved`](crate::RegistryError::AlreadyResolved).
    #[default]
    Error,
    /// Panic. The first value stays in place either way.
    Panic,
}

/// Configuration for a [`RemoteObjectManager`](crate::RemoteObjectManager).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegistryConfig {
    /// Log2 of the number of map shards. Get-or-create is atomic per id
    /// because ids always hash to the same shard.
    /// If None, uses the map's default shard count.
    #[serde(default)]
    #[validate(range(min = 1, max = 16))]
    pub shard_bits: Option<u32>,

    /// Poison placeholders that are still unresolved when their entry is
    /// deleted, so awaiters wake with an error instead of waiting forever.
    /// Default: true
    #[serde(default = "default_poison_on_delete")]
    pub poison_on_delete: bool,

    /// Behaviour on a second resolution of the same id.
    /// Default: error
    #[serde(default)]
    pub double_resolve: DoubleResolvePolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            shard_bits: None,
            poison_on_delete: default_poison_on_delete(),
            double_resolve: DoubleResolvePolicy::default(),
        }
    }
}

fn default_poison_on_delete() -> bool {
    true
}

impl RegistryConfig {
    /// Number of map shards, if configured.
    ///
    /// `None` when `shard_bits` is unset or outside [`SHARD_BITS_RANGE`];
    /// the map then uses its default shard count.
    pub fn shard_amount(&self) -> Option<usize> {
        self.shard_bits
            .filter(|bits| SHARD_BITS_RANGE.contains(bits))
            .and_then(|bits| 1usize.checked_shl(bits))
    }

    /// Create a Figment configuration with all sources merged.
    ///
    /// Configuration sources in priority order (lowest to highest):
    /// 1. Code defaults
    /// 2. TOML file from VELO_OBJECTS_CONFIG_PATH environment variable
    /// 3. Environment variables (VELO_OBJECTS_* prefixed)
    pub fn figment() -> Figment {
        let config_path = std::env::var("VELO_OBJECTS_CONFIG_PATH").unwrap_or_default();

        Figment::new()
            .merge(Serialized::defaults(RegistryConfig::default()))
            .merge(Toml::file(&config_path))
            // VELO_OBJECTS_SHARD_BITS, VELO_OBJECTS_POISON_ON_DELETE, VELO_OBJECTS_DOUBLE_RESOLVE
            .merge(
                Env::prefixed("VELO_OBJECTS_")
                    .ignore(&["CONFIG_PATH"])
                    .map(|k| k.as_str().to_lowercase().into()),
            )
    }

    /// Load configuration from default figment (env and files).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::extract_from(Self::figment())
    }

    /// Extract configuration from any provider.
    pub fn extract_from<T: Provider>(provider: T) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(provider)
            .extract()
            .map_err(|e| ConfigError::Extraction(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Build a figment from defaults, then merge a custom provider.
    pub fn figment_with<T: Provider>(extra: T) -> Figment {
        Self::figment().merge(extra)
    }

    /// Load configuration with JSON overrides taking highest priority.
    pub fn from_figment_with_json(json: &str) -> Result<Self, ConfigError> {
        Self::extract_from(Self::figment().merge(Json::string(json)))
    }
}

impl Provider for RegistryConfig {
    fn metadata(&self) -> Metadata {
        Metadata::named("RegistryConfig")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
