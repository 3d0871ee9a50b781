// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::consensus::{
    DEFAULT_SECURITY_LEVEL, DEFAULT_STAKE_SPLIT_THRESHOLD, MAX_SECURITY_LEVEL,
    WITNESS_SCAN_CEILING,
};
use config::{Config, ConfigError, File};
use lazy_static::*;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{metadata, File as FsFile};
use std::io::Write;
use std::path::{Path, PathBuf};
use struct_field_names_as_array::FieldNamesAsArray;

const ENV_PREFIX: &str = "zerocoinnode";

lazy_static! {
    pub static ref SETTINGS: Settings = Settings::new().unwrap_or_else(|err| {
        error!("Failed to load settings, using defaults! Reason: {err}");
        Settings::default()
    });
}

#[derive(Debug, Serialize, Deserialize, Default, FieldNamesAsArray)]
pub struct Settings {
    /// Node settings.
    pub node: Node,

    /// Zerocoin accumulator and witness settings.
    pub zerocoin: Zerocoin,

    /// Staking settings.
    pub staking: Staking,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut config_path = dirs::config_dir()
            .ok_or_else(|| ConfigError::Message("no configuration directory".to_owned()))?;
        config_path.push("ZerocoinNode");
        config_path.push("config.toml");
        Self::load(&config_path)
    }

    /// Loads settings from the file at `config_path`, writing a default one
    /// if it is missing, with environment overrides applied on top.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let default_settings = Settings::default();

        if metadata(config_path).is_err() {
            let settings_str = toml::ser::to_string_pretty(&default_settings)
                .map_err(|err| ConfigError::Message(err.to_string()))?;

            match FsFile::create(config_path) {
                Ok(mut file) => {
                    file.write_all(settings_str.as_bytes()).unwrap_or(());
                }
                Err(err) => {
                    // Fall back to defaults and environment variables
                    error!("Failed to create configuration! Reason: {:#?}", err);
                }
            }
        }

        let config_path = config_path
            .to_str()
            .ok_or_else(|| ConfigError::Message("invalid configuration path".to_owned()))?;
        let mut s = Config::builder().add_source(File::with_name(config_path).required(false));

        // Set defaults
        let defaults: HashMap<String, HashMap<String, DynamicConfVal>> = serde_yaml::to_value(
            &default_settings,
        )
        .and_then(serde_yaml::from_value)
        .map_err(|err| ConfigError::Message(err.to_string()))?;

        for (k1, inner) in &defaults {
            for (k2, v) in inner {
                let key = format!("{k1}.{k2}");

                match v {
                    DynamicConfVal::String(v) => {
                        s = s.set_default(key, v.as_str())?;
                    }

                    DynamicConfVal::Bool(v) => {
                        s = s.set_default(key, v.to_string())?;
                    }

                    DynamicConfVal::U64(v) => {
                        s = s.set_default(key, v.to_string())?;
                    }

                    DynamicConfVal::Option(v) => {
                        if let Some(v) = v {
                            s = s.set_default(key, v.as_str())?;
                        }
                    }
                }
            }
        }

        // Same order as the fields of `Settings`
        let settings_modules: Vec<_> = vec![
            Node::FIELD_NAMES_AS_ARRAY,
            Zerocoin::FIELD_NAMES_AS_ARRAY,
            Staking::FIELD_NAMES_AS_ARRAY,
        ];

        // Every accepted environment key, mapped to the field it overrides
        let possible_keys: HashMap<String, (&str, &str)> = Settings::FIELD_NAMES_AS_ARRAY
            .iter()
            .zip(settings_modules)
            .flat_map(|(field, nested_fields)| {
                nested_fields.iter().map(move |nested| {
                    (
                        format!("{ENV_PREFIX}_{field}_{}", nested.replace('_', "")),
                        (*field, *nested),
                    )
                })
            })
            .collect();

        // Env vars are parsed by hand as the `Environment` source of the
        // config crate splits on every underscore.
        for (k, v) in std::env::vars() {
            let k = k.to_lowercase();

            if let Some((section, field)) = possible_keys.get(&k) {
                if v.is_empty() {
                    continue;
                }

                s = s.set_override(format!("{section}.{field}"), v.as_str())?;
            }
        }

        s.build()?.try_deserialize()
    }

    /// Rejects settings no node can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(
            self.node.network_name.as_str(),
            "mainnet" | "testnet" | "regtest"
        ) {
            return Err(ConfigError::Message(format!(
                "invalid network name: {}",
                self.node.network_name
            )));
        }

        if self.zerocoin.security_level == 0 || self.zerocoin.security_level > MAX_SECURITY_LEVEL {
            return Err(ConfigError::Message(format!(
                "security level must be between 1 and {MAX_SECURITY_LEVEL}"
            )));
        }

        if self.zerocoin.witness_scan_ceiling == 0 {
            return Err(ConfigError::Message(
                "witness scan ceiling must be positive".to_owned(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, FieldNamesAsArray)]
pub struct Node {
    /// The network name the node runs on. One of `mainnet`, `testnet` or `regtest`.
    #[serde(alias = "networkname")]
    pub network_name: String,

    /// If enabled, accumulator checksums are never written to disk.
    #[serde(alias = "memoryonly")]
    pub memory_only: bool,

    /// Node data directory
    #[serde(alias = "datadir")]
    pub data_dir: String,
}

impl Node {
    /// Directory of the checksum database
    #[must_use]
    pub fn checksums_dir(&self) -> PathBuf {
        let mut path = PathBuf::from(&self.data_dir);
        path.push(&self.network_name);
        path.push("checksums");
        path
    }
}

impl Default for Node {
    fn default() -> Self {
        let mut path = dirs::config_dir().unwrap_or_default();
        path.push("ZerocoinNode");

        Self {
            network_name: "testnet".to_owned(),
            memory_only: false,
            data_dir: path.to_string_lossy().into_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FieldNamesAsArray)]
pub struct Zerocoin {
    /// Security level of witnesses generated for spends, between 1 and 100.
    #[serde(alias = "securitylevel")]
    pub security_level: u8,

    /// Run the background witness worker.
    #[serde(alias = "lightworkerenabled")]
    pub light_worker_enabled: bool,

    /// Maximum number of blocks scanned for a single witness.
    #[serde(alias = "witnessscanceiling")]
    pub witness_scan_ceiling: u64,
}

impl Default for Zerocoin {
    fn default() -> Self {
        Self {
            security_level: DEFAULT_SECURITY_LEVEL,
            light_worker_enabled: true,
            witness_scan_ceiling: WITNESS_SCAN_CEILING,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FieldNamesAsArray)]
pub struct Staking {
    /// Enable staking.
    #[serde(alias = "stakingenabled")]
    pub staking_enabled: bool,

    /// Stakes worth more than twice this amount of whole coins are split
    /// in two outputs.
    #[serde(alias = "stakesplitthreshold")]
    pub stake_split_threshold: u64,
}

impl Default for Staking {
    fn default() -> Self {
        Self {
            staking_enabled: false,
            stake_split_threshold: DEFAULT_STAKE_SPLIT_THRESHOLD as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DynamicConfVal {
    String(String),
    Option(Option<String>),
    Bool(bool),
    U64(u64),
}
