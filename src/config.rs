/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::path::Path;
use std::time::Duration;

use duration_str::deserialize_duration;
use serde::{Deserialize, Serialize, Serializer};

/// Configuration for the mirror. Fields are documented as comments in the output of
/// [`Config::into_annotated_config_file`].
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "Defaults::maas_bin")]
    pub maas_bin: String,
    #[serde(default = "Defaults::maas_user")]
    pub maas_user: String,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(
        default = "Defaults::inventory_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub inventory_timeout: Duration,
    #[serde(default = "Defaults::vault_url")]
    pub vault_url: String,
    #[serde(default)]
    pub vault_token: Option<String>,
    #[serde(default = "Defaults::vault_mount")]
    pub vault_mount: String,
    #[serde(
        default = "Defaults::vault_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub vault_timeout: Duration,
}

pub struct Defaults;

impl Defaults {
    pub fn maas_bin() -> String {
        "maas".to_string()
    }

    pub fn maas_user() -> String {
        "admin".to_string()
    }

    pub fn inventory_timeout() -> Duration {
        Duration::from_secs(30)
    }

    pub fn vault_url() -> String {
        "http://127.0.0.1:8200".to_string()
    }

    pub fn vault_mount() -> String {
        "secret".to_string()
    }

    pub fn vault_timeout() -> Duration {
        Duration::from_secs(15)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = std::fs::read_to_string(path).map_err(|error| ConfigError::CouldNotRead {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        toml::from_str::<Self>(&cfg).map_err(|error| ConfigError::InvalidToml {
            path: path.to_string_lossy().to_string(),
            error,
        })
    }

    /// The node whose BMC credentials are mirrored. Required, so it has no default;
    /// it comes from the config file or the `--node-id` flag.
    pub fn node_id(&self) -> Result<&str, ConfigError> {
        self.node_id
            .as_deref()
            .ok_or(ConfigError::MissingField { field: "node_id" })
    }

    pub fn vault_token(&self) -> Result<&str, ConfigError> {
        self.vault_token.as_deref().ok_or(ConfigError::MissingField {
            field: "vault_token",
        })
    }

    pub fn into_annotated_config_file(self) -> String {
        let Self {
            maas_bin,
            maas_user,
            node_id: _,
            inventory_timeout,
            vault_url,
            vault_token: _,
            vault_mount,
            vault_timeout,
        } = self;
        let inventory_timeout = format!("{}s", inventory_timeout.as_secs());
        let vault_timeout = format!("{}s", vault_timeout.as_secs());

        format!(
            r#"
#####
## This is a default config file for carbide-bmc-mirror. Any non-comment line in this
## file simply represents default values. Commented lines with a single `#` represent
## examples for required or optional configuration which has no default.
#####

## MAAS CLI binary to invoke for the inventory query.
maas_bin = {maas_bin:?}

## MAAS profile (user identity) to query as.
maas_user = {maas_user:?}

## Which node to mirror BMC credentials for. Required; no default.
# node_id = "m7gfpp"

## How long to wait for the MAAS CLI before giving up.
inventory_timeout = {inventory_timeout:?}

## Address of the Vault server.
vault_url = {vault_url:?}

## Vault access token. Required; no default. Can also be supplied via the
## VAULT_TOKEN environment variable or the --vault-token flag.
# vault_token = "<token>"

## KV v2 mount the secret is written under.
vault_mount = {vault_mount:?}

## Request timeout for Vault HTTP calls.
vault_timeout = {vault_timeout:?}
"#
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            maas_bin: Defaults::maas_bin(),
            maas_user: Defaults::maas_user(),
            node_id: None,
            inventory_timeout: Defaults::inventory_timeout(),
            vault_url: Defaults::vault_url(),
            vault_token: None,
            vault_mount: Defaults::vault_mount(),
            vault_timeout: Defaults::vault_timeout(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {error}")]
    CouldNotRead {
        path: String,
        error: std::io::Error,
    },
    #[error("Could not parse config file {path}: {error}")]
    InvalidToml {
        path: String,
        error: toml::de::Error,
    },
    #[error("Missing required configuration field {field}")]
    MissingField { field: &'static str },
}

fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{}s", d.as_secs()))
}
