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

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::credentials::BmcCredentials;

/// Query the MAAS CLI for the power parameters of `node_id` and extract the BMC
/// credentials. Any failure here is hard: nothing downstream (environment export,
/// Vault write) may run on partial or absent data.
pub async fn fetch_power_parameters(
    config: &Config,
    node_id: &str,
) -> Result<BmcCredentials, InventoryError> {
    info!(node_id, maas_user = %config.maas_user, "fetching BMC power parameters from MAAS");

    let mut cmd = tokio::process::Command::new(&config.maas_bin);
    cmd.arg(&config.maas_user)
        .arg("node")
        .arg("power-parameters")
        .arg(node_id)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::time::timeout(config.inventory_timeout, cmd.output())
        .await
        .map_err(|_| InventoryError::Timeout {
            bin: config.maas_bin.clone(),
            timeout: config.inventory_timeout,
        })?
        .map_err(|error| InventoryError::Spawn {
            bin: config.maas_bin.clone(),
            error,
        })?;

    if !output.status.success() {
        return Err(InventoryError::CommandFailed {
            bin: config.maas_bin.clone(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let params: PowerParameters =
        serde_json::from_slice(&output.stdout).map_err(InventoryError::InvalidJson)?;
    params.try_into()
}

/// The subset of a MAAS `power-parameters` response we care about. All three fields
/// must be present; each is checked individually so the error can name the one that
/// is missing.
#[derive(Deserialize, Debug)]
struct PowerParameters {
    power_address: Option<String>,
    power_user: Option<String>,
    power_pass: Option<String>,
}

impl TryFrom<PowerParameters> for BmcCredentials {
    type Error = InventoryError;

    fn try_from(params: PowerParameters) -> Result<Self, Self::Error> {
        let require = |value: Option<String>, field: &'static str| {
            value.ok_or(InventoryError::MissingField { field })
        };
        Ok(BmcCredentials {
            address: require(params.power_address, "power_address")?,
            username: require(params.power_user, "power_user")?,
            password: require(params.power_pass, "power_pass")?,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InventoryError {
    #[error("Could not invoke inventory tool {bin}: {error}")]
    Spawn {
        bin: String,
        error: std::io::Error,
    },
    #[error("Inventory tool {bin} did not complete within {timeout:?}")]
    Timeout { bin: String, timeout: Duration },
    #[error("Inventory tool {bin} failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        bin: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Inventory response was not valid JSON: {0}")]
    InvalidJson(serde_json::Error),
    #[error("Inventory response is missing field {field}")]
    MissingField { field: &'static str },
}
