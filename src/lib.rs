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

//! Mirrors BMC credentials for a single MAAS node into Vault: query the MAAS CLI
//! for the node's power parameters, export the credentials as `BMC_*` environment
//! variables for follow-on tooling, write them to Vault KV v2 at `bmc-<node_id>`,
//! and verify the write by reading the secret back.

pub mod config;
pub mod credentials;
pub mod inventory;
pub mod vault;

use tracing::info;

use crate::config::{Config, ConfigError};
pub use crate::credentials::BmcCredentials;
use crate::inventory::InventoryError;
use crate::vault::{StoredBmcSecret, VaultError, VaultMirror};

/// What a successful mirror run produced. Callers get the credentials back as a
/// value; they never need to read the exported environment variables.
#[derive(Debug)]
pub struct MirrorOutcome {
    pub secret_path: String,
    pub stored: StoredBmcSecret,
}

/// Run the full mirror sequence: inventory query, environment export, Vault write,
/// read-back verification. Strictly sequential; any failure aborts the run before
/// the next step.
pub async fn mirror(config: &Config) -> Result<MirrorOutcome, MirrorError> {
    let node_id = config.node_id()?;
    let token = config.vault_token()?;

    let bmc_credentials = inventory::fetch_power_parameters(config, node_id).await?;
    info!(
        node_id,
        address = %bmc_credentials.address,
        user = %bmc_credentials.username,
        "fetched BMC credentials"
    );

    credentials::export_environment(&bmc_credentials);

    let vault = VaultMirror::new(config, token)?;
    let stored = vault.mirror_credentials(node_id, &bmc_credentials).await?;

    Ok(MirrorOutcome {
        secret_path: credentials::secret_path(node_id),
        stored,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Inventory query failed: {0}")]
    Inventory(#[from] InventoryError),
    #[error("Secret store operation failed: {0}")]
    Vault(#[from] VaultError),
}
