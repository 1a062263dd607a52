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

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use crate::config::Config;
use crate::credentials::{BmcCredentials, secret_path};

/// Writes BMC credentials into Vault's KV v2 store and verifies them by reading
/// them back.
pub struct VaultMirror {
    client: VaultClient,
    mount: String,
}

impl std::fmt::Debug for VaultMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultMirror")
            .field("mount", &self.mount)
            .finish_non_exhaustive()
    }
}

/// The secret as stored in Vault. The key names `ip`, `user` and `passw` are a fixed
/// interface; other tooling reads them back by these names.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StoredBmcSecret {
    pub ip: String,
    pub user: String,
    pub passw: String,
}

impl From<&BmcCredentials> for StoredBmcSecret {
    fn from(credentials: &BmcCredentials) -> Self {
        Self {
            ip: credentials.address.clone(),
            user: credentials.username.clone(),
            passw: credentials.password.clone(),
        }
    }
}

impl fmt::Debug for StoredBmcSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredBmcSecret")
            .field("ip", &self.ip)
            .field("user", &self.user)
            .field("passw", &"<redacted>")
            .finish()
    }
}

impl VaultMirror {
    pub fn new(config: &Config, token: &str) -> Result<Self, VaultError> {
        let url = url::Url::parse(&config.vault_url).map_err(|error| VaultError::InvalidAddress {
            url: config.vault_url.clone(),
            error,
        })?;
        let settings = VaultClientSettingsBuilder::default()
            .address(url.as_str())
            .token(token)
            .timeout(Some(config.vault_timeout))
            .build()
            .map_err(|error| VaultError::Settings(error.to_string()))?;
        let client = VaultClient::new(settings).map_err(VaultError::Client)?;
        Ok(Self {
            client,
            mount: config.vault_mount.clone(),
        })
    }

    /// Write the credentials at `bmc-<node_id>`, read the same path back and check
    /// the round trip. A mismatch is its own error; the read-back is a verification
    /// step, not incidental.
    pub async fn mirror_credentials(
        &self,
        node_id: &str,
        credentials: &BmcCredentials,
    ) -> Result<StoredBmcSecret, VaultError> {
        let written = self.store(node_id, credentials).await?;
        let read_back = self.read_back(node_id).await?;
        if read_back != written {
            return Err(VaultError::VerificationFailed {
                path: secret_path(node_id),
            });
        }
        info!(path = %secret_path(node_id), "verified BMC secret read-back");
        Ok(read_back)
    }

    pub async fn store(
        &self,
        node_id: &str,
        credentials: &BmcCredentials,
    ) -> Result<StoredBmcSecret, VaultError> {
        let path = secret_path(node_id);
        let secret = StoredBmcSecret::from(credentials);
        let metadata = kv2::set(&self.client, &self.mount, &path, &secret)
            .await
            .map_err(|error| VaultError::Write {
                path: path.clone(),
                error,
            })?;
        info!(path = %path, version = metadata.version, "wrote BMC secret");
        Ok(secret)
    }

    pub async fn read_back(&self, node_id: &str) -> Result<StoredBmcSecret, VaultError> {
        let path = secret_path(node_id);
        kv2::read(&self.client, &self.mount, &path)
            .await
            .map_err(|error| VaultError::ReadBack { path, error })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    #[error("Invalid Vault address {url}: {error}")]
    InvalidAddress {
        url: String,
        error: url::ParseError,
    },
    #[error("Invalid Vault client settings: {0}")]
    Settings(String),
    #[error("Could not create Vault client: {0}")]
    Client(#[source] ClientError),
    #[error("Could not write secret at {path}: {error}")]
    Write {
        path: String,
        #[source]
        error: ClientError,
    },
    #[error("Could not read back secret at {path}: {error}")]
    ReadBack {
        path: String,
        #[source]
        error: ClientError,
    },
    #[error("Read-back of secret at {path} does not match what was written")]
    VerificationFailed { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> BmcCredentials {
        BmcCredentials {
            address: "10.0.0.5".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    fn config_for(server: &mockito::ServerGuard) -> Config {
        Config {
            vault_url: server.url(),
            ..Config::default()
        }
    }

    fn write_response_body() -> &'static str {
        r#"{
            "request_id": "a5f1a5d7-6e26-4a49-b2f5-0a9a2d8b9f00",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 0,
            "data": {
                "created_time": "2026-08-27T00:00:00.000000Z",
                "custom_metadata": null,
                "deletion_time": "",
                "destroyed": false,
                "version": 1
            },
            "wrap_info": null,
            "warnings": null,
            "auth": null
        }"#
    }

    fn read_response_body(passw: &str) -> String {
        format!(
            r#"{{
            "request_id": "0b4bf7c5-dd4e-46e8-a9ec-b6ad32d98e55",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 0,
            "data": {{
                "data": {{"ip": "10.0.0.5", "user": "admin", "passw": "{passw}"}},
                "metadata": {{
                    "created_time": "2026-08-27T00:00:00.000000Z",
                    "custom_metadata": null,
                    "deletion_time": "",
                    "destroyed": false,
                    "version": 1
                }}
            }},
            "wrap_info": null,
            "warnings": null,
            "auth": null
        }}"#
        )
    }

    #[tokio::test]
    async fn test_mirror_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let write = server
            .mock("POST", "/v1/secret/data/bmc-m7gfpp")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(write_response_body())
            .create_async()
            .await;
        let read = server
            .mock("GET", "/v1/secret/data/bmc-m7gfpp")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(read_response_body("secret"))
            .create_async()
            .await;

        let mirror = VaultMirror::new(&config_for(&server), "test-token").unwrap();
        let stored = mirror
            .mirror_credentials("m7gfpp", &credentials())
            .await
            .expect("mirror should succeed");

        assert_eq!(stored.ip, "10.0.0.5");
        assert_eq!(stored.user, "admin");
        assert_eq!(stored.passw, "secret");
        write.assert_async().await;
        read.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_back_mismatch_is_verification_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/secret/data/bmc-m7gfpp")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(write_response_body())
            .create_async()
            .await;
        server
            .mock("GET", "/v1/secret/data/bmc-m7gfpp")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(read_response_body("not-what-was-written"))
            .create_async()
            .await;

        let mirror = VaultMirror::new(&config_for(&server), "test-token").unwrap();
        let error = mirror
            .mirror_credentials("m7gfpp", &credentials())
            .await
            .expect_err("mirror should fail");
        assert!(matches!(error, VaultError::VerificationFailed { .. }));
    }

    #[tokio::test]
    async fn test_permission_denied_is_write_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/secret/data/bmc-m7gfpp")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"errors": ["permission denied"]}"#)
            .create_async()
            .await;

        let mirror = VaultMirror::new(&config_for(&server), "bad-token").unwrap();
        let error = mirror
            .mirror_credentials("m7gfpp", &credentials())
            .await
            .expect_err("mirror should fail");
        assert!(matches!(error, VaultError::Write { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_write_error() {
        // Port 1 is never listening; the connection is refused before any API call.
        let config = Config {
            vault_url: "http://127.0.0.1:1".to_string(),
            ..Config::default()
        };

        let mirror = VaultMirror::new(&config, "test-token").unwrap();
        let error = mirror
            .mirror_credentials("m7gfpp", &credentials())
            .await
            .expect_err("mirror should fail");
        assert!(matches!(error, VaultError::Write { .. }));
    }

    #[test]
    fn test_invalid_address_is_typed_error() {
        let config = Config {
            vault_url: "not a url".to_string(),
            ..Config::default()
        };
        let error = VaultMirror::new(&config, "test-token").expect_err("new should fail");
        assert!(matches!(error, VaultError::InvalidAddress { .. }));
    }

    #[test]
    fn test_stored_secret_debug_redacts_password() {
        let secret = StoredBmcSecret {
            ip: "10.0.0.5".to_string(),
            user: "admin".to_string(),
            passw: "hunter2".to_string(),
        };
        let debug = format!("{secret:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }
}
