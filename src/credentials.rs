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

use std::env;
use std::fmt;

pub const ENV_BMC_IP: &str = "BMC_IP";
pub const ENV_BMC_USER: &str = "BMC_USER";
pub const ENV_BMC_PASS: &str = "BMC_PASS";

/// BMC credentials for a single node, as reported by the inventory source.
/// Built once, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct BmcCredentials {
    pub address: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BmcCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BmcCredentials")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Export the credentials as `BMC_IP`, `BMC_USER` and `BMC_PASS` for follow-on
/// processes. The credentials are also returned by value from the mirror flow, so
/// nothing internal reads these back.
pub fn export_environment(credentials: &BmcCredentials) {
    // SAFETY: the mirror is a single linear flow; nothing reads or writes the
    // environment concurrently with this call.
    unsafe {
        env::set_var(ENV_BMC_IP, &credentials.address);
        env::set_var(ENV_BMC_USER, &credentials.username);
        env::set_var(ENV_BMC_PASS, &credentials.password);
    }
}

/// Vault path the credentials for `node_id` are mirrored under.
pub fn secret_path(node_id: &str) -> String {
    format!("bmc-{node_id}")
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_secret_path() {
        assert_eq!(secret_path("m7gfpp"), "bmc-m7gfpp");
    }

    #[test]
    #[serial]
    fn test_export_environment() {
        let credentials = BmcCredentials {
            address: "10.0.0.5".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
        };
        export_environment(&credentials);

        assert_eq!(env::var(ENV_BMC_IP).unwrap(), "10.0.0.5");
        assert_eq!(env::var(ENV_BMC_USER).unwrap(), "admin");
        assert_eq!(env::var(ENV_BMC_PASS).unwrap(), "secret");
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = BmcCredentials {
            address: "10.0.0.5".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }
}
