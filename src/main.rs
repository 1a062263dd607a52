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

use std::path::PathBuf;

use bmc_mirror::config::{Config, ConfigError};
use clap::Parser;
use tracing::info;
use tracing::metadata::LevelFilter;

#[tokio::main]
async fn main() -> Result<(), eyre::Report> {
    let cli = Cli::parse();
    setup_logging(&cli);

    match cli.command {
        Command::Run(run_command) => {
            let config: Config = (*run_command).try_into()?;
            let outcome = bmc_mirror::mirror(&config).await?;
            info!(
                path = %outcome.secret_path,
                ip = %outcome.stored.ip,
                user = %outcome.stored.user,
                "BMC credentials mirrored to Vault"
            );
        }
        Command::DefaultRunConfig => {
            print!("{}", Config::default().into_annotated_config_file())
        }
    }

    Ok(())
}

#[derive(clap::Parser, Debug)]
struct Cli {
    #[clap(long, short, help = "Turn on debug logging (same as RUST_LOG=debug)")]
    debug: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Parser, Debug)]
enum Command {
    #[clap(about = "Mirror BMC credentials for a node from MAAS into Vault")]
    Run(Box<RunCommand>),
    #[clap(about = "Output a default TOML config file for use with run -c")]
    DefaultRunConfig,
}

#[derive(clap::Parser, Debug)]
struct RunCommand {
    #[clap(long, short, help = "Path to TOML configuration file")]
    config: Option<PathBuf>,
    #[clap(long, help = "MAAS CLI binary to invoke, overriding configuration file")]
    maas_bin: Option<String>,
    #[clap(long, short = 'u', help = "MAAS profile to query as")]
    maas_user: Option<String>,
    #[clap(long, short = 'n', help = "Node to mirror BMC credentials for")]
    node_id: Option<String>,
    #[clap(long, help = "Timeout for the MAAS CLI invocation (e.g. 30s)")]
    inventory_timeout: Option<String>,
    #[clap(long, help = "Address of the Vault server")]
    vault_url: Option<String>,
    #[clap(
        long,
        env = "VAULT_TOKEN",
        hide_env_values = true,
        help = "Vault access token. Defaults to the VAULT_TOKEN environment variable."
    )]
    vault_token: Option<String>,
    #[clap(long, help = "KV v2 mount the secret is written under")]
    vault_mount: Option<String>,
    #[clap(long, help = "Request timeout for Vault HTTP calls (e.g. 15s)")]
    vault_timeout: Option<String>,
}

impl TryInto<Config> for RunCommand {
    type Error = CliError;

    // Load the config file, or the default, allowing CLI flags to override the
    // corresponding settings.
    fn try_into(self) -> Result<Config, Self::Error> {
        let mut config = if let Some(config_path) = self.config {
            Config::load(&config_path)?
        } else {
            Config::default()
        };

        if let Some(maas_bin) = self.maas_bin {
            config.maas_bin = maas_bin;
        }
        if let Some(maas_user) = self.maas_user {
            config.maas_user = maas_user;
        }
        if let Some(node_id) = self.node_id {
            config.node_id = Some(node_id);
        }
        if let Some(inventory_timeout) = self.inventory_timeout {
            config.inventory_timeout = parse_duration("--inventory-timeout", &inventory_timeout)?;
        }
        if let Some(vault_url) = self.vault_url {
            config.vault_url = vault_url;
        }
        if let Some(vault_token) = self.vault_token {
            config.vault_token = Some(vault_token);
        }
        if let Some(vault_mount) = self.vault_mount {
            config.vault_mount = vault_mount;
        }
        if let Some(vault_timeout) = self.vault_timeout {
            config.vault_timeout = parse_duration("--vault-timeout", &vault_timeout)?;
        }

        Ok(config)
    }
}

fn parse_duration(what: &'static str, value: &str) -> Result<std::time::Duration, CliError> {
    duration_str::parse(value).map_err(|error| CliError::InvalidDuration {
        what,
        value: value.to_string(),
        error: error.to_string(),
    })
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("Invalid duration for {what}: {value}: {error}")]
    InvalidDuration {
        what: &'static str,
        value: String,
        error: String,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

fn setup_logging(cli: &Cli) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = if cli.debug {
        Some(LevelFilter::DEBUG)
    } else {
        None
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::Layer::default().compact())
        .with(
            EnvFilter::builder()
                .with_default_directive(level.map(Into::into).unwrap_or(LevelFilter::INFO.into()))
                .from_env_lossy(),
        )
        .try_init()
    {
        panic!(
            "Failed to initialize trace logging for carbide-bmc-mirror. It's possible some \
            earlier code path has already set a global default log subscriber: {e}"
        );
    }
}
