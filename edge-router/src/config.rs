/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Process-wide router configuration.
//!
//! The configuration is injected once through [`init_configure`]; later calls are
//! ignored so that every component observes the same values.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9443;
pub const DEFAULT_REST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ROUTER_MODULE: &str = "router";
pub const DEFAULT_HUB_MODULE: &str = "cloudhub";
pub const DEFAULT_QUEUE_SIZE: usize = 1024;

static CONFIG: OnceLock<RouterConfig> = OnceLock::new();

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct RouterConfig {
    pub address: String,
    pub port: u16,
    pub rest_timeout_secs: u64,
    pub rest_target_timeout_secs: u64,
    pub router_module: String,
    pub hub_module: String,
    pub hub_queue_size: usize,
    pub status: StatusConfig,
    pub retry: RetryConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct StatusConfig {
    pub channel_capacity: usize,
    pub flush_interval_secs: u64,
    pub max_error_samples: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetryConfig {
    pub attempts: usize,
    pub backoff_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            rest_timeout_secs: DEFAULT_REST_TIMEOUT_SECS,
            rest_target_timeout_secs: DEFAULT_REST_TIMEOUT_SECS,
            router_module: DEFAULT_ROUTER_MODULE.to_string(),
            hub_module: DEFAULT_HUB_MODULE.to_string(),
            hub_queue_size: DEFAULT_QUEUE_SIZE,
            status: StatusConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_QUEUE_SIZE,
            flush_interval_secs: 30,
            max_error_samples: 50,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_secs: 5,
        }
    }
}

impl RouterConfig {
    pub fn rest_timeout(&self) -> Duration {
        Duration::from_secs(self.rest_timeout_secs)
    }

    pub fn rest_target_timeout(&self) -> Duration {
        Duration::from_secs(self.rest_target_timeout_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.status.flush_interval_secs)
    }
}

/// Installs the process-wide configuration. Returns `false` when one was already installed.
pub fn init_configure(config: RouterConfig) -> bool {
    CONFIG.set(config).is_ok()
}

/// Returns the installed configuration, or defaults when none was installed.
pub fn configured() -> RouterConfig {
    CONFIG.get().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_router_conventions() {
        let config = RouterConfig::default();

        assert_eq!(config.address, "0.0.0.0");
        assert_eq!(config.port, 9443);
        assert_eq!(config.rest_timeout(), Duration::from_secs(60));
        assert_eq!(config.status.channel_capacity, 1024);
        assert_eq!(config.status.max_error_samples, 50);
        assert_eq!(config.flush_interval(), Duration::from_secs(30));
        assert_eq!(config.retry.attempts, 3);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config: RouterConfig =
            serde_json::from_str(r#"{"port": 0, "retry": {"attempts": 5}}"#).unwrap();

        assert_eq!(config.port, 0);
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.backoff_secs, 5);
        assert_eq!(config.router_module, "router");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<RouterConfig>(r#"{"prot": 1}"#).is_err());
    }

    #[test]
    fn first_install_wins() {
        let first = RouterConfig {
            port: 1234,
            ..RouterConfig::default()
        };
        let second = RouterConfig {
            port: 4321,
            ..RouterConfig::default()
        };

        init_configure(first);
        assert!(!init_configure(second));
        assert_eq!(configured().port, 1234);
    }
}
