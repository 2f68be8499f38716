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

use edge_router::{RouterConfig, RouterError, Rule, RuleEndpoint, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub(crate) router: RouterConfig,
    #[serde(default)]
    pub(crate) rule_endpoints: Vec<RuleEndpoint>,
    #[serde(default)]
    pub(crate) rules: Vec<Rule>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("unable to parse config file: {0}")]
    Parse(#[from] json5::Error),

    #[error("rejected {object}: {source}")]
    Rejected {
        object: String,
        source: ValidationError,
    },

    #[error(transparent)]
    Router(#[from] RouterError),
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(json5::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_document_parses() {
        let config = Config::parse(
            r#"{
                // router settings fall back to defaults
                router: { port: 0 },
                rule_endpoints: [
                    { metadata: { namespace: "default", name: "rest-ep" },
                      spec: { ruleEndpointType: "rest" } },
                ],
                rules: [],
            }"#,
        )
        .unwrap();

        assert_eq!(config.router.port, 0);
        assert_eq!(config.router.retry.attempts, 3);
        assert_eq!(config.rule_endpoints.len(), 1);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn unknown_top_level_keys_are_rejected() {
        assert!(matches!(
            Config::parse(r#"{ gateway: {} }"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
