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

mod config;

use crate::config::{Config, ConfigError};
use clap::Parser;
use edge_router::{
    init_configure, validate_rule, validate_rule_endpoint, ChannelHub, EdgeRouter,
    HubStatusReporter, HubTransport, RuleStore,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command()]
struct RouterArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started configurable-router");

    let args = RouterArgs::parse();
    let config = Config::load(&args.config)?;
    if !init_configure(config.router.clone()) {
        warn!("router configuration was already installed");
    }

    let hub = Arc::new(ChannelHub::new(
        &config.router.hub_module,
        config.router.hub_queue_size,
    ));
    hub.add_module(&config.router.router_module);
    let transport: Arc<dyn HubTransport> = hub.clone();

    let router = EdgeRouter::new(
        config.router.clone(),
        Arc::clone(&transport),
        Arc::new(HubStatusReporter::new(Arc::clone(&transport))),
    );
    router.start().await;

    let store: &RuleStore = router.store();
    for endpoint in config.rule_endpoints {
        validate_rule_endpoint(store, &endpoint)
            .await
            .map_err(|source| ConfigError::Rejected {
                object: format!("rule endpoint {}", endpoint.key()),
                source,
            })?;
        store.add_endpoint(endpoint);
    }
    for rule in config.rules {
        validate_rule(store, &rule)
            .await
            .map_err(|source| ConfigError::Rejected {
                object: format!("rule {}", rule.key()),
                source,
            })?;
        store.add_rule_with_retry(&rule).await?;
    }

    // Nothing upstream consumes the hub module here, so log what would go to the cloud.
    let hub_module = config.router.hub_module.clone();
    let outbound = tokio::spawn(async move {
        while let Ok(envelope) = transport.receive(&hub_module).await {
            info!(
                msg_id = envelope.id(),
                resource = envelope.resource(),
                operation = envelope.operation(),
                "outbound hub message"
            );
        }
    });

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(err = %err, "unable to listen for shutdown signal");
    }

    info!("Stopping configurable-router");
    router.shutdown().await;
    hub.shutdown();
    let _ = outbound.await;

    Ok(())
}
