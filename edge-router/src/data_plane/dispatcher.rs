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

//! Rule dispatch: the per-request select for pulled REST traffic and the
//! delivery step for pushed event-bus traffic.

use crate::error::RouterError;
use crate::observability::events;
use crate::providers::{RuleBinding, TargetParams, TargetResponse};
use http::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMPONENT: &str = "dispatcher";

/// Status written when the client went away before the target answered.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

pub const TIMEOUT_BODY: &str = "timeout";

fn client_closed() -> StatusCode {
    StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::REQUEST_TIMEOUT)
}

/// Maps a target outcome to its REST response and records the rule result.
fn settle(
    binding: &RuleBinding,
    message_id: &str,
    outcome: Result<Option<TargetResponse>, RouterError>,
) -> Result<Option<TargetResponse>, RouterError> {
    let outcome = match outcome {
        Ok(Some(response)) if !response.status.is_success() => Err(RouterError::Dispatch(
            String::from_utf8_lossy(&response.body).into_owned(),
        )),
        other => other,
    };

    match &outcome {
        Ok(_) => {
            binding.record_success();
            debug!(
                event = events::DISPATCH_OK,
                component = COMPONENT,
                rule = binding.rule_id(),
                namespace = binding.namespace(),
                msg_id = message_id,
                "target delivery succeeded"
            );
        }
        Err(err) => {
            binding.record_failure(err);
            warn!(
                event = events::DISPATCH_FAILED,
                component = COMPONENT,
                rule = binding.rule_id(),
                namespace = binding.namespace(),
                msg_id = message_id,
                err = %err,
                "target delivery failed"
            );
        }
    }
    outcome
}

/// Pull flow: races the target against the request deadline and the client.
///
/// The target future is polled inline, so it is dropped together with any
/// correlation guard it holds as soon as the deadline or the client wins.
pub async fn forward_request(
    binding: &RuleBinding,
    params: TargetParams,
    timeout: Duration,
    client: CancellationToken,
) -> TargetResponse {
    let message_id = params.message_id.clone();
    let stop = CancellationToken::new();
    let delivery = binding.target().go_to_target(params, Some(stop.clone()));
    tokio::pin!(delivery);

    tokio::select! {
        biased;
        outcome = &mut delivery => match settle(binding, &message_id, outcome) {
            Ok(Some(response)) => response,
            Ok(None) => TargetResponse::delivered(),
            Err(err) => TargetResponse::text(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        },
        _ = tokio::time::sleep(timeout) => {
            stop.cancel();
            info!(
                event = events::DISPATCH_TIMEOUT,
                component = COMPONENT,
                rule = binding.rule_id(),
                namespace = binding.namespace(),
                msg_id = message_id.as_str(),
                timeout_ms = timeout.as_millis() as u64,
                "target did not answer before the deadline"
            );
            TargetResponse::text(StatusCode::REQUEST_TIMEOUT, TIMEOUT_BODY)
        }
        _ = client.cancelled() => {
            stop.cancel();
            info!(
                event = events::DISPATCH_CLIENT_GONE,
                component = COMPONENT,
                rule = binding.rule_id(),
                namespace = binding.namespace(),
                msg_id = message_id.as_str(),
                "client went away before the target answered"
            );
            TargetResponse::text(client_closed(), RouterError::Cancelled.to_string())
        }
    }
}

/// Push flow: delivers without a deadline and records the result.
pub async fn deliver(
    binding: &RuleBinding,
    params: TargetParams,
) -> Result<Option<TargetResponse>, RouterError> {
    let message_id = params.message_id.clone();
    let outcome = binding.target().go_to_target(params, None).await;
    settle(binding, &message_id, outcome)
}
