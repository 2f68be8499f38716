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

//! Canonical structured event names used across `edge-router`.

// Hub gateway events.
pub const HUB_RECEIVE: &str = "hub_receive";
pub const HUB_RECEIVE_FAILED: &str = "hub_receive_failed";
pub const HUB_SEND_FAILED: &str = "hub_send_failed";
pub const HUB_REPLY_COMPLETED: &str = "hub_reply_completed";
pub const HUB_REPLY_UNMATCHED: &str = "hub_reply_unmatched";
pub const HUB_DISPATCH_NO_HANDLER: &str = "hub_dispatch_no_handler";
pub const HUB_HANDLER_FAILED: &str = "hub_handler_failed";
pub const HUB_HANDLER_REGISTER: &str = "hub_handler_register";
pub const HUB_HANDLER_UNREGISTER: &str = "hub_handler_unregister";
pub const HUB_DRAIN_START: &str = "hub_drain_start";
pub const HUB_DRAIN_STOP: &str = "hub_drain_stop";

// REST ingress events.
pub const REST_LISTENER_BIND_OK: &str = "rest_listener_bind_ok";
pub const REST_LISTENER_BIND_FAILED: &str = "rest_listener_bind_failed";
pub const REST_LISTENER_STOPPED: &str = "rest_listener_stopped";
pub const REST_ROUTE_ADD: &str = "rest_route_add";
pub const REST_ROUTE_REMOVE: &str = "rest_route_remove";
pub const REST_REQUEST_MALFORMED: &str = "rest_request_malformed";
pub const REST_REQUEST_NO_MATCH: &str = "rest_request_no_match";
pub const REST_REQUEST_BODY_FAILED: &str = "rest_request_body_failed";
pub const REST_RESPONSE: &str = "rest_response";

// Dispatch events.
pub const DISPATCH_OK: &str = "dispatch_ok";
pub const DISPATCH_FAILED: &str = "dispatch_failed";
pub const DISPATCH_TIMEOUT: &str = "dispatch_timeout";
pub const DISPATCH_CLIENT_GONE: &str = "dispatch_client_gone";
pub const EVENTBUS_PUBLISH: &str = "eventbus_publish";
pub const EVENTBUS_ACK_SENT: &str = "eventbus_ack_sent";
pub const EVENTBUS_ACK_FAILED: &str = "eventbus_ack_failed";
pub const EVENTBUS_SUBSCRIBE: &str = "eventbus_subscribe";
pub const EVENTBUS_UNSUBSCRIBE: &str = "eventbus_unsubscribe";
pub const SERVICEBUS_REQUEST: &str = "servicebus_request";

// Control-plane lifecycle events.
pub const ENDPOINT_UPSERT: &str = "endpoint_upsert";
pub const ENDPOINT_DELETE: &str = "endpoint_delete";
pub const RULE_ADD_START: &str = "rule_add_start";
pub const RULE_ADD_OK: &str = "rule_add_ok";
pub const RULE_ADD_RETRY: &str = "rule_add_retry";
pub const RULE_ADD_FAILED: &str = "rule_add_failed";
pub const RULE_DELETE_OK: &str = "rule_delete_ok";
pub const RULE_DELETE_MISSING: &str = "rule_delete_missing";
pub const RULE_DELETE_FAILED: &str = "rule_delete_failed";
pub const CONTROLLER_UNKNOWN_OPERATION: &str = "controller_unknown_operation";
pub const ADMISSION_DENIED: &str = "admission_denied";

// Runtime events.
pub const ROUTER_START: &str = "router_start";
pub const ROUTER_SHUTDOWN: &str = "router_shutdown";
pub const STATUS_FLUSH: &str = "status_flush";
pub const STATUS_RESULT_DROPPED: &str = "status_result_dropped";
pub const STATUS_AGGREGATOR_STOP: &str = "status_aggregator_stop";
