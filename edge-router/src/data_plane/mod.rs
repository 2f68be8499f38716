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

//! Data-plane layer.
//!
//! Moves traffic: the hub transport and gateway, the correlation table shared
//! between request and reply paths, the REST ingress, and rule dispatch.

pub mod correlation;
pub mod dispatcher;
pub mod hub;
pub mod hub_gateway;
pub mod rest_listener;
