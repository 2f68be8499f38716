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

//! Canonical structured field values and value-format helpers.

use crate::envelope::Envelope;

pub const NONE: &str = "none";

pub const REASON_ROLLBACK: &str = "rollback_after_register_failure";
pub const REASON_CHANNEL_FULL: &str = "channel_full";
pub const REASON_CHANNEL_CLOSED: &str = "channel_closed";
pub const REASON_PERIODIC: &str = "periodic";
pub const REASON_SAMPLE_LIMIT: &str = "sample_limit";
pub const REASON_FINAL: &str = "final";

/// Renders an envelope parent id, substituting [`NONE`] for originals.
pub fn format_parent_id(envelope: &Envelope) -> &str {
    if envelope.parent_id().is_empty() {
        NONE
    } else {
        envelope.parent_id()
    }
}

/// Renders the routing tuple as `source/group/operation -> resource`.
pub fn format_route(envelope: &Envelope) -> String {
    format!(
        "{}/{}/{} -> {}",
        envelope.source(),
        envelope.group(),
        envelope.operation(),
        envelope.resource()
    )
}

/// Joins a namespace and name into a store key.
pub fn format_object_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Envelope, Route};

    #[test]
    fn format_parent_id_uses_none_for_originals() {
        let original = Envelope::new(Route::new("a", "b", "c", "d")).build();
        let reply = Envelope::new(Route::new("a", "b", "c", "d"))
            .parent(&original)
            .build();

        assert_eq!(format_parent_id(&original), NONE);
        assert_eq!(format_parent_id(&reply), original.id());
    }

    #[test]
    fn format_route_is_stable() {
        let envelope = Envelope::new(Route::new("src", "grp", "node/n/t", "publish")).build();
        assert_eq!(format_route(&envelope), "src/grp/publish -> node/n/t");
    }
}
