// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine configuration.
use serde::{Deserialize, Serialize};

use crate::slot::ValuePolicy;

/// Upper bounds on the work a single call may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionLimits {
    /// Maximum number of actions in one returned list.
    pub max_actions: usize,
    /// Maximum number of entries inside one action.
    pub max_entries_per_action: usize,
    /// Maximum byte length of one emitted event's data.
    pub max_event_data: usize,
    /// Maximum byte length of an exception message.
    pub max_message_len: usize,
}

impl Default for ActionLimits {
    fn default() -> Self {
        Self {
            max_actions: 32,
            max_entries_per_action: 256,
            max_event_data: 16 * 1024,
            max_message_len: 1024,
        }
    }
}

/// Top-level engine configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Action-list bounds.
    pub limits: ActionLimits,
    /// Typed-write overflow policy.
    pub values: ValuePolicy,
}

impl EngineConfig {
    /// Returns the name of the first limit set to zero, if any.
    ///
    /// A zero limit would make every call fail, so loaders treat it as a
    /// configuration error.
    #[must_use]
    pub fn zero_limit(&self) -> Option<&'static str> {
        let l = &self.limits;
        [
            ("max_actions", l.max_actions),
            ("max_entries_per_action", l.max_entries_per_action),
            ("max_event_data", l.max_event_data),
            ("max_message_len", l.max_message_len),
        ]
        .into_iter()
        .find_map(|(name, v)| (v == 0).then_some(name))
    }
}
