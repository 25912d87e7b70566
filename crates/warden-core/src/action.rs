// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Action lists: the side effects an application asks the executor to apply.
//!
//! Applications never mutate state. They return an encoded [`ActionList`];
//! the executor decodes it into an [`ActionPlan`] and applies the plan.
//!
//! # Wire format
//!
//! A list is a sequence of actions, each `tag:u32le || count:u32le || body`:
//!
//! | tag | body |
//! |---|---|
//! | `STOR` | `count × (location[32] ‖ value[32])` |
//! | `PAYS` | `count × (destination[32] ‖ amount:u128le)` |
//! | `EMIT` | `count × (topic_count:u8 ‖ topics[32]×topic_count ‖ len:u32le ‖ data)` |
//! | `THRW` | `count = 1`, then `len:u32le ‖ utf-8 message` |
//!
//! Trailing bytes after the last action are rejected.
use thiserror::Error;

use crate::codec::{CodecError, Reader, Writer};
use crate::config::ActionLimits;
use crate::constants::{
    ACTION_HEADER_LEN, MAX_EVENT_TOPICS, TAG_EMITS, TAG_PAYS, TAG_STORES, TAG_THROWS,
};
use crate::ident::{Hash, PrincipalId, StorageLocation};
use crate::slot::Slot;

/// An application-chosen notification, re-emitted by the executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppEvent {
    /// Up to [`MAX_EVENT_TOPICS`] topics, in the application's order.
    pub topics: Vec<Hash>,
    /// Opaque event payload.
    pub data: Vec<u8>,
}

/// One declared side effect group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Slot writes, applied in order.
    Stores(Vec<(StorageLocation, Slot)>),
    /// Value payouts, applied in order.
    Pays(Vec<(PrincipalId, u128)>),
    /// Application events, emitted in order.
    Emits(Vec<AppEvent>),
    /// A named application exception; must be the only action.
    Throws(String),
}

/// Why an action list was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The list declares no actions at all.
    #[error("action list is empty")]
    Empty,
    /// An action declared zero entries.
    #[error("action {index} declares no entries")]
    EmptyAction {
        /// Position of the offending action.
        index: usize,
    },
    /// Unrecognised action tag.
    #[error("unknown action tag {tag:#010x} at action {index}")]
    UnknownTag {
        /// Raw tag value.
        tag: u32,
        /// Position of the offending action.
        index: usize,
    },
    /// An event declared more than [`MAX_EVENT_TOPICS`] topics.
    #[error("event declares {count} topics (max 4)")]
    TooManyTopics {
        /// Declared topic count.
        count: usize,
    },
    /// A `THRW` action appeared alongside other actions or with `count != 1`.
    #[error("exception must be the only action and carry exactly one message")]
    MisplacedThrow,
    /// More actions than [`ActionLimits::max_actions`].
    #[error("action list exceeds {max} actions")]
    TooManyActions {
        /// Configured bound.
        max: usize,
    },
    /// More entries than [`ActionLimits::max_entries_per_action`].
    #[error("action {index} exceeds {max} entries")]
    TooManyEntries {
        /// Position of the offending action.
        index: usize,
        /// Configured bound.
        max: usize,
    },
    /// Bytes remain after the last complete action.
    #[error("{0} trailing bytes after action list")]
    TrailingBytes(usize),
    /// Truncated or oversized field.
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

/// Builder and wire representation of an ordered action list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions in submitted order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Appends a whole action.
    pub fn push(&mut self, action: Action) -> &mut Self {
        self.actions.push(action);
        self
    }

    /// Appends a slot write, extending a trailing `Stores` action if present.
    pub fn store(&mut self, location: StorageLocation, value: Slot) -> &mut Self {
        if let Some(Action::Stores(pairs)) = self.actions.last_mut() {
            pairs.push((location, value));
        } else {
            self.actions.push(Action::Stores(vec![(location, value)]));
        }
        self
    }

    /// Appends a payout, extending a trailing `Pays` action if present.
    pub fn pay(&mut self, destination: PrincipalId, amount: u128) -> &mut Self {
        if let Some(Action::Pays(pairs)) = self.actions.last_mut() {
            pairs.push((destination, amount));
        } else {
            self.actions.push(Action::Pays(vec![(destination, amount)]));
        }
        self
    }

    /// Appends an event, extending a trailing `Emits` action if present.
    pub fn emit(&mut self, topics: Vec<Hash>, data: Vec<u8>) -> &mut Self {
        let event = AppEvent { topics, data };
        if let Some(Action::Emits(events)) = self.actions.last_mut() {
            events.push(event);
        } else {
            self.actions.push(Action::Emits(vec![event]));
        }
        self
    }

    /// Appends an exception action.
    pub fn throw(&mut self, message: impl Into<String>) -> &mut Self {
        self.actions.push(Action::Throws(message.into()));
        self
    }

    /// Encodes the list to its wire form.
    ///
    /// Encoding does not validate; a list the decoder would reject (for
    /// example one with five topics) still encodes so fixtures can exercise
    /// the rejection paths.
    ///
    /// # Errors
    /// [`CodecError::LengthTooLarge`] if a count or byte length exceeds `u32`.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = Writer::with_capacity(ACTION_HEADER_LEN * self.actions.len().max(1));
        for action in &self.actions {
            match action {
                Action::Stores(pairs) => {
                    write_header(&mut w, TAG_STORES, pairs.len())?;
                    for (location, value) in pairs {
                        w.write_bytes(&location.0);
                        w.write_bytes(&value.0);
                    }
                }
                Action::Pays(pairs) => {
                    write_header(&mut w, TAG_PAYS, pairs.len())?;
                    for (destination, amount) in pairs {
                        w.write_bytes(&destination.0);
                        w.write_u128_le(*amount);
                    }
                }
                Action::Emits(events) => {
                    write_header(&mut w, TAG_EMITS, events.len())?;
                    for event in events {
                        let n = u8::try_from(event.topics.len())
                            .map_err(|_| CodecError::LengthTooLarge)?;
                        w.write_u8(n);
                        for topic in &event.topics {
                            w.write_bytes(topic);
                        }
                        w.write_len_prefixed_bytes(&event.data)?;
                    }
                }
                Action::Throws(message) => {
                    write_header(&mut w, TAG_THROWS, 1)?;
                    w.write_len_prefixed_bytes(message.as_bytes())?;
                }
            }
        }
        Ok(w.into_vec())
    }

    /// Decodes and validates a wire-form list against `limits`.
    ///
    /// # Errors
    /// Any [`ActionError`]; see the variant docs.
    pub fn decode(bytes: &[u8], limits: &ActionLimits) -> Result<ActionPlan, ActionError> {
        let mut r = Reader::new(bytes);
        let mut actions: Vec<Action> = Vec::new();
        while r.remaining() > 0 {
            if r.remaining() < ACTION_HEADER_LEN {
                return Err(ActionError::TrailingBytes(r.remaining()));
            }
            let index = actions.len();
            if index >= limits.max_actions {
                return Err(ActionError::TooManyActions {
                    max: limits.max_actions,
                });
            }
            let tag = r.read_u32_le()?;
            let count = r.read_u32_le()? as usize;
            if count == 0 {
                return Err(ActionError::EmptyAction { index });
            }
            if count > limits.max_entries_per_action {
                return Err(ActionError::TooManyEntries {
                    index,
                    max: limits.max_entries_per_action,
                });
            }
            let action = match tag {
                TAG_STORES => Action::Stores(decode_stores(&mut r, count)?),
                TAG_PAYS => Action::Pays(decode_pays(&mut r, count)?),
                TAG_EMITS => Action::Emits(decode_emits(&mut r, count, limits)?),
                TAG_THROWS => {
                    if count != 1 {
                        return Err(ActionError::MisplacedThrow);
                    }
                    Action::Throws(r.read_string(limits.max_message_len)?)
                }
                other => return Err(ActionError::UnknownTag { tag: other, index }),
            };
            actions.push(action);
        }
        ActionPlan::classify(actions)
    }
}

fn write_header(w: &mut Writer, tag: u32, count: usize) -> Result<(), CodecError> {
    let count = u32::try_from(count).map_err(|_| CodecError::LengthTooLarge)?;
    w.write_u32_le(tag);
    w.write_u32_le(count);
    Ok(())
}

fn decode_stores(
    r: &mut Reader<'_>,
    count: usize,
) -> Result<Vec<(StorageLocation, Slot)>, ActionError> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let location = StorageLocation(r.read_word()?);
        let value = Slot(r.read_word()?);
        out.push((location, value));
    }
    Ok(out)
}

fn decode_pays(r: &mut Reader<'_>, count: usize) -> Result<Vec<(PrincipalId, u128)>, ActionError> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let destination = PrincipalId(r.read_word()?);
        let amount = r.read_u128_le()?;
        out.push((destination, amount));
    }
    Ok(out)
}

fn decode_emits(
    r: &mut Reader<'_>,
    count: usize,
    limits: &ActionLimits,
) -> Result<Vec<AppEvent>, ActionError> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let n = usize::from(r.read_u8()?);
        if n > MAX_EVENT_TOPICS {
            return Err(ActionError::TooManyTopics { count: n });
        }
        let mut topics = Vec::with_capacity(n);
        for _ in 0..n {
            topics.push(r.read_word()?);
        }
        let data = r.read_len_prefixed_bytes(limits.max_event_data)?.to_vec();
        out.push(AppEvent { topics, data });
    }
    Ok(out)
}

/// A decoded, validated action list ready for application.
///
/// Effects are regrouped by kind in submitted order, which is also the
/// commit order: stores, then events, then payouts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionPlan {
    /// Apply these effects.
    Effects(Effects),
    /// Apply nothing; report the application's named exception.
    Exception(String),
}

/// The effect groups of a non-exception plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Effects {
    /// Slot writes in submitted order.
    pub stores: Vec<(StorageLocation, Slot)>,
    /// Events in submitted order.
    pub emits: Vec<AppEvent>,
    /// Payouts in submitted order.
    pub pays: Vec<(PrincipalId, u128)>,
}

impl Effects {
    /// Sum of all payout amounts, or `None` on overflow.
    #[must_use]
    pub fn total_payout(&self) -> Option<u128> {
        self.pays
            .iter()
            .try_fold(0u128, |acc, (_, amount)| acc.checked_add(*amount))
    }
}

impl ActionPlan {
    fn classify(actions: Vec<Action>) -> Result<Self, ActionError> {
        if actions.is_empty() {
            return Err(ActionError::Empty);
        }
        let throws = actions
            .iter()
            .filter(|a| matches!(a, Action::Throws(_)))
            .count();
        if throws > 0 {
            if actions.len() != 1 {
                return Err(ActionError::MisplacedThrow);
            }
            if let Some(Action::Throws(message)) = actions.into_iter().next() {
                return Ok(Self::Exception(message));
            }
            return Err(ActionError::MisplacedThrow);
        }
        let mut effects = Effects::default();
        for action in actions {
            match action {
                Action::Stores(pairs) => effects.stores.extend(pairs),
                Action::Pays(pairs) => effects.pays.extend(pairs),
                Action::Emits(events) => effects.emits.extend(events),
                Action::Throws(_) => return Err(ActionError::MisplacedThrow),
            }
        }
        Ok(Self::Effects(effects))
    }
}
