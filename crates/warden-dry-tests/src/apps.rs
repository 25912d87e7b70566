// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scripted application logic for executor tests.
//!
//! Each double answers every call the same way (or derives its answer from
//! the payload), so tests can pin down exactly which action list the engine
//! sees.

use warden_core::{
    ActionList, AppRevert, ApplicationLogic, ExecContext, Selector, Slot, SlotValue,
    StorageLocation,
};

/// Returns a fixed action list on every call.
///
/// # Example
///
/// ```
/// use warden_core::{ActionList, Slot};
/// use warden_dry_tests::{make_location, ScriptedApp};
///
/// let mut list = ActionList::new();
/// list.store(make_location("k"), Slot::from_u128(1));
/// let app = ScriptedApp::new(list);
/// assert!(!app.bytes().is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct ScriptedApp {
    bytes: Vec<u8>,
}

impl ScriptedApp {
    /// Scripts `list`. A list that cannot be encoded scripts empty return data.
    pub fn new(list: ActionList) -> Self {
        Self {
            bytes: list.encode().unwrap_or_default(),
        }
    }

    /// Scripts raw return data, bypassing the encoder.
    pub fn raw(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The scripted return data.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl ApplicationLogic for ScriptedApp {
    fn handle(&self, _ctx: &ExecContext<'_>, _payload: &[u8]) -> Result<Vec<u8>, AppRevert> {
        Ok(self.bytes.clone())
    }
}

/// Returns everything after the selector as the action list.
///
/// Lets a test choose the return data per call through the payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoPayloadApp;

impl EchoPayloadApp {
    /// Builds a payload whose tail is `list`'s encoding.
    pub fn payload(selector: Selector, list: &ActionList) -> Vec<u8> {
        let mut out = selector.0.to_vec();
        out.extend(list.encode().unwrap_or_default());
        out
    }
}

impl ApplicationLogic for EchoPayloadApp {
    fn handle(&self, _ctx: &ExecContext<'_>, payload: &[u8]) -> Result<Vec<u8>, AppRevert> {
        Ok(payload.get(Selector::WIDTH..).unwrap_or_default().to_vec())
    }
}

/// Aborts every call.
#[derive(Clone, Debug, Default)]
pub struct RevertingApp {
    reason: Option<String>,
}

impl RevertingApp {
    /// Reverts with `reason`.
    pub fn with_reason(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_owned()),
        }
    }

    /// Reverts without a reason.
    pub fn silent() -> Self {
        Self::default()
    }
}

impl ApplicationLogic for RevertingApp {
    fn handle(&self, _ctx: &ExecContext<'_>, _payload: &[u8]) -> Result<Vec<u8>, AppRevert> {
        Err(AppRevert {
            reason: self.reason.clone(),
        })
    }
}

/// Reports a named exception on every call.
#[derive(Clone, Debug)]
pub struct ThrowingApp {
    message: String,
}

impl ThrowingApp {
    /// Throws `message`.
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}

impl ApplicationLogic for ThrowingApp {
    fn handle(&self, _ctx: &ExecContext<'_>, _payload: &[u8]) -> Result<Vec<u8>, AppRevert> {
        let mut list = ActionList::new();
        list.throw(self.message.clone());
        list.encode()
            .map_err(|e| AppRevert::with_reason(e.to_string()))
    }
}

/// Returns no return data at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyApp;

impl ApplicationLogic for EmptyApp {
    fn handle(&self, _ctx: &ExecContext<'_>, _payload: &[u8]) -> Result<Vec<u8>, AppRevert> {
        Ok(Vec::new())
    }
}

/// Increments an unsigned counter at a fixed location and emits the new
/// value as event data.
///
/// Reads through the execution context, so the count is per instance.
#[derive(Clone, Copy, Debug)]
pub struct CounterApp {
    location: StorageLocation,
}

impl CounterApp {
    /// Counter stored at `location`.
    pub fn new(location: StorageLocation) -> Self {
        Self { location }
    }
}

impl ApplicationLogic for CounterApp {
    fn handle(&self, ctx: &ExecContext<'_>, _payload: &[u8]) -> Result<Vec<u8>, AppRevert> {
        let current = ctx
            .read(&self.location)
            .to_u128()
            .ok_or_else(|| AppRevert::with_reason("counter slot is not a u128"))?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| AppRevert::with_reason("counter overflow"))?;
        let mut list = ActionList::new();
        list.store(self.location, Slot::from_u128(next))
            .emit(Vec::new(), next.to_le_bytes().to_vec());
        list.encode()
            .map_err(|e| AppRevert::with_reason(e.to_string()))
    }
}

/// Stores the payload tail (after the selector) as text at a fixed
/// location, encoded under the engine's value policy.
#[derive(Clone, Copy, Debug)]
pub struct TextWriterApp {
    location: StorageLocation,
}

impl TextWriterApp {
    /// Writes to `location`.
    pub fn new(location: StorageLocation) -> Self {
        Self { location }
    }
}

impl ApplicationLogic for TextWriterApp {
    fn handle(&self, ctx: &ExecContext<'_>, payload: &[u8]) -> Result<Vec<u8>, AppRevert> {
        let tail = payload.get(Selector::WIDTH..).unwrap_or_default();
        let text = String::from_utf8_lossy(tail).into_owned();
        let slot = ctx
            .encode(&SlotValue::Text(text))
            .map_err(|e| AppRevert::with_reason(e.to_string()))?;
        let mut list = ActionList::new();
        list.store(self.location, slot);
        list.encode()
            .map_err(|e| AppRevert::with_reason(e.to_string()))
    }
}
