// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! warden-core: permissioned, namespaced key-value engine with a gated
//! application executor.
//!
//! Applications are registered logic that never mutates state directly. The
//! [`Engine`] authorizes each call against an instance's metadata, invokes
//! the target with a read-only view of the instance namespace, decodes the
//! returned [`ActionList`], and applies the requested stores, payouts, and
//! events all at once or not at all.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod action;
mod application;
mod codec;
mod config;
mod constants;
mod engine_impl;
mod event;
mod ident;
mod instance;
mod ledger;
mod receipt;
mod registry;
mod slot;
mod snapshot;
mod store;

// Re-exports for stable public API
/// Action lists returned by applications and their decoded form.
pub use action::{Action, ActionError, ActionList, ActionPlan, AppEvent, Effects};
/// Application logic seam and its read-only execution view.
pub use application::{AppDirectory, AppRevert, ApplicationLogic, ExecContext};
/// Little-endian wire codec.
pub use codec::{CodecError, Reader, Writer};
/// Engine configuration.
pub use config::{ActionLimits, EngineConfig};
/// Wire tags and digest format versions.
pub use constants::{
    ACTION_HEADER_LEN, MAX_EVENT_TOPICS, RECEIPT_FORMAT_VERSION, STATE_FORMAT_VERSION,
    TAG_EMITS, TAG_PAYS, TAG_STORES, TAG_THROWS,
};
/// Gated execution engine.
pub use engine_impl::{Engine, EngineError};
/// Host-level notifications.
pub use event::{EventLog, LoggedNotification, Notification};
/// Identifiers and storage location derivation.
pub use ident::{
    location_with_seed, make_instance_id, make_principal_id, namespaced_location, true_location,
    Hash, InstanceId, PrincipalId, Selector, StorageLocation,
};
/// Instance metadata and administration.
pub use instance::{InstanceRecord, InstanceRegistry, InstanceSpec};
/// Native value ledger.
pub use ledger::{Ledger, LedgerError};
/// Execution receipts.
pub use receipt::{ExecDisposition, ExecReceipt, ExecSummary};
/// Application / version / function registry.
pub use registry::{
    AppInfo, FunctionInfo, FunctionSelector, RegistryError, VersionConsole, VersionImplementation,
    VersionInfo,
};
/// Fixed-width storage values.
pub use slot::{OverflowPolicy, Slot, SlotError, SlotValue, ValuePolicy, SLOT_WIDTH};
/// State capture and restore.
pub use snapshot::{SnapshotError, StateSnapshot};
/// Keyed store over true locations.
pub use store::KeyedStore;
