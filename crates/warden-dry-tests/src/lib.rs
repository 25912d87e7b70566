// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Warden crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`apps`] - Scripted application logic (fixed lists, reverts, throws)
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`engine`] - Engine builder and a ready-made single-instance fixture
//! - [`hashes`] - Principal, location, and seeded hash helpers

pub mod apps;
pub mod config;
pub mod engine;
pub mod hashes;

// Re-export commonly used items at crate root for convenience
pub use apps::{
    CounterApp, EchoPayloadApp, EmptyApp, RevertingApp, ScriptedApp, TextWriterApp, ThrowingApp,
};
pub use config::InMemoryConfigStore;
pub use engine::{initializer_app, EngineTestBuilder, InstanceFixture};
pub use hashes::{make_hash_from_seed, make_location, make_principal};
