// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Warden hosts.
//! Keeps storage adapters thin: a [`config::ConfigStore`] moves raw blobs,
//! [`config::ConfigService`] handles JSON, and [`engine_config`] turns the
//! result into a validated [`warden_core::EngineConfig`].

pub mod config;
pub mod engine_config;
