#![doc = "nvim-sync-core: core logic library for nvim-sync."]

//! This crate contains the configuration synchronisation engine: entry file
//! detection, lazy content traversal, the text extractors and the orchestration
//! that reconciles their results into a persisted configuration record.
//!
//! Remote fetching and persistence are collaborators behind the traits in
//! [`contract`]. Concrete implementations for GitHub ([`github`]) and a local
//! JSON store ([`store`]) live here too, so the CLI crate stays glue only.
//!
//! # Usage
//! Build a [`synchronise::SyncerFactory`] from a plugin catalog and the
//! collaborators, create a syncer per configuration and call `sync()`.

pub mod config;
pub mod contract;
pub mod error;
pub mod github;
pub mod language_servers;
pub mod leader_key;
pub mod locate;
pub mod plugin_refs;
pub mod store;
pub mod synchronise;
pub mod traverse;

pub use error::SyncError;
