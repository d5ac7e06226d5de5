//! # Lorebook - Embedded Versioned Record Store
//!
//! Lorebook is a lightweight, embedded store for a catalogue of typed
//! records ("things") and loose key-value settings, built around a
//! versioned schema migration engine. Each schema version declares its
//! table and index definitions plus an optional per-record transform; on
//! open, the store is upgraded version by version from whatever it was
//! last persisted at, and each transform runs exactly once over the data
//! that existed before its version.
//!
//! ## Key Features
//!
//! - **Embedded**: No separate server process required
//! - **Versioned Schema**: Ordered schema versions with one-shot
//!   per-record transforms
//! - **Atomic Upgrades**: Each version commits entirely or not at all
//! - **Unique Keys**: Declared unique fields are enforced on every write
//! - **Forgiving Surface**: Accessors flatten storage faults into empty
//!   reads and boolean write results
//! - **Clean API**: PIMPL pattern provides stable, encapsulated interface
//!
//! ## Quick Start
//!
//! ```rust
//! use lorebook::{DataStoreBuilder, Thing, Value};
//!
//! // Open an in-memory store at the latest schema version
//! let store = DataStoreBuilder::new().open().unwrap();
//!
//! // Save a record
//! let mut penelope = Thing::new("Penelope", "Npc");
//! penelope.set_field("gender", "feminine").unwrap();
//! assert!(store.save_thing(&penelope));
//!
//! // Look it up again
//! let loaded = store.get_thing(&penelope.uuid()).unwrap();
//! assert_eq!(loaded.name(), "Penelope");
//!
//! // Loose settings live next to the records
//! assert!(store.set_value("time", Value::from("11:59pm")));
//! ```
//!
//! ## Module Organization
//!
//! - [`builder`] - Store builder for initialization and migration
//! - [`common`] - Common types, field names, and the [Value] type
//! - [`data_store`] - The application-facing accessor surface
//! - [`document`] - Open record documents and the [doc!] macro
//! - [`errors`] - Error types and result definitions
//! - [`migration`] - The open-time migration driver
//! - [`schema`] - Schema registry, version specs, and the built-in history
//! - [`store`] - Storage backend traits and the in-memory backend
//! - [`thing`] - The typed record facade

pub mod builder;
pub mod common;
pub mod data_store;
pub mod document;
pub mod errors;
pub mod migration;
pub mod schema;
pub mod store;
pub mod thing;

pub use builder::DataStoreBuilder;
pub use common::Value;
pub use data_store::DataStore;
pub use document::Document;
pub use errors::{ErrorKind, StoreError, StoreResult};
pub use thing::Thing;
