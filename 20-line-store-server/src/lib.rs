//! Concurrent line-oriented TCP server over a shared append-only text store.
//!
//! Clients speak a two-command text protocol, `READ` and `WRITE:<payload>`,
//! one command per line. Every accepted connection runs its own session task
//! against the same [`store::LineStore`]. Each module owns one concern:
//!
//! - [`profile`] names the two deployments (`generic` and `logs`) and every
//!   piece of wording, seed data and framing that differs between them.
//! - [`store`] appends and reads whole lines of the backing file, serializing
//!   appends so concurrent writers never interleave inside a line.
//! - [`protocol`] parses client lines into commands and renders replies.
//! - [`session`] drives one connection from banner to disconnect.
//! - [`server`] binds the listener and spawns a session per connection.
//! - [`config`] and [`cli`] turn command-line flags into a server setup.
//! - [`client`] is a small terminal client for manual use.

pub mod cli;
pub mod client;
pub mod config;
pub mod profile;
pub mod protocol;
pub mod server;
pub mod session;
pub mod store;
