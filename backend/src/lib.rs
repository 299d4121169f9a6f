//! Media Suite Backend Library
//!
//! Simulated multimedia processing: four agents run in sequence over a
//! submitted file, talk over an A2A message bus, and their results can be
//! exported as downloads. The server binary is in `src/main.rs`; the desktop
//! dashboard drives the same pipeline through this library.

pub mod agents;
pub mod api;
pub mod config;
pub mod downloads;
pub mod error;
pub mod pipeline;
pub mod protocol;
/// Application state management
///
/// Agent cards, the job store, static agent profiles and SQLite persistence.
pub mod state;
pub mod websocket;
