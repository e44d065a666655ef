//! Core library entry point that wires together the Hearth subsystems.
//!
//! Each module is intentionally kept lightweight so that the boundaries
//! between responsibilities remain obvious when exploring the codebase:
//! - [`api`] exposes the HTTP surface and the embedded single-page UI.
//! - [`crisis`] intercepts high-risk messages before any provider call.
//! - [`db`] initialises the SQLite diagnostics database and applies migrations.
//! - [`errors`] keeps the central error catalogue with human friendly metadata.
//! - [`logging`] writes structured diagnostics to the event log table.
//! - [`personas`] holds the static persona registry and the assessment table.
//! - [`provider`] talks to the hosted Gemini endpoint behind a trait seam.
//! - [`session`] owns the per-session conversation state machine.

pub mod api;
pub mod crisis;
pub mod db;
pub mod errors;
pub mod logging;
pub mod personas;
pub mod provider;
pub mod session;
