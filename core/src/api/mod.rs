//! HTTP surface served to the single-page UI.
//!
//! Versioned modules (currently `v1`) group related routes to keep the
//! interface stable while we iterate on the implementation details.

pub mod page;
pub mod v1;
