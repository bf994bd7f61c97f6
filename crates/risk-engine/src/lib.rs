//! Risk model scoring and lifecycle engine for the due-diligence case platform.
//!
//! The crate owns everything between the settings UI and the persisted rating:
//! model definitions with their tier bands and factor tables, the composite
//! scorer, the background test/publish runs, and the scope map that routes an
//! entity to the model governing its current rating.

pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;
