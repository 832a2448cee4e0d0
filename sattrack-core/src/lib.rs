//! Core runtime for satellite-tracking modules.
//!
//! A *module* is a named collection of tracked satellites, a ground-station
//! record and a set of registered views, driven by a simulation-time
//! controller that maps wall-clock ticks onto simulated Julian day numbers.
//! Orbital mechanics live behind the [`sat::SatDataSource`] trait; rendering
//! lives behind the [`view::View`] trait. This crate owns everything in
//! between.

pub mod config;
pub mod module;
pub mod qth;
pub mod sat;
pub mod time;
pub mod timectl;
pub mod view;

pub use config::{ModuleConfig, Preferences};
pub use module::{Module, ModuleError, ModuleState};
pub use qth::Qth;
pub use sat::{SatDataSource, SatelliteRecord};
pub use timectl::{TimeController, TimeMode};
pub use view::{View, ViewKind};
