//! iTrash station library.
//!
//! Exposes the phase core, the hardware loop and the adapters so the
//! binary, integration tests and fuzz targets share one build.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod hardware_loop;
pub mod notifier;
pub mod scheduler;
pub mod sensors;
pub mod store;
pub mod system;
pub mod worker;
