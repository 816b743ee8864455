//! Shared test fixtures for ScoreForge crates.
//!
//! This crate provides domains, working solutions and reference score
//! functions for testing. It depends on `scoreforge-core` only, so the
//! scoring crate can use it as a dev-dependency.
//!
//! - [`scheduling`] - employees and shifts with skills and time windows
//! - [`nqueens`] - queens on a board, with naive conflict counting
//! - [`generator`] - seeded random schedules and moves
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! scoreforge-test = { workspace = true }
//! ```

pub mod generator;
pub mod nqueens;
pub mod scheduling;

pub use generator::{field_writes, ScheduleGenerator, ShiftMove};
pub use scheduling::Schedule;
