//! # renotrack
//!
//! Project tracking for renovation and construction work. Projects are broken
//! into task trees, time is logged against leaf tasks, and completion dates
//! are projected over a working calendar (work days, holidays and per-date
//! overrides) so every project can be flagged as normal, tense or overdue.
//!
//! The engine modules ([`duration`], [`calendar`], [`progress`], [`estimate`],
//! [`status`]) are pure functions over in-memory data. [`storage`],
//! [`commands`] and [`tui`] load a JSON snapshot and present the results.

pub mod calendar;
pub mod commands;
pub mod config;
pub mod duration;
pub mod error;
pub mod estimate;
pub mod models;
pub mod progress;
pub mod status;
pub mod storage;
pub mod tui;
