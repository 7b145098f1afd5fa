//! Weekly calendar for tracking recurring tasks against a small set of
//! annual goals. Task instances are placed on a 7-day hour grid, persisted
//! per week, and rolled up into per-category completion percentages and a
//! multi-week trend series.
//!

pub mod calendar;
pub mod cli;
pub mod config;
pub mod notify;
pub mod utils;
