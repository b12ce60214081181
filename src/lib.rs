//! Profitability analytics for retail order datasets.
//!
//! The [`pipeline`] normalizes raw orders, filters them, and computes the
//! aggregates, loss drilldowns and KPIs that every presentation shares.
//! [`views`] assembles those into the three dashboard layouts, which the
//! [`cli`] prints and the [`web`] server exposes as JSON.

pub mod cli;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod views;
pub mod web;
