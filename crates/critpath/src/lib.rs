//! Critpath - schedule impact analysis for task graphs.
//!
//! The library computes critical paths over a task dependency graph, simulates
//! how a delay ripples downstream, keeps a cached impact snapshot current as
//! tasks change, and flags overdue work.
//!
//! # Layout
//!
//! - [`graph`], [`cpm`] and [`ripple`] are pure computations over a task slice.
//! - [`orchestrator`] debounces mutation signals into recalculations and
//!   enrichment, writing results through an [`cache::ImpactCache`].
//! - [`slippage`] sweeps for overdue tasks on a schedule.
//! - [`store`] defines the task collection seams and an in-memory store.

#![forbid(unsafe_code)]

// Domain and pure computations
pub mod domain;
pub mod error;
pub mod graph;
pub mod cpm;
pub mod ripple;

// Pipeline
pub mod analysis;
pub mod cache;
pub mod clock;
pub mod enrichment;
pub mod orchestrator;
pub mod slippage;
pub mod store;

// CLI support
pub mod app;
pub mod cli;
pub mod config;
pub mod output;

// Internal modules (not exposed as public API)
pub(crate) mod atomic;
