//! # ParGaMD Core Library
//!
//! Generates the complete, internally consistent file bundle needed to launch a
//! ParGaMD run (WESTPA weighted ensemble driving AMBER GaMD segments) from a
//! validated parameter record and optional uploaded structure/topology files.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Stateless building blocks: bin-boundary
//!   discretization, collective-variable definitions and their `cpptraj` command
//!   fragments, uploaded-file decoding, the output bundle model, the auxiliary
//!   file catalogue and one structured render function per generated artifact.
//!
//! - **[`engine`]: The Boundary.** Validated configuration (`ParameterRecord`
//!   and its builder), error types, progress reporting and the warning signals
//!   emitted whenever the generator silently recovers from questionable input.
//!
//! - **[`workflows`]: The Public API.** Ties `engine` and `core` together into a
//!   single `generate` call that returns the bundle and its diagnostics.
//!
//! The [`session`] module models the multi-step form draft that front ends keep
//! between requests, with an explicit step transition table.

pub mod core;
pub mod engine;
pub mod session;
pub mod workflows;
