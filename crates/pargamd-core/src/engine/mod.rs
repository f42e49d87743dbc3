//! # Engine Module
//!
//! The validated boundary of the generator.
//!
//! - **Configuration** ([`config`]) - `ParameterRecord`, its builder and scheduler options
//! - **Error Handling** ([`error`]) - Errors surfaced to callers of the workflow
//! - **Diagnostics** ([`diagnostics`]) - Warnings for inputs the generator silently repaired
//! - **Progress Monitoring** ([`progress`]) - Progress events for front ends

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod progress;
