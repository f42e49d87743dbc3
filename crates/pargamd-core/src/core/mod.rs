//! # Core Module
//!
//! Stateless building blocks of the configuration generator.
//!
//! - **Discretization** ([`bins`]) - Bin boundaries for each progress coordinate
//! - **Collective Variables** ([`cv`]) - CV kinds, specs and `cpptraj` command dispatch
//! - **Uploads** ([`uploads`]) - Uploaded structure/topology/restart blobs
//! - **Bundle** ([`bundle`]) - The path-to-content mapping handed back to callers
//! - **Auxiliary Files** ([`auxiliary`]) - Expected helper files, fallback lookup and placeholders
//! - **Templates** ([`templates`]) - Render functions for every generated artifact

pub mod auxiliary;
pub mod bins;
pub mod bundle;
pub mod cv;
pub mod templates;
pub mod uploads;
