//! Analysis logic for heap trees
//!
//! This module contains pure business logic over built trees, separated from
//! presentation in the CLI.

pub mod allocation_sites;

pub use allocation_sites::{analyze_allocation_sites, AllocationSite};
