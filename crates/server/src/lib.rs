//! AdOptima optimizer service
//!
//! HTTP front end for the budget allocation optimizer: runs optimizations
//! and scenario comparisons against the loaded revenue model and exposes
//! health, readiness and Prometheus metrics.

pub mod api;
pub mod config;
