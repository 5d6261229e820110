//! Acquisition tracking for satellite products over configured areas of
//! interest: season-window resolution, per-site download configuration, and
//! a retry-limited download-history state machine backed by Postgres.

pub mod config;
pub mod domain;
pub mod errors;
pub mod history;
pub mod product;
pub mod repo;
pub mod season;
pub mod services;
