//! Azora Quota - Multi-tenant usage quota and tier enforcement service
//!
//! This crate gates quota-limited actions (AI requests, storage, active
//! courses and projects) against per-tier monthly limits, tracking
//! consumption in a durable ledger with atomic increment-and-check semantics.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
