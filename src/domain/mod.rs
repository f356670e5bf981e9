//! Domain layer containing the interception model and its pure algorithms.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, events, errors)
//! - `action` - Typed action context and outcomes
//! - `hooks` - Hook definitions, handler traits, chain results
//! - `telemetry` - Ring buffers and history records
//! - `patterns` - Failure pattern extraction and decay
//! - `risk` - Risk scoring against a pattern snapshot
//! - `coverage` - Event catalog and coverage/gap computation

pub mod action;
pub mod coverage;
pub mod foundation;
pub mod hooks;
pub mod patterns;
pub mod risk;
pub mod telemetry;
