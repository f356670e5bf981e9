//! PRISM Guard - Call interception and predictive failure prevention
//!
//! This crate sits in front of dispatchable actions. Registered hooks run
//! before and after every call and may veto it; action outcomes are
//! recorded and mined into failure patterns that feed a real-time risk
//! assessment.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
