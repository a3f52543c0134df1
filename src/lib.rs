//! # RC Link Library
//!
//! Command-acquisition layer for flight-control firmware.
//!
//! This library turns an asynchronous, transport-specific stream of pilot-input
//! frames into a normalized, fixed-rate vector of flight demands, while
//! continuously supervising link health so the control loop can force a safe
//! fallback the instant the link looks suspect.

pub mod clock;
pub mod config;
pub mod decoder;
pub mod error;
pub mod handoff;
pub mod mapper;
pub mod protocol;
pub mod receiver;
pub mod supervisor;
