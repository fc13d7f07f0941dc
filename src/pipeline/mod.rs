//! Render Pipeline
//!
//! This module drives render cycles for a mounted root and carries their
//! results to the host.
//!
//! # Pipeline Architecture
//!
//! ```text
//! trigger → render (engine) → diff → order → dispatch (host) → effects
//!    ▲                                                            │
//!    └──────────────── setters (queued while busy) ◄──────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. **scheduler** - Tracks the cycle phase and queues updates made mid-cycle
//! 2. **mount** - Owns the root and its render effect, runs cycles
//! 3. **dispatch** - Maps paths to host handles and applies patches
//!
//! ## Key Design Principles
//!
//! - **One Effect**: a single `spark_signals` effect per root re-renders it
//! - **Whole Cycles**: a cycle never observes a state change half way through
//! - **Host Last**: the engine computes everything before the host is touched

pub mod config;
pub mod dispatch;
pub mod mount;
pub mod scheduler;

// Re-exports
pub use config::RuntimeConfig;
pub use dispatch::Dispatcher;
pub use mount::{mount, mount_with, subscribe, CommitCallback, MountHandle, Subscription};
pub use scheduler::{CyclePhase, Scheduler};
