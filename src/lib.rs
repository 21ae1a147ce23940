//! Lala Library
//!
//! Core modules for the Lala voice assistant: simulated device bridge,
//! speech services, planner and AI router contracts, and the assistant
//! pipeline that ties them together.

pub mod actions;
pub mod api;
pub mod asr;
pub mod assistant;
pub mod bridge;
pub mod config;
pub mod error;
pub mod ipc;
pub mod models;
pub mod planner;
pub mod router;
pub mod tts;
