//! Admin client for a user-management backend: paginated listing with
//! signature verification, statistics, and JSON or protobuf exports.

pub mod cache;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod controllers;
pub mod decoder;
pub mod error;
pub mod output;
pub mod responses;
pub mod retry;
pub mod session;
pub mod types;
