//! idmef_db library - IDMEF alert and heartbeat storage
//!
//! Provides a backend-agnostic database layer for IDMEF messages (SQLite and
//! PostgreSQL drivers, result cursors, value decoding), the message formats
//! that map messages and queries onto SQL, and the command and output
//! infrastructure of the `idmef_db` admin tool.

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod format;
pub mod idmef;
pub mod output;

#[macro_use]
pub mod test_macros;

#[cfg(test)]
pub mod test_utils;
