//! fsaccess-host: run drive operations against a local directory
//!
//! The binary grants a local directory as the drive root, executes one
//! request and prints the resulting model as JSON.

pub mod cli;
pub mod config;
