//! Stops an iterative run when an operator drops a sentinel file into the
//! case directory.

pub mod abort;
pub mod config;
pub mod expand;
pub mod function_object;
pub mod parallel;
pub mod runner;
pub mod time;
