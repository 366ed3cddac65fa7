pub mod config;
pub mod error;
pub mod journal;
pub mod mcp;
pub mod similarity;
pub mod submission_guard;
pub mod tools;
pub mod utils;
pub mod workflow;
