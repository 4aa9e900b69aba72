//! Reports how much changed, and who changed it, across a set of local git
//! repositories within a recent time window.

pub mod analyze;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod report;
pub mod util;
