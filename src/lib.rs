//! Valuation operator library surface.
//!
//! The binary (`src/main.rs`) wires these pieces together: a [`scheduler::PollScheduler`]
//! drives a [`poller::TaskPoller`], which walks new blocks in bounded chunks, dedups
//! task events, asks the scoring pipeline for a valuation and submits a signed response.

pub mod chain;
pub mod classifier;
pub mod dedup;
pub mod error;
pub mod poller;
pub mod runtime;
pub mod scheduler;
pub mod scoring;
pub mod submitter;
pub mod task;
pub mod utils;
