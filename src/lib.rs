//! Library to backup a [MongoDB][mongo] database with `mongodump`.
//!
//! Monthly and weekly runs dump every configured collection into a dated
//! folder and report start, failures and a final summary to an operator
//! channel. The entry point is [`orchestrator::execute`].
//!
//! [mongo]: https://www.mongodb.com/

#![forbid(unsafe_code)]

pub mod backup;
pub mod cli;
pub mod config;
pub mod dump;
pub mod notify;
pub mod orchestrator;
pub mod report;
pub mod schedule;
pub mod util;
