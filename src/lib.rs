pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod repo;
pub mod scheduler;
pub mod store;
pub mod syncer;
pub mod util;
pub mod vcs;
