//! CLI command implementations.

pub mod check;
pub mod exec;
pub mod init_table;
