//! Database access shared by RTA services

pub mod init;

pub use init::{create_tables, init_database};
