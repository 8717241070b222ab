pub mod connection;
pub mod models;
pub mod repositories;

pub use connection::{create_pool, run_migrations};
