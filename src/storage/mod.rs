pub mod database;
pub mod store;

pub use database::{Database, PoolConfig};
pub use store::{ProjectStore, SharedStore};
