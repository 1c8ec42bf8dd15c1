pub mod agents;
pub mod config;
pub mod db;
pub mod serve;
