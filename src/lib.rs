pub mod catalog;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod handlers;
pub mod paths;
pub mod persistence;
pub mod session;
pub mod srs;
pub mod state;

#[cfg(test)]
pub mod testing;
