pub mod api;
pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod feeds;
pub mod session;
pub mod state;
pub mod strategy;
pub mod trade;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
