//! Domain types shared across the gateway.

pub mod audit;
pub mod catalog;
pub mod server;
pub mod token;
pub mod uri;
pub mod workspace;
