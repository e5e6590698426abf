//! HTTP handlers, grouped by API surface.

pub mod audit;
pub mod events;
pub mod mcp;
pub mod servers;
pub mod tokens;
pub mod workspaces;
