//! MCP JSON-RPC client for communicating with child servers.
//!
//! Implements the MCP protocol (JSON-RPC 2.0) over three transports:
//! a spawned subprocess speaking over stdio, a long-lived SSE stream with a
//! companion message endpoint, and a streamable HTTP session.
//! Reference: <https://spec.modelcontextprotocol.io/>

mod client;
mod connect;
mod protocol;
mod transport;

pub use client::McpClient;
pub use connect::McpConnector;
pub use protocol::{InitializeResult, ServerCapabilities, ServerInfo};
