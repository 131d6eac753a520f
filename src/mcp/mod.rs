//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides the JSON-RPC engine, its envelopes, and the SSE session registry
//! that carries responses back to clients.

pub mod rpc;
pub mod server;
pub mod session;
