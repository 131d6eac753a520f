//! HTTP+SSE transport layer for the Model Context Protocol
//!
//! Provides the `/sse` stream, the `/messages` dispatcher and the informational
//! endpoints.

pub mod handlers;
