//! Domain logic exposed over the MCP protocol
//!
//! Provides the Star Wars character lookup tool and the `starwars` prompt.

pub mod prompts;
pub mod tools;
