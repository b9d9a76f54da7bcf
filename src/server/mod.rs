//! Server Module
//!
//! This module contains the command-dispatch core shared by every plugin.
//! A plugin process reads JSON commands from the host on one channel and
//! writes framed JSON replies on another; this module owns that protocol.
//!
//! The server module is organized into these components:
//! - codec: Decodes inbound documents, encodes and splits framed replies
//! - request: Validates message shape and extracts calls and context
//! - command_registry: Maps command names to handlers, reserving lifecycle commands
//! - reporter: The `message` / `success` / `failure` reply primitives
//! - server: The read, validate, dispatch and reply loop

/// Message codec module - wire encoding of inbound and outbound documents
pub mod codec;

/// Command registry module - command name to handler bindings
pub mod command_registry;

/// Reporter module - reply primitives used by handlers
pub mod reporter;

/// Request module - shape validation of inbound messages
pub mod request;

/// Server module - the dispatch loop
pub mod server;

/// Server tests module - exercises the dispatch loop end to end
#[cfg(test)]
mod server_tests;
