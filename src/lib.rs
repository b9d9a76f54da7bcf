//! plugmsg
//!
//! Host-spawned command plugins. A plugin reads JSON tool calls from the host
//! on stdin, dispatches each to a registered handler and writes framed JSON
//! replies on stdout until the host sends `shutdown`.
//!
//! The crate is organized into these modules:
//! - server: Wire codec, command registry and the dispatch loop
//! - lighting: RGB lighting plugin over zone and LED SDK backends
//! - config: Wire constants and the optional TOML configuration
//! - launcher: Command line and process setup shared by the plugin binaries
//! - utils: Error type and logging setup

pub mod config;
pub mod launcher;
pub mod lighting;
pub mod server;
pub mod utils;
