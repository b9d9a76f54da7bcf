use super::codec::{self, CodecError, InboundMessage};
use super::command_registry::{CommandRegistry, Invocation, Plugin, SHUTDOWN_COMMAND};
use super::reporter::Reporter;
use super::request::Request;
use crate::config::MAX_MESSAGE_SIZE;
use std::io::{Read, Write};
use tracing::{debug, info, warn};

/// Reply sent when a message does not have the required shape
pub const MALFORMED_INPUT_MESSAGE: &str = "Malformed input encountered.";
/// Prefix of the reply sent for an unregistered command
pub const UNKNOWN_COMMAND_MESSAGE: &str = "Unknown command encountered:";

/// Why [`PluginServer::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A shutdown command was handled
    Shutdown,
    /// The command channel reached end of stream
    HostDisconnected,
}

/// Result of one read from the command channel
enum Frame {
    Message(InboundMessage),
    Closed,
}

/// Dispatch loop serving one plugin
pub struct PluginServer<P: Plugin> {
    plugin: P,
    registry: CommandRegistry<P>,
}

impl<P: Plugin> PluginServer<P> {
    /// Create a server and register the plugin's commands
    ///
    /// # Arguments
    /// * `plugin` - The plugin to serve
    ///
    /// # Returns
    /// * `PluginServer<P>` - A server with a frozen command registry
    pub fn new(plugin: P) -> Self {
        let mut registry = CommandRegistry::new();
        plugin.register_commands(&mut registry);
        info!("Plugin {} ready with {} commands", plugin.name(), registry.len());

        Self { plugin, registry }
    }

    /// The served plugin
    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    /// The command registry
    pub fn registry(&self) -> &CommandRegistry<P> {
        &self.registry
    }

    /// Run the dispatch loop until a shutdown command is handled
    ///
    /// Read errors, truncated reads and undecodable documents are logged and
    /// followed by another read; the host gets no reply for them. The loop
    /// also ends when the command channel reaches end of stream, since no
    /// further command can arrive.
    ///
    /// # Arguments
    /// * `input` - The command channel
    /// * `output` - The response channel
    ///
    /// # Returns
    /// * `RunOutcome` - Why the loop stopped
    pub fn run<R: Read, W: Write>(&mut self, mut input: R, mut output: W) -> RunOutcome {
        info!("Plugin {} started", self.plugin.name());

        loop {
            let message = match read_frame(&mut input) {
                Ok(Frame::Message(message)) => message,
                Ok(Frame::Closed) => {
                    warn!("Command channel closed without a shutdown command");
                    return RunOutcome::HostDisconnected;
                }
                Err(e) => {
                    warn!("Error reading command: {}", e);
                    continue;
                }
            };

            let mut reporter = Reporter::new(&mut output);
            if self.process_message(message, &mut reporter) {
                info!("Shutdown command processed, stopping plugin {}", self.plugin.name());
                return RunOutcome::Shutdown;
            }
        }
    }

    /// Validate one message and dispatch its calls in order
    ///
    /// # Arguments
    /// * `message` - A decoded inbound message
    /// * `out` - Reply channel
    ///
    /// # Returns
    /// * `bool` - `true` if any call in the message was the shutdown command
    pub fn process_message(&mut self, message: InboundMessage, out: &mut Reporter<'_>) -> bool {
        let request = match Request::try_from(message) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed input: {}", e);
                out.failure(MALFORMED_INPUT_MESSAGE);
                return false;
            }
        };

        let mut shutdown = false;
        for call in &request.calls {
            let command = call.command();

            match self.registry.resolve(&command) {
                Some(handler) => {
                    info!("Executing command: {}", command);
                    let invocation = Invocation {
                        command: &command,
                        params: &call.params,
                        context: &request.context,
                    };
                    handler.execute(&mut self.plugin, &invocation, out);
                }
                None => {
                    warn!("Unknown command: {}", command);
                    out.failure(&format!("{} {}", UNKNOWN_COMMAND_MESSAGE, command));
                }
            }

            shutdown |= command == SHUTDOWN_COMMAND;
        }

        shutdown
    }
}

/// Read and decode one message from the command channel
///
/// A read that fills the usable part of the buffer is rejected as truncated
/// instead of being parsed.
fn read_frame<R: Read>(input: &mut R) -> Result<Frame, CodecError> {
    let mut buffer = [0u8; MAX_MESSAGE_SIZE];
    let limit = MAX_MESSAGE_SIZE - 1;

    let read = input.read(&mut buffer[..limit])?;
    if read == 0 {
        return Ok(Frame::Closed);
    }
    if read == limit {
        return Err(CodecError::Truncated(MAX_MESSAGE_SIZE));
    }

    debug!("Received {} bytes: {}", read, String::from_utf8_lossy(&buffer[..read]));
    codec::decode(&buffer[..read]).map(Frame::Message)
}
