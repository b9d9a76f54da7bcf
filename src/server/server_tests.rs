// Test suite for the server module
// Drives the dispatch loop with scripted command channels and checks the
// exact replies written to the response channel.

use crate::server::codec::{ReplyReader, Response};
use crate::server::command_registry::{CommandRegistry, Invocation, Plugin, command};
use crate::server::reporter::Reporter;
use crate::server::server::{PluginServer, RunOutcome};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::io::{self, Read};

/// Command channel that yields one scripted chunk per read
struct ScriptedInput {
    chunks: VecDeque<io::Result<Vec<u8>>>,
}

impl ScriptedInput {
    fn new(chunks: Vec<io::Result<Vec<u8>>>) -> Self {
        Self { chunks: chunks.into() }
    }

    fn messages(messages: &[&str]) -> Self {
        Self::new(messages.iter().map(|m| Ok(m.as_bytes().to_vec())).collect())
    }
}

impl Read for ScriptedInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop_front() {
            Some(Ok(chunk)) => {
                let len = chunk.len().min(buf.len());
                buf[..len].copy_from_slice(&chunk[..len]);
                Ok(len)
            }
            Some(Err(e)) => Err(e),
            None => Ok(0),
        }
    }
}

#[derive(Default)]
struct RecordingPlugin {
    initialized: usize,
    shutdowns: usize,
    calls: Vec<(String, Value, Value)>,
}

impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        "recording"
    }

    fn register_commands(&self, registry: &mut CommandRegistry<Self>) {
        registry.register("record", command("Record the call", record));
        registry.register("progress", command("Report progress, then succeed", progress));
        registry.register("RECORD", command("Duplicate that must be refused", duplicate));
    }

    fn initialize(&mut self, out: &mut Reporter<'_>) {
        self.initialized += 1;
        out.success("");
    }

    fn shutdown(&mut self, out: &mut Reporter<'_>) {
        self.shutdowns += 1;
        out.success("");
    }
}

fn record(plugin: &mut RecordingPlugin, call: &Invocation<'_>, out: &mut Reporter<'_>) {
    plugin
        .calls
        .push((call.command.to_string(), call.params.clone(), call.context.clone()));
    out.success("recorded");
}

fn progress(_plugin: &mut RecordingPlugin, _call: &Invocation<'_>, out: &mut Reporter<'_>) {
    out.message("working");
    out.success("");
}

fn duplicate(_plugin: &mut RecordingPlugin, _call: &Invocation<'_>, out: &mut Reporter<'_>) {
    out.failure("duplicate handler ran");
}

fn run(input: ScriptedInput) -> (PluginServer<RecordingPlugin>, RunOutcome, Vec<Response>) {
    let mut server = PluginServer::new(RecordingPlugin::default());
    let mut output = Vec::new();
    let outcome = server.run(input, &mut output);

    let replies = ReplyReader::new(output.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    (server, outcome, replies)
}

fn failure(text: &str) -> Response {
    Response::notification(false, text)
}

fn success(text: &str) -> Response {
    Response::notification(true, text)
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    /// Lifecycle commands are bound before the plugin registers anything
    #[test]
    fn test_reserved_commands_bound() {
        let registry = CommandRegistry::<RecordingPlugin>::new();
        assert!(registry.contains("initialize"));
        assert!(registry.contains("shutdown"));
        assert_eq!(registry.len(), 2);
    }

    /// A second registration under the same name keeps the first handler
    #[test]
    fn test_duplicate_registration_refused() {
        let mut registry = CommandRegistry::<RecordingPlugin>::new();
        fn noop(_: &mut RecordingPlugin, _: &Invocation<'_>, _: &mut Reporter<'_>) {}

        assert!(registry.register("Paint", command("first", noop)));
        assert!(!registry.register("paint", command("second", noop)));
        assert!(!registry.register("shutdown", command("override", noop)));

        assert_eq!(registry.resolve("PAINT").unwrap().description(), "first");
        assert_eq!(
            registry.resolve("shutdown").unwrap().description(),
            "Release resources and stop the plugin"
        );
    }

    /// list_commands is sorted and carries descriptions
    #[test]
    fn test_list_commands() {
        let server = PluginServer::new(RecordingPlugin::default());
        let listing = server.registry().list_commands();
        let names: Vec<_> = listing.lines().map(|l| l.split(':').next().unwrap()).collect();

        assert_eq!(names, vec!["initialize", "progress", "record", "shutdown"]);
        assert!(listing.contains("record: Record the call"));
    }
}

#[cfg(test)]
mod dispatch_tests {
    use super::*;

    /// Calls run in order and each reply is a separate frame
    #[test]
    fn test_calls_dispatched_in_order() {
        let (server, outcome, replies) = run(ScriptedInput::messages(&[
            r#"{"tool_calls":[{"func":"initialize"},{"func":"progress"},{"func":"shutdown"}]}"#,
        ]));

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert_eq!(
            replies,
            vec![success(""), Response::message("working"), success(""), success("")]
        );
        assert_eq!(server.plugin().initialized, 1);
        assert_eq!(server.plugin().shutdowns, 1);
    }

    /// Command names are matched without regard to case
    #[test]
    fn test_command_names_case_insensitive() {
        let (server, _, replies) = run(ScriptedInput::messages(&[
            r#"{"tool_calls":[{"func":"ReCoRd","params":{"k":1}}]}"#,
            r#"{"tool_calls":[{"func":"SHUTDOWN"}]}"#,
        ]));

        assert_eq!(replies, vec![success("recorded"), success("")]);
        assert_eq!(server.plugin().calls[0].0, "record");
    }

    /// Params and context reach the handler unchanged, defaulting to empty objects
    #[test]
    fn test_params_and_context_passthrough() {
        let (server, _, _) = run(ScriptedInput::messages(&[
            r#"{"tool_calls":[{"func":"record","params":{"color":"red"}},{"func":"record"}],"messages":[{"role":"user"}]}"#,
            r#"{"tool_calls":[{"func":"record"},{"func":"shutdown"}]}"#,
        ]));

        let calls = &server.plugin().calls;
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].1, json!({"color": "red"}));
        assert_eq!(calls[0].2, json!([{"role": "user"}]));
        assert_eq!(calls[1].1, json!({}));
        assert_eq!(calls[1].2, json!([{"role": "user"}]));
        assert_eq!(calls[2].2, json!({}));
    }

    /// An unknown command fails, and the rest of the message still runs
    #[test]
    fn test_unknown_command_then_shutdown() {
        let (server, outcome, replies) = run(ScriptedInput::messages(&[
            r#"{"tool_calls":[{"func":"does_not_exist"},{"func":"shutdown"}]}"#,
            r#"{"tool_calls":[{"func":"record"}]}"#,
        ]));

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert_eq!(
            replies,
            vec![failure("Unknown command encountered: does_not_exist"), success("")]
        );
        assert!(server.plugin().calls.is_empty());
    }

    /// Calls after a shutdown in the same message still run
    #[test]
    fn test_shutdown_finishes_current_message() {
        let (server, outcome, replies) = run(ScriptedInput::messages(&[
            r#"{"tool_calls":[{"func":"shutdown"},{"func":"record"}]}"#,
        ]));

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert_eq!(replies, vec![success(""), success("recorded")]);
        assert_eq!(server.plugin().calls.len(), 1);
    }
}

#[cfg(test)]
mod malformed_input_tests {
    use super::*;

    /// Every shape deviation gets exactly one malformed-input failure and no call runs
    #[test]
    fn test_shape_errors_reply_once() {
        let (server, _, replies) = run(ScriptedInput::messages(&[
            r#"{"messages":[]}"#,
            r#"{"tool_calls":{"func":"record"}}"#,
            r#"{"tool_calls":[{"func":"record"},{"params":{}}]}"#,
            r#"{"tool_calls":[{"func":"shutdown"}]}"#,
        ]));

        let malformed = failure("Malformed input encountered.");
        assert_eq!(replies, vec![malformed.clone(), malformed.clone(), malformed, success("")]);
        assert!(server.plugin().calls.is_empty());
    }

    /// Undecodable documents are dropped without a reply
    #[test]
    fn test_invalid_json_ignored() {
        let (_, outcome, replies) = run(ScriptedInput::messages(&[
            "not json at all",
            "[1, 2, 3]",
            r#"{"tool_calls":[{"func":"shutdown"}]}"#,
        ]));

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert_eq!(replies, vec![success("")]);
    }

    /// A read error is retried without replying
    #[test]
    fn test_read_error_retried() {
        let (_, outcome, replies) = run(ScriptedInput::new(vec![
            Err(io::Error::new(io::ErrorKind::Other, "transient")),
            Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
            Ok(br#"{"tool_calls":[{"func":"shutdown"}]}"#.to_vec()),
        ]));

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert_eq!(replies, vec![success("")]);
    }

    /// A read filling the whole buffer is rejected instead of parsed
    #[test]
    fn test_oversized_message_rejected() {
        let padding = " ".repeat(5000);
        let oversized = format!(r#"{{"tool_calls":[{{"func":"record"}}]}}{}"#, padding);

        let (server, outcome, replies) = run(ScriptedInput::new(vec![
            Ok(oversized.into_bytes()),
            Ok(br#"{"tool_calls":[{"func":"shutdown"}]}"#.to_vec()),
        ]));

        assert_eq!(outcome, RunOutcome::Shutdown);
        assert_eq!(replies, vec![success("")]);
        assert!(server.plugin().calls.is_empty());
    }

    /// End of stream stops the loop without a shutdown
    #[test]
    fn test_end_of_stream() {
        let (server, outcome, replies) = run(ScriptedInput::messages(&[
            r#"{"tool_calls":[{"func":"record"}]}"#,
        ]));

        assert_eq!(outcome, RunOutcome::HostDisconnected);
        assert_eq!(replies, vec![success("recorded")]);
        assert_eq!(server.plugin().shutdowns, 0);
    }
}
