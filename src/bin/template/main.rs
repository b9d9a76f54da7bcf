//! Template plugin
//!
//! Starting point for new plugins: one command, `my_command`, that reports
//! back the parameters and the size of the context it was given.

use plugmsg::launcher::launch;
use plugmsg::plugin_command;
use plugmsg::server::command_registry::{CommandRegistry, Invocation, Plugin};
use plugmsg::server::reporter::Reporter;
use serde_json::Value;
use std::process::ExitCode;

const PLUGIN_NAME: &str = "template-plugin";

struct TemplatePlugin;

impl Plugin for TemplatePlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn register_commands(&self, registry: &mut CommandRegistry<Self>) {
        registry.register(
            "my_command",
            plugin_command!(
                "Echo the parameters and the context size",
                |_plugin: &mut TemplatePlugin, call: &Invocation<'_>, out: &mut Reporter<'_>| {
                    out.success(&format!(
                        "my_command executed with {} context entries.\n{}",
                        context_size(call.context),
                        describe_params(call.params)
                    ));
                }
            ),
        );
    }

    fn initialize(&mut self, out: &mut Reporter<'_>) {
        out.success("Template plugin initialized.");
    }

    fn shutdown(&mut self, out: &mut Reporter<'_>) {
        out.success("Template plugin shut down.");
    }
}

/// One `params[key] = value` line per parameter
fn describe_params(params: &Value) -> String {
    match params {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("params[{}] = {}\n", key, value))
            .collect(),
        Value::Null => String::new(),
        other => format!("params = {}\n", other),
    }
}

/// Number of messages (or fields) in the context
fn context_size(context: &Value) -> usize {
    match context {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    }
}

fn main() -> ExitCode {
    launch(PLUGIN_NAME, |_config| TemplatePlugin)
}
