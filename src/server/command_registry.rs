//! Command Registry Module
//!
//! This module maps command names to handlers for a plugin. Names are
//! case-insensitive and stored lowercase. A name, once bound, is never
//! rebound: a second registration is refused and the first handler stays.
//!
//! `initialize` and `shutdown` are bound when the registry is created and
//! forward to the plugin's [`Plugin::initialize`] and [`Plugin::shutdown`]
//! hooks, so a plugin customizes them by overriding the hooks rather than
//! by registering its own handlers.

use super::reporter::Reporter;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// The initialize command string
pub const INITIALIZE_COMMAND: &str = "initialize";
/// The shutdown command string
pub const SHUTDOWN_COMMAND: &str = "shutdown";

/// What a handler receives for one call
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Lowercased command name
    pub command: &'a str,
    /// The call's parameters
    pub params: &'a Value,
    /// The message's shared context
    pub context: &'a Value,
}

/// A plugin served by the dispatch loop
///
/// Implementors own all of their state (SDK sessions, device lists); the
/// dispatch loop hands each handler `&mut self` for the duration of a call.
pub trait Plugin: Sized + 'static {
    /// Name used in logs and for the default configuration file
    fn name(&self) -> &str;

    /// Register the plugin's own commands
    ///
    /// Called once, before the first message is read.
    fn register_commands(&self, registry: &mut CommandRegistry<Self>);

    /// Handler for the reserved `initialize` command
    fn initialize(&mut self, out: &mut Reporter<'_>) {
        out.success("");
    }

    /// Handler for the reserved `shutdown` command
    fn shutdown(&mut self, out: &mut Reporter<'_>) {
        out.success("");
    }
}

/// Trait for command handlers
///
/// Handlers report their outcome through the [`Reporter`] instead of
/// returning it; a handler may send any number of replies.
pub trait CommandHandler<P>: Send + Sync {
    /// Execute the command for one call
    ///
    /// # Arguments
    /// * `plugin` - The plugin the command runs against
    /// * `call` - Name, parameters and context of the call
    /// * `out` - Reply channel for progress and outcome
    fn execute(&self, plugin: &mut P, call: &Invocation<'_>, out: &mut Reporter<'_>);

    /// Get command description
    fn description(&self) -> &str;
}

/// Handlers bound to the reserved lifecycle commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Initialize,
    Shutdown,
}

impl<P: Plugin> CommandHandler<P> for Lifecycle {
    fn execute(&self, plugin: &mut P, _call: &Invocation<'_>, out: &mut Reporter<'_>) {
        match self {
            Lifecycle::Initialize => plugin.initialize(out),
            Lifecycle::Shutdown => plugin.shutdown(out),
        }
    }

    fn description(&self) -> &str {
        match self {
            Lifecycle::Initialize => "Prepare the plugin for use",
            Lifecycle::Shutdown => "Release resources and stop the plugin",
        }
    }
}

/// Boxed handler body used by [`FnCommand`]
pub type Executor<P> = Box<dyn Fn(&mut P, &Invocation<'_>, &mut Reporter<'_>) + Send + Sync>;

/// Command handler backed by a closure
pub struct FnCommand<P> {
    pub description: String,
    pub executor: Executor<P>,
}

impl<P> CommandHandler<P> for FnCommand<P> {
    fn execute(&self, plugin: &mut P, call: &Invocation<'_>, out: &mut Reporter<'_>) {
        (self.executor)(plugin, call, out)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Helper to create closure-backed command handlers
///
/// # Arguments
/// * `description` - The command description
/// * `executor` - The function to execute when the command is called
///
/// # Returns
/// * `Box<dyn CommandHandler<P>>` - A boxed command handler
pub fn command<P, F>(description: &str, executor: F) -> Box<dyn CommandHandler<P>>
where
    P: 'static,
    F: Fn(&mut P, &Invocation<'_>, &mut Reporter<'_>) + Send + Sync + 'static,
{
    Box::new(FnCommand {
        description: description.to_string(),
        executor: Box::new(executor),
    })
}

/// Macro to create closure-backed command handlers
///
/// # Arguments
/// * `$desc` - Command description
/// * `$func` - Closure taking `(plugin, invocation, reporter)`
#[macro_export]
macro_rules! plugin_command {
    ($desc:expr, $func:expr) => {
        $crate::server::command_registry::command($desc, $func)
    };
}

/// Command registry for one plugin
pub struct CommandRegistry<P> {
    commands: HashMap<String, Box<dyn CommandHandler<P>>>,
}

impl<P: Plugin> CommandRegistry<P> {
    /// Create a registry with the reserved lifecycle commands bound
    pub fn new() -> Self {
        let mut commands: HashMap<String, Box<dyn CommandHandler<P>>> = HashMap::new();
        commands.insert(INITIALIZE_COMMAND.to_string(), Box::new(Lifecycle::Initialize));
        commands.insert(SHUTDOWN_COMMAND.to_string(), Box::new(Lifecycle::Shutdown));
        Self { commands }
    }
}

impl<P: Plugin> Default for CommandRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> CommandRegistry<P> {
    /// Register a command handler
    ///
    /// # Arguments
    /// * `name` - The command name; stored lowercase
    /// * `handler` - The command handler to register
    ///
    /// # Returns
    /// * `bool` - `true` if bound, `false` if the name was already taken
    pub fn register<S: AsRef<str>>(&mut self, name: S, handler: Box<dyn CommandHandler<P>>) -> bool {
        let name = name.as_ref().to_lowercase();
        if self.commands.contains_key(&name) {
            warn!("Command already registered, keeping existing handler: {}", name);
            return false;
        }

        info!("Registering command: {}", name);
        self.commands.insert(name, handler);
        true
    }

    /// Look up the handler for a command name, ignoring case
    pub fn resolve(&self, name: &str) -> Option<&dyn CommandHandler<P>> {
        let handler = self.commands.get(&name.to_lowercase()).map(|handler| handler.as_ref());
        if handler.is_none() {
            debug!("No handler for command: {}", name);
        }
        handler
    }

    /// Whether a command name is bound, ignoring case
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_lowercase())
    }

    /// Number of bound commands, reserved ones included
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is bound
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// List all registered commands with descriptions
    ///
    /// # Returns
    /// * `String` - One `name: description` line per command, sorted by name
    pub fn list_commands(&self) -> String {
        let mut commands: Vec<_> = self.commands.iter().collect();
        commands.sort_by_key(|(name, _)| *name);

        commands
            .iter()
            .map(|(name, handler)| format!("{}: {}", name, handler.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
