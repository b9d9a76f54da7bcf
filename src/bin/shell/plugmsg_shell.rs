//! Plugmsg Shell - Interactive host for plugin binaries
//!
//! This binary spawns a plugin, plays the host's part of the protocol and lets
//! you type commands at a prompt. Each line becomes one tool call; replies are
//! printed as they arrive until the call's success or failure notification.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Instant;

use clap::Parser;
use plugmsg::config::MAX_MESSAGE_SIZE;
use plugmsg::server::codec::{ReplyReader, Response};
use plugmsg::server::command_registry::{INITIALIZE_COMMAND, SHUTDOWN_COMMAND};
use serde_json::{Map, Value, json};

/// User lines kept in the context
const HISTORY_LIMIT: usize = 20;
/// A plugin rejects any read that fills this many bytes
const READ_LIMIT: usize = MAX_MESSAGE_SIZE - 1;

/// Plugmsg Shell - interactive host for a plugin
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Plugin executable to spawn
    plugin: PathBuf,

    /// Ask the plugin to also log to stderr
    #[arg(short, long)]
    log: bool,

    /// Configuration file passed to the plugin
    #[arg(short, long)]
    config: Option<PathBuf>,
}

struct PlugmsgShell {
    name: String,
    child: Child,
    commands: ChildStdin,
    replies: ReplyReader<ChildStdout>,
    /// User lines so far, sent as the `messages` context
    history: Vec<Value>,
}

impl PlugmsgShell {
    /// Spawn the plugin with piped stdin and stdout
    fn spawn(args: &Args) -> Result<Self, Box<dyn std::error::Error>> {
        let mut command = Command::new(&args.plugin);
        if args.log {
            command.arg("--log");
        }
        if let Some(config) = &args.config {
            command.arg("--config").arg(config);
        }

        let mut child = command.stdin(Stdio::piped()).stdout(Stdio::piped()).spawn()?;
        let commands = child.stdin.take().ok_or("plugin stdin is not piped")?;
        let replies = child.stdout.take().ok_or("plugin stdout is not piped")?;

        let name = args
            .plugin
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "plugin".to_string());

        Ok(PlugmsgShell {
            name,
            child,
            commands,
            replies: ReplyReader::new(replies),
            history: Vec::new(),
        })
    }

    /// Send one tool call and print replies up to its notification
    ///
    /// # Returns
    /// * `Ok(true)` - A notification was received
    /// * `Ok(false)` - The plugin closed its output first
    fn call(&mut self, func: &str, params: Map<String, Value>) -> Result<bool, Box<dyn std::error::Error>> {
        let message = encode_call(func, &params, &mut self.history)?;
        self.send(&message)
    }

    /// Write an encoded message and print replies up to its notification
    fn send(&mut self, message: &str) -> Result<bool, Box<dyn std::error::Error>> {
        self.commands.write_all(message.as_bytes())?;
        self.commands.flush()?;

        let start_time = Instant::now();
        while let Some(reply) = self.replies.next_reply()? {
            self.format_response(&reply);
            if reply.is_notification() {
                println!("⏱️  Response time: {:.3}s", start_time.elapsed().as_secs_f64());
                return Ok(true);
            }
        }

        eprintln!("🔴 {} closed its output", self.name);
        Ok(false)
    }

    /// Format and display one reply from the plugin
    fn format_response(&self, reply: &Response) {
        match reply.success {
            Some(true) => println!("🟢 {}", reply.text()),
            Some(false) => eprintln!("🔴 {}", reply.text()),
            None => println!("💬 {}", reply.text()),
        }
    }

    /// Show help information
    fn show_help(&self) {
        let help_text = r#"
🎮 Plugmsg Shell Help
=====================
Shell Commands:
  help            - Show this help message
  clear           - Clear the screen
  history         - Show the context sent with each call
  exit/quit/q     - Send shutdown and exit the shell

Plugin Commands:
  <command> [key=value ...]
                  - Call a plugin command; values are parsed as JSON when
                    possible, otherwise sent as strings
                    e.g. logi_change_keyboard_lights color=red
"#;
        println!("{}", help_text);
    }

    /// Handle internal shell commands
    ///
    /// # Returns
    /// * `bool` - `true` if the line was a shell command
    fn handle_internal_command(&mut self, cmd: &str) -> bool {
        match cmd.to_lowercase().as_str() {
            "help" | "h" | "?" => self.show_help(),
            "clear" => print!("\x1B[2J\x1B[1;1H"),
            "history" => {
                for entry in &self.history {
                    println!("{}", entry);
                }
            }
            _ => return false,
        }
        true
    }

    /// Run the main interactive command loop
    fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        println!("Use 'help' for shell commands.");
        println!("Enter a command or 'exit' to quit.");
        println!("{}", "─".repeat(80));

        if !self.call(INITIALIZE_COMMAND, Map::new())? {
            return Ok(());
        }

        loop {
            print!("[{}]> ", self.name);
            io::stdout().flush()?;

            let mut input = String::new();
            match io::stdin().read_line(&mut input) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    eprintln!("\n🔴 Error reading input: {}", e);
                    continue;
                }
            }

            let line = input.trim();
            if line.is_empty() {
                continue;
            }

            if matches!(line.to_lowercase().as_str(), "exit" | "quit" | "q") {
                break;
            }
            if self.handle_internal_command(line) {
                continue;
            }

            let (func, params) = parse_call(line);
            self.history.push(json!({"role": "user", "content": line}));
            if self.history.len() > HISTORY_LIMIT {
                self.history.remove(0);
            }

            let message = match encode_call(func, &params, &mut self.history) {
                Ok(message) => message,
                Err(e) => {
                    self.history.pop();
                    eprintln!("🔴 {}", e);
                    continue;
                }
            };

            if !self.send(&message)? {
                return Ok(());
            }
            println!("{}", "-".repeat(80));
        }

        self.call(SHUTDOWN_COMMAND, Map::new())?;
        Ok(())
    }
}

/// Serialize one tool call with as much history as one plugin read can carry
///
/// The oldest history entries are dropped until the message fits. History is
/// left untouched when even the call alone is too large.
fn encode_call(
    func: &str,
    params: &Map<String, Value>,
    history: &mut Vec<Value>,
) -> Result<String, String> {
    let tool_calls = json!([{"func": func, "params": params}]);

    for skip in 0..=history.len() {
        let message = json!({"tool_calls": tool_calls, "messages": &history[skip..]}).to_string();
        if message.len() < READ_LIMIT {
            history.drain(..skip);
            return Ok(message);
        }
    }

    Err(format!(
        "{} call does not fit in the plugin's {} byte read",
        func,
        READ_LIMIT - 1
    ))
}

/// Split `command key=value ...` into a name and parameters
fn parse_call(line: &str) -> (&str, Map<String, Value>) {
    let mut parts = line.split_whitespace();
    let func = parts.next().unwrap_or_default();

    let params = parts
        .filter_map(|part| part.split_once('='))
        .map(|(key, value)| {
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            (key.to_string(), value)
        })
        .collect();

    (func, params)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut shell = match PlugmsgShell::spawn(&args) {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("🔴 Failed to start {}: {}", args.plugin.display(), e);
            std::process::exit(1);
        }
    };

    let result = shell.run();
    if result.is_err() {
        // The plugin may still be blocked reading the command pipe
        let _ = shell.child.kill();
    }
    let status = shell.child.wait()?;
    println!("{} exited with {}", shell.name, status);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call() {
        let (func, params) = parse_call("logi_change_mouse_lights color=red level=3 flag=true junk");
        assert_eq!(func, "logi_change_mouse_lights");
        assert_eq!(params.get("color"), Some(&json!("red")));
        assert_eq!(params.get("level"), Some(&json!(3)));
        assert_eq!(params.get("flag"), Some(&json!(true)));
        assert_eq!(params.len(), 3);
    }

    fn user_line(index: usize) -> Value {
        json!({"role": "user", "content": format!("{:03} {}", index, "x".repeat(200))})
    }

    #[test]
    fn test_encode_call_drops_oldest_history() {
        let mut history: Vec<Value> = (0..HISTORY_LIMIT).map(user_line).collect();
        let (func, params) = parse_call("logi_change_keyboard_lights color=red");

        let message = encode_call(func, &params, &mut history).unwrap();
        assert!(message.len() < READ_LIMIT);
        assert!(history.len() < HISTORY_LIMIT);
        assert_eq!(history.last(), Some(&user_line(HISTORY_LIMIT - 1)));

        let decoded: Value = serde_json::from_str(&message).unwrap();
        assert_eq!(decoded["tool_calls"][0]["params"]["color"], json!("red"));
        assert_eq!(decoded["messages"].as_array().map(Vec::len), Some(history.len()));
    }

    #[test]
    fn test_encode_call_keeps_short_history() {
        let mut history = vec![user_line(0), user_line(1)];
        let message = encode_call("corsair_list_devices", &Map::new(), &mut history).unwrap();
        assert_eq!(history.len(), 2);
        assert!(message.contains("\"messages\":["));
    }

    #[test]
    fn test_encode_call_refuses_oversized_call() {
        let mut history = vec![user_line(0)];
        let line = format!("my_command text={}", "y".repeat(READ_LIMIT));
        let (func, params) = parse_call(&line);

        let error = encode_call(func, &params, &mut history).unwrap_err();
        assert!(error.starts_with("my_command call does not fit"));
        assert_eq!(history, vec![user_line(0)]);
    }

    #[test]
    fn test_parse_bare_command() {
        let (func, params) = parse_call("  corsair_list_devices  ");
        assert_eq!(func, "corsair_list_devices");
        assert!(params.is_empty());
    }
}
