//! Plugin process setup
//!
//! Every plugin binary does the same thing: parse the command line, load the
//! configuration, start logging, then serve the host over stdin and stdout.

use crate::config::PluginConfig;
use crate::server::command_registry::Plugin;
use crate::server::server::{PluginServer, RunOutcome};
use crate::utils::error::Result;
use crate::utils::tracing::setup_tracing;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Exit status for configuration and logging failures
pub const STARTUP_ERROR_STATUS: u8 = 2;

/// Command line shared by the plugin binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct PluginArgs {
    /// Configuration file (default: <plugin>.toml next to the executable)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write log lines to stderr
    #[arg(short, long)]
    pub log: bool,

    /// Print the registered commands and exit
    #[arg(long)]
    pub list_commands: bool,
}

/// Run a plugin binary
///
/// # Arguments
/// * `plugin_name` - Name used for the default configuration and log files
/// * `build` - Creates the plugin from the loaded configuration
///
/// # Returns
/// * `ExitCode` - 0 after shutdown, 1 if the host went away, 2 on startup errors
pub fn launch<P, F>(plugin_name: &str, build: F) -> ExitCode
where
    P: Plugin,
    F: FnOnce(&PluginConfig) -> P,
{
    let args = PluginArgs::parse();

    match start(plugin_name, &args, build) {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            eprintln!("{}: {}", plugin_name, e);
            ExitCode::from(STARTUP_ERROR_STATUS)
        }
    }
}

fn start<P, F>(plugin_name: &str, args: &PluginArgs, build: F) -> Result<u8>
where
    P: Plugin,
    F: FnOnce(&PluginConfig) -> P,
{
    let config = PluginConfig::resolve(args.config.as_deref(), plugin_name)?;

    if args.list_commands {
        let server = PluginServer::new(build(&config));
        println!("{}", server.registry().list_commands());
        return Ok(0);
    }

    setup_tracing(&config.log_file(plugin_name), &config.logging.level, args.log)?;
    info!("Starting {} with {:?}", plugin_name, config);

    let mut server = PluginServer::new(build(&config));
    let outcome = server.run(io::stdin().lock(), io::stdout().lock());

    Ok(exit_status(outcome))
}

/// Process exit status for a finished dispatch loop
pub fn exit_status(outcome: RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Shutdown => 0,
        RunOutcome::HostDisconnected => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(RunOutcome::Shutdown), 0);
        assert_eq!(exit_status(RunOutcome::HostDisconnected), 1);
    }

    #[test]
    fn test_args() {
        let args = PluginArgs::try_parse_from(["logiled-plugin", "--config", "/etc/logi.toml", "-l"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/logi.toml")));
        assert!(args.log);
        assert!(!args.list_commands);

        let args = PluginArgs::try_parse_from(["logiled-plugin", "--list-commands"]).unwrap();
        assert!(args.list_commands);
    }
}
