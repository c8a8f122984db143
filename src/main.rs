//! macswap - MAC address changer
//!
//! Generates, inspects, applies and resets the hardware address of one
//! network interface.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use macswap::{
    detect, privilege, Config, ConsoleReporter, JsonFileStore, MacAddress, MacController,
    MacResult, NetworkBackend, Operation, PersistenceStore, StatusReporter, SystemExecutor,
};

#[derive(Parser)]
#[command(name = "macswap")]
#[command(about = "Change, inspect and restore a network interface's MAC address")]
struct Cli {
    /// Interface to operate on (e.g., eth0, en0, "Wi-Fi")
    #[arg(short, long, global = true)]
    interface: Option<String>,

    /// File holding the last applied address
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Run Unix link commands through `sudo -n`
    #[arg(long, global = true)]
    sudo: bool,

    /// Seconds to wait for each external tool
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Try to re-enable the interface if an apply fails midway
    #[arg(long, global = true)]
    restore_link: bool,

    /// Print only addresses
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a random locally administered address without applying it
    Generate,
    /// Show the interface's current address
    Show,
    /// Apply a random locally administered address
    Random,
    /// Apply the given address
    Set {
        /// Address in any common notation (aa:bb:.., AA-BB-.., aabb.ccdd.eeff)
        mac: String,
    },
    /// Apply the configured fallback address (`fallback_mac`)
    Reset,
    /// Print the last applied address
    Saved,
    /// Interactive session: generate, inspect, set, apply, reset
    Shell,
}

impl Commands {
    /// Default address to use instead of reading the interface at startup.
    ///
    /// A one-shot `reset` runs in a fresh process, where the live address is
    /// whatever an earlier run applied, so it targets the configured fallback.
    fn pinned_default(&self, config: &Config) -> Option<MacAddress> {
        match self {
            Commands::Reset => Some(config.fallback_default),
            _ => None,
        }
    }

    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Random | Commands::Set { .. } | Commands::Reset | Commands::Shell
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config, cli.verbose);

    let reporter = ConsoleReporter::new()
        .with_colors(!cli.no_color && io::stdout().is_terminal())
        .with_quiet(cli.quiet);

    let executor = SystemExecutor::new(config.command_timeout);
    if cli.command.mutates() && !config.use_sudo && !privilege::is_elevated(&executor) {
        warn!("Not running elevated; changing the address will likely fail");
    }

    let backend = detect(&config, executor);
    let store = JsonFileStore::new(&config.state_file);
    let mut controller = match cli.command.pinned_default(&config) {
        Some(default) => MacController::with_default(&config, backend, store, default),
        None => MacController::new(&config, backend, store),
    };

    let ok = match cli.command {
        Commands::Generate => {
            let mac = controller.generate();
            reporter.report_address(Operation::Generate, mac);
            true
        }
        Commands::Show => report(&reporter, Operation::Inspect, controller.inspect()),
        Commands::Random => {
            let mac = controller.generate();
            reporter.report_address(Operation::Generate, mac);
            report(&reporter, Operation::Apply, controller.apply())
        }
        Commands::Set { mac } => {
            report(&reporter, Operation::SetCustom, controller.set_custom(&mac))
                && report(&reporter, Operation::Apply, controller.apply())
        }
        Commands::Reset => report(&reporter, Operation::Reset, controller.reset()),
        Commands::Saved => report_saved(&reporter, controller.last_saved()),
        Commands::Shell => {
            run_shell(&mut controller, &reporter);
            true
        }
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Layer CLI flags over the loaded configuration.
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(interface) = &cli.interface {
        config.interface = interface.clone();
    }
    if let Some(path) = &cli.state_file {
        config.state_file = path.clone();
    }
    if cli.sudo {
        config.use_sudo = true;
    }
    if let Some(secs) = cli.timeout {
        anyhow::ensure!(secs > 0, "--timeout must be positive");
        config.command_timeout = Duration::from_secs(secs);
    }
    if cli.restore_link {
        config.restore_link_on_failure = true;
    }

    Ok(config)
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn report(reporter: &impl StatusReporter, op: Operation, result: MacResult<MacAddress>) -> bool {
    match result {
        Ok(mac) => {
            reporter.report_address(op, mac);
            true
        }
        Err(e) => {
            reporter.report_error(op, &e);
            false
        }
    }
}

fn report_saved(reporter: &impl StatusReporter, saved: Option<MacAddress>) -> bool {
    match saved {
        Some(mac) => {
            reporter.report_address(Operation::Saved, mac);
            true
        }
        None => {
            reporter.report_info("No saved MAC address");
            false
        }
    }
}

/// A line typed into the interactive session.
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Generate,
    Inspect,
    Set(String),
    Apply,
    Reset,
    Saved,
    State,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        match word.to_ascii_lowercase().as_str() {
            "" => ShellCommand::Empty,
            "generate" | "gen" | "g" => ShellCommand::Generate,
            "inspect" | "check" | "show" => ShellCommand::Inspect,
            "set" | "custom" => ShellCommand::Set(rest.trim().to_string()),
            "apply" => ShellCommand::Apply,
            "reset" => ShellCommand::Reset,
            "saved" => ShellCommand::Saved,
            "state" | "status" => ShellCommand::State,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            _ => ShellCommand::Unknown(line.to_string()),
        }
    }
}

const SHELL_HELP: &str = "\
commands:
  generate      stage a random address
  inspect       stage the interface's current address
  set <mac>     stage a custom address
  apply         apply the staged address
  reset         apply the address captured at startup
  saved         show the last applied address
  state         show what is staged or applied
  quit          leave";

fn run_shell<B, S, R>(controller: &mut MacController<B, S>, reporter: &R)
where
    B: NetworkBackend,
    S: PersistenceStore,
    R: StatusReporter,
{
    let interactive = io::stdin().is_terminal();
    reporter.report_info(&format!(
        "Interface {} ({} backend), default {}. Type 'help' for commands.",
        controller.interface(),
        controller.backend().name(),
        controller.default_address()
    ));

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if interactive {
            print!("macswap> ");
            let _ = io::stdout().flush();
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!("Failed to read input: {}", e);
                break;
            }
            None => break,
        };

        match ShellCommand::parse(&line) {
            ShellCommand::Generate => {
                let mac = controller.generate();
                reporter.report_address(Operation::Generate, mac);
            }
            ShellCommand::Inspect => {
                report(reporter, Operation::Inspect, controller.inspect());
            }
            ShellCommand::Set(raw) => {
                report(reporter, Operation::SetCustom, controller.set_custom(&raw));
            }
            ShellCommand::Apply => {
                report(reporter, Operation::Apply, controller.apply());
            }
            ShellCommand::Reset => {
                report(reporter, Operation::Reset, controller.reset());
            }
            ShellCommand::Saved => {
                report_saved(reporter, controller.last_saved());
            }
            ShellCommand::State => {
                let applied = controller.applied_state();
                let last = applied
                    .last_applied
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "none".to_string());
                reporter.report_info(&format!(
                    "{} | last applied: {} | default: {}",
                    controller.state(),
                    last,
                    applied.default_address
                ));
            }
            ShellCommand::Help => reporter.report_info(SHELL_HELP),
            ShellCommand::Quit => break,
            ShellCommand::Empty => {}
            ShellCommand::Unknown(line) => {
                reporter.report_info(&format!("Unknown command '{}', try 'help'", line));
            }
        }
    }
}
