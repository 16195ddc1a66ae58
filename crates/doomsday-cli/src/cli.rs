//! Argument parsing and the process entry point.

use std::io;
use std::path::PathBuf;

use chrono::TimeDelta;
use clap::{Arg, ArgAction, Args, Parser, Subcommand};
use doomsday_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};

use crate::client::{TraceSink, translate};
use crate::commands::server::{DEFAULT_MANIFEST, DEFAULT_SERVER_BIN};
use crate::dispatch::{DispatchSettings, Dispatcher};
use crate::duration::parse_duration;
use crate::registry::{CommandRegistry, HandlerArgs, Verb};

/// Parses CLI arguments, dispatches the requested verb, and reports any
/// failure on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: LogFormat::from_name(&cli.log_format),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    let verb = cli.command.verb();
    let registry = match CommandRegistry::standard(HandlerArgs::from(cli.command)) {
        Ok(registry) => registry,
        Err(err) => return report(&err),
    };
    let dispatcher = Dispatcher::new(
        registry,
        DispatchSettings {
            config_path: cli.config,
            trace: cli.trace.then(TraceSink::stderr),
        },
    );

    let mut stdout = io::stdout();
    match dispatcher.dispatch(verb.name(), &mut stdout).await {
        Ok(()) => 0,
        Err(err) => report(&err),
    }
}

fn report(err: &crate::client::CliError) -> i32 {
    let failure = translate(err);
    tracing::debug!(exit_code = failure.exit_code, "command failed");
    eprintln!("error: {}", failure.message);
    failure.exit_code
}

#[derive(Parser)]
#[command(
    name = "doomsday",
    version,
    about = "Cert expiration tracker",
    disable_version_flag = true,
    arg(Arg::new("version")
        .short('v')
        .long("version")
        .action(ArgAction::Version)
        .help("Print version"))
)]
struct Cli {
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        env = "DOOMSDAY_CONFIG",
        help = "Path to the CLI session file (default: ~/.doomsdayconfig)"
    )]
    config: Option<PathBuf>,
    #[arg(
        short = 't',
        long,
        global = true,
        env = "DOOMSDAY_TRACE",
        help = "Print raw HTTP requests and responses to stderr"
    )]
    trace: bool,
    #[arg(long, global = true, env = "DOOMSDAY_LOG", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[arg(long, global = true, env = "DOOMSDAY_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start the doomsday server
    Server(ServerArgs),
    /// Manage targeted doomsday servers
    Target(TargetArgs),
    /// Print out configured targets
    Targets,
    /// Auth to the doomsday server
    #[command(visible_alias = "auth")]
    Login(LoginArgs),
    /// List the contents of the server cache
    List(ListArgs),
    /// See your impending doom
    #[command(visible_alias = "dash")]
    Dashboard,
    /// View the current state of the doomsday scheduler
    #[command(alias = "sched", hide = true)]
    Scheduler,
    /// Refresh the server's cache
    Refresh,
    /// Get info about the currently targeted doomsday server
    Info,
}

impl Command {
    pub(crate) const fn verb(&self) -> Verb {
        match self {
            Self::Server(_) => Verb::Server,
            Self::Target(_) => Verb::Target,
            Self::Targets => Verb::Targets,
            Self::Login(_) => Verb::Login,
            Self::List(_) => Verb::List,
            Self::Dashboard => Verb::Dashboard,
            Self::Scheduler => Verb::Scheduler,
            Self::Refresh => Verb::Refresh,
            Self::Info => Verb::Info,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ServerArgs {
    #[arg(
        short = 'm',
        long,
        default_value = DEFAULT_MANIFEST,
        help = "The path to the server manifest"
    )]
    pub(crate) manifest: PathBuf,
    #[arg(
        long,
        env = "DOOMSDAY_SERVER_BIN",
        default_value = DEFAULT_SERVER_BIN,
        help = "Server executable to launch"
    )]
    pub(crate) server_bin: PathBuf,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            server_bin: PathBuf::from(DEFAULT_SERVER_BIN),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct TargetArgs {
    #[arg(help = "The name of the target")]
    pub(crate) name: Option<String>,
    #[arg(help = "The address to set for this target")]
    pub(crate) address: Option<String>,
    #[arg(short = 'k', long, help = "Skip TLS cert validation for this backend")]
    pub(crate) insecure: bool,
    #[arg(
        short = 'd',
        long,
        help = "Forget the target with the given name; succeeds if it does not exist"
    )]
    pub(crate) delete: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct LoginArgs {
    #[arg(short = 'u', long, help = "The username to log in as")]
    pub(crate) username: Option<String>,
    #[arg(short = 'p', long, help = "The password to log in with")]
    pub(crate) password: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ListArgs {
    #[arg(
        short = 'b',
        long,
        value_name = "1y2d3h4m",
        value_parser = parse_duration,
        help = "Restrict to certs that expire in longer than the given duration"
    )]
    pub(crate) beyond: Option<TimeDelta>,
    #[arg(
        short = 'w',
        long,
        value_name = "1y2d3h4m",
        value_parser = parse_duration,
        help = "Restrict to certs that expire in less than the given duration"
    )]
    pub(crate) within: Option<TimeDelta>,
}
