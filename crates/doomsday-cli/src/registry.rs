//! Verbs, the handler capability, and the verb-to-handler table.
//!
//! # Design
//! - A [`Verb`] decides what a handler may touch: nothing, the session, or the
//!   session plus a [`BoundClient`].
//! - Aliases are extra table entries holding the same `Arc` as the canonical
//!   verb, never a second handler.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use doomsday_session::SessionConfig;

use crate::cli::Command;
use crate::client::{BoundClient, CliError, CliResult};
use crate::commands::certs::{DashboardCommand, ListCommand, RefreshCommand};
use crate::commands::info::InfoCommand;
use crate::commands::login::LoginCommand;
use crate::commands::scheduler::SchedulerCommand;
use crate::commands::server::ServerCommand;
use crate::commands::targets::{TargetCommand, TargetsCommand};

/// What a verb needs before its handler can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    /// Never loads or saves the session.
    None,
    /// Loads the session, persists it on success.
    Session,
    /// Like `Session`, and also requires a current target and a bound client.
    Client,
}

/// Top-level CLI subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Verb {
    Server,
    Target,
    Targets,
    Login,
    List,
    Dashboard,
    Scheduler,
    Refresh,
    Info,
}

impl Verb {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Target => "target",
            Self::Targets => "targets",
            Self::Login => "login",
            Self::List => "list",
            Self::Dashboard => "dashboard",
            Self::Scheduler => "scheduler",
            Self::Refresh => "refresh",
            Self::Info => "info",
        }
    }

    pub(crate) const fn access(self) -> Access {
        match self {
            Self::Server => Access::None,
            Self::Target | Self::Targets => Access::Session,
            Self::Login
            | Self::List
            | Self::Dashboard
            | Self::Scheduler
            | Self::Refresh
            | Self::Info => Access::Client,
        }
    }
}

/// Everything a handler may use during one invocation.
pub(crate) struct CommandContext<'a> {
    pub(crate) session: Option<&'a mut SessionConfig>,
    pub(crate) client: Option<&'a BoundClient>,
    pub(crate) out: &'a mut (dyn Write + Send),
}

impl<'a> CommandContext<'a> {
    pub(crate) fn client(&self) -> CliResult<&'a BoundClient> {
        self.client
            .ok_or_else(|| CliError::failure(anyhow!("command requires a bound client")))
    }
}

pub(crate) fn missing_session() -> CliError {
    CliError::failure(anyhow!("command requires a loaded session"))
}

/// Uniform capability implemented by every verb handler.
#[async_trait]
pub(crate) trait CommandHandler: Send + Sync {
    fn verb(&self) -> Verb;

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()>;
}

/// Parsed flags for the handlers that take any.
#[derive(Default)]
pub(crate) struct HandlerArgs {
    pub(crate) server: crate::cli::ServerArgs,
    pub(crate) target: crate::cli::TargetArgs,
    pub(crate) login: crate::cli::LoginArgs,
    pub(crate) list: crate::cli::ListArgs,
}

impl From<Command> for HandlerArgs {
    fn from(command: Command) -> Self {
        let mut args = Self::default();
        match command {
            Command::Server(server) => args.server = server,
            Command::Target(target) => args.target = target,
            Command::Login(login) => args.login = login,
            Command::List(list) => args.list = list,
            Command::Targets
            | Command::Dashboard
            | Command::Scheduler
            | Command::Refresh
            | Command::Info => {}
        }
        args
    }
}

/// Table from verb strings (canonical names and aliases) to handlers.
#[derive(Default)]
pub(crate) struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Register every verb with its aliases. The invoked verb's handler
    /// carries the parsed flags; the others carry defaults.
    pub(crate) fn standard(args: HandlerArgs) -> CliResult<Self> {
        let mut registry = Self::default();
        registry.register(Verb::Server.name(), Arc::new(ServerCommand::new(args.server)));
        registry.register(Verb::Target.name(), Arc::new(TargetCommand::new(args.target)));
        registry.register(Verb::Targets.name(), Arc::new(TargetsCommand));
        registry.register(Verb::Login.name(), Arc::new(LoginCommand::new(args.login)));
        registry.register(Verb::List.name(), Arc::new(ListCommand::new(args.list)));
        registry.register(Verb::Dashboard.name(), Arc::new(DashboardCommand));
        registry.register(Verb::Scheduler.name(), Arc::new(SchedulerCommand));
        registry.register(Verb::Refresh.name(), Arc::new(RefreshCommand));
        registry.register(Verb::Info.name(), Arc::new(InfoCommand));

        registry.alias("auth", Verb::Login.name())?;
        registry.alias("dash", Verb::Dashboard.name())?;
        registry.alias("sched", Verb::Scheduler.name())?;
        Ok(registry)
    }

    pub(crate) fn register(&mut self, verb: &str, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(verb.to_string(), handler);
    }

    /// Bind `verb` to the handler already registered under `existing`.
    pub(crate) fn alias(&mut self, verb: &str, existing: &str) -> CliResult<()> {
        let handler = self.resolve(existing)?;
        self.handlers.insert(verb.to_string(), handler);
        Ok(())
    }

    pub(crate) fn resolve(&self, verb: &str) -> CliResult<Arc<dyn CommandHandler>> {
        self.handlers
            .get(verb)
            .cloned()
            .ok_or_else(|| CliError::UnknownCommand(verb.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VERBS: [Verb; 9] = [
        Verb::Server,
        Verb::Target,
        Verb::Targets,
        Verb::Login,
        Verb::List,
        Verb::Dashboard,
        Verb::Scheduler,
        Verb::Refresh,
        Verb::Info,
    ];

    fn registry() -> CliResult<CommandRegistry> {
        CommandRegistry::standard(HandlerArgs::default())
    }

    #[test]
    fn aliases_share_the_canonical_handler() -> CliResult<()> {
        let registry = registry()?;
        for (alias, canonical) in [("auth", "login"), ("dash", "dashboard"), ("sched", "scheduler")]
        {
            let aliased = registry.resolve(alias)?;
            let original = registry.resolve(canonical)?;
            assert!(Arc::ptr_eq(&aliased, &original), "{alias} must share {canonical}");
        }
        Ok(())
    }

    #[test]
    fn every_verb_resolves_to_its_own_handler() -> CliResult<()> {
        let registry = registry()?;
        for verb in ALL_VERBS {
            assert_eq!(registry.resolve(verb.name())?.verb(), verb);
        }
        Ok(())
    }

    #[test]
    fn unknown_verb_is_reported() {
        let registry = CommandRegistry::default();
        let err = registry.resolve("frobnicate").err();
        assert!(matches!(err, Some(CliError::UnknownCommand(verb)) if verb == "frobnicate"));
    }

    #[test]
    fn alias_requires_existing_verb() {
        let mut registry = CommandRegistry::default();
        assert!(registry.alias("auth", "login").is_err());
    }

    #[test]
    fn access_matches_verb_contract() {
        assert_eq!(Verb::Server.access(), Access::None);
        assert_eq!(Verb::Target.access(), Access::Session);
        assert_eq!(Verb::Targets.access(), Access::Session);
        for verb in [
            Verb::Login,
            Verb::List,
            Verb::Dashboard,
            Verb::Scheduler,
            Verb::Refresh,
            Verb::Info,
        ] {
            assert_eq!(verb.access(), Access::Client);
        }
    }
}
