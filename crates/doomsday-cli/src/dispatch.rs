//! Runs one handler with the session and client its verb requires.
//!
//! The session is loaded before the handler runs and saved only if the handler
//! succeeds. Verbs with [`Access::None`] never touch the session file.

use std::io::Write;
use std::path::PathBuf;

use doomsday_session::{SessionConfig, default_path, load, save};
use tracing::Instrument;

use crate::client::{BoundClient, CliError, CliResult, TraceSink};
use crate::registry::{Access, CommandContext, CommandHandler, CommandRegistry};

/// Per-invocation settings taken from global flags.
pub(crate) struct DispatchSettings {
    /// Session file override; `~/.doomsdayconfig` otherwise.
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) trace: Option<TraceSink>,
}

pub(crate) struct Dispatcher {
    registry: CommandRegistry,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub(crate) const fn new(registry: CommandRegistry, settings: DispatchSettings) -> Self {
        Self { registry, settings }
    }

    /// Resolve `verb` and run its handler, writing command output to `out`.
    pub(crate) async fn dispatch(&self, verb: &str, out: &mut (dyn Write + Send)) -> CliResult<()> {
        let handler = self.registry.resolve(verb)?;
        let span = tracing::info_span!("command", verb = handler.verb().name());
        self.run(handler.as_ref(), out).instrument(span).await
    }

    async fn run(
        &self,
        handler: &dyn CommandHandler,
        out: &mut (dyn Write + Send),
    ) -> CliResult<()> {
        let access = handler.verb().access();
        if access == Access::None {
            let mut ctx = CommandContext {
                session: None,
                client: None,
                out,
            };
            return handler.execute(&mut ctx).await;
        }

        let path = match &self.settings.config_path {
            Some(path) => path.clone(),
            None => default_path().map_err(CliError::ConfigLoad)?,
        };
        let mut session = load(&path).map_err(CliError::ConfigLoad)?;
        tracing::debug!(path = %path.display(), "loaded session");

        let client = match access {
            Access::Client => Some(self.bind(&session)?),
            Access::None | Access::Session => None,
        };

        {
            let mut ctx = CommandContext {
                session: Some(&mut session),
                client: client.as_ref(),
                out,
            };
            handler.execute(&mut ctx).await?;
        }

        save(&session, &path).map_err(CliError::ConfigSave)?;
        tracing::debug!(path = %path.display(), "saved session");
        Ok(())
    }

    fn bind(&self, session: &SessionConfig) -> CliResult<BoundClient> {
        let Some(target) = session.current_target() else {
            if let Some(name) = session.current_name() {
                tracing::warn!(target_name = name, "current target no longer exists");
            }
            return Err(CliError::NoTargetSelected);
        };
        BoundClient::build(target, self.settings.trace.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use httpmock::prelude::*;

    use super::*;
    use crate::cli::{Command, TargetArgs};
    use crate::client::{LOGIN_HINT, translate};
    use crate::registry::{HandlerArgs, Verb};

    fn dispatcher(command: Command, config_path: &Path) -> CliResult<Dispatcher> {
        let registry = CommandRegistry::standard(HandlerArgs::from(command))?;
        Ok(Dispatcher::new(
            registry,
            DispatchSettings {
                config_path: Some(config_path.to_path_buf()),
                trace: None,
            },
        ))
    }

    async fn dispatch(dispatcher: &Dispatcher, verb: &str) -> (CliResult<()>, String) {
        let mut out = Vec::new();
        let result = dispatcher.dispatch(verb, &mut out).await;
        (result, String::from_utf8_lossy(&out).to_string())
    }

    fn write_session(path: &Path, session: &SessionConfig) -> CliResult<()> {
        save(session, path).map_err(CliError::ConfigSave)
    }

    #[tokio::test]
    async fn client_verb_without_target_fails_and_writes_nothing() -> CliResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.yml");

        let dispatcher = dispatcher(Command::List(crate::cli::ListArgs::default()), &path)?;
        let (result, out) = dispatch(&dispatcher, "list").await;

        assert!(matches!(result, Err(CliError::NoTargetSelected)));
        assert!(out.is_empty());
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_remote_translates_to_login_hint() -> CliResult<()> {
        let server = MockServer::start_async().await;
        let anonymous = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/info")
                .header_missing("x-doomsday-token");
            then.status(401);
        });
        let with_token = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/info")
                .header_exists("x-doomsday-token");
            then.status(200)
                .json_body(serde_json::json!({"version": "0.9.1", "auth_type": "userpass"}));
        });
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.yml");
        let mut session = SessionConfig::default();
        session.set_target("mock", &server.base_url(), false);
        write_session(&path, &session)?;

        let dispatcher = dispatcher(Command::Info, &path)?;
        let (result, _) = dispatch(&dispatcher, "info").await;
        let failure = result.err().map(|err| translate(&err));

        anonymous.assert_calls(1);
        with_token.assert_calls(0);

        assert_eq!(failure.as_ref().map(|f| f.message.as_str()), Some(LOGIN_HINT));
        assert_eq!(failure.map(|f| f.exit_code), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn target_then_targets_shows_single_current_insecure_row() -> CliResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.yml");

        let target = Command::Target(TargetArgs {
            name: Some("prod".into()),
            address: Some("https://prod.example".into()),
            insecure: true,
            delete: false,
        });
        let (result, _) = dispatch(&dispatcher(target, &path)?, "target").await;
        result?;

        let (result, out) = dispatch(&dispatcher(Command::Targets, &path)?, "targets").await;
        result?;
        let rows: Vec<&str> = out.lines().skip(1).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with('*'));
        assert!(rows[0].contains("prod"));
        assert!(rows[0].contains("https://prod.example"));
        assert!(rows[0].ends_with("true"));
        Ok(())
    }

    struct MutateThenFail;

    #[async_trait]
    impl CommandHandler for MutateThenFail {
        fn verb(&self) -> Verb {
            Verb::Target
        }

        async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()> {
            if let Some(session) = ctx.session.as_deref_mut() {
                session.set_target("staging", "https://staging.example", false);
            }
            Err(CliError::validation("boom"))
        }
    }

    #[tokio::test]
    async fn failed_handler_does_not_persist_changes() -> CliResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.yml");
        let mut session = SessionConfig::default();
        session.set_target("prod", "https://prod.example", false);
        write_session(&path, &session)?;
        let before = fs::read_to_string(&path)?;

        let mut registry = CommandRegistry::default();
        registry.register("mutate", Arc::new(MutateThenFail));
        let dispatcher = Dispatcher::new(
            registry,
            DispatchSettings {
                config_path: Some(path.clone()),
                trace: None,
            },
        );
        let (result, _) = dispatch(&dispatcher, "mutate").await;

        assert!(matches!(result, Err(CliError::Validation(_))));
        assert_eq!(fs::read_to_string(&path)?, before);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_session_is_a_config_error() -> CliResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.yml");
        fs::write(&path, "targets: [not, a, map")?;

        let (result, _) = dispatch(&dispatcher(Command::Targets, &path)?, "targets").await;
        let err = result.err();
        assert!(matches!(err, Some(CliError::ConfigLoad(_))));
        assert_eq!(err.map(|err| err.exit_code()), Some(3));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn server_verb_never_reads_the_session() -> CliResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.yml");
        fs::write(&path, "targets: [not, a, map")?;

        let server = Command::Server(crate::cli::ServerArgs {
            manifest: dir.path().join("ddayconfig.yml"),
            server_bin: PathBuf::from("true"),
        });
        let (result, _) = dispatch(&dispatcher(server, &path)?, "server").await;
        result?;
        assert_eq!(fs::read_to_string(&path)?, "targets: [not, a, map");
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_address_fails_at_bootstrap() -> CliResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.yml");
        let mut session = SessionConfig::default();
        session.set_target("broken", "not a url", false);
        write_session(&path, &session)?;

        let (result, _) = dispatch(&dispatcher(Command::Info, &path)?, "info").await;
        let err = result.err();
        assert!(matches!(err, Some(CliError::AddressParse { .. })));
        assert_eq!(err.map(|err| err.exit_code()), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_verb_is_rejected() -> CliResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.yml");
        let (result, _) = dispatch(&dispatcher(Command::Info, &path)?, "frobnicate").await;
        assert!(matches!(result, Err(CliError::UnknownCommand(_))));
        Ok(())
    }

    #[tokio::test]
    async fn aliases_dispatch_like_the_canonical_verb() -> CliResult<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/v1/cache");
            then.status(200).json_body(serde_json::json!({"content": []}));
        });
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.yml");
        let mut session = SessionConfig::default();
        session.set_target("mock", &server.base_url(), false);
        write_session(&path, &session)?;

        let dispatcher = dispatcher(Command::Dashboard, &path)?;
        let (canonical, expected) = dispatch(&dispatcher, "dashboard").await;
        canonical?;
        let (aliased, actual) = dispatch(&dispatcher, "dash").await;
        aliased?;

        assert_eq!(actual, expected);
        Ok(())
    }
}
