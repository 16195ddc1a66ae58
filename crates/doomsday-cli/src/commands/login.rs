//! `login`: exchange credentials for a token on the current target.

use std::io::{self, BufRead, IsTerminal};

use anyhow::anyhow;
use async_trait::async_trait;
use doomsday_api_models::{AuthRequest, AuthType};

use crate::cli::LoginArgs;
use crate::client::{CliError, CliResult};
use crate::registry::{CommandContext, CommandHandler, Verb, missing_session};

pub(crate) struct LoginCommand {
    args: LoginArgs,
}

impl LoginCommand {
    pub(crate) const fn new(args: LoginArgs) -> Self {
        Self { args }
    }
}

#[async_trait]
impl CommandHandler for LoginCommand {
    fn verb(&self) -> Verb {
        Verb::Login
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()> {
        let client = ctx.client()?;
        let info = client.info().await?;

        match info.auth_type {
            AuthType::None => {
                writeln!(ctx.out, "This doomsday server does not require authentication")?;
            }
            AuthType::Userpass => {
                let request = AuthRequest {
                    username: resolve_username(&self.args)?,
                    password: resolve_password(&self.args)?,
                };
                let auth = client.authenticate(&request).await?;

                let session = ctx.session.as_deref_mut().ok_or_else(missing_session)?;
                let name = session
                    .current_target()
                    .map(|target| target.name.clone())
                    .ok_or(CliError::NoTargetSelected)?;
                session
                    .set_token(&name, auth.token)
                    .map_err(CliError::failure)?;
                tracing::info!(target_name = %name, "stored session token");
                writeln!(ctx.out, "Logged in to {name} as {}", request.username)?;
            }
        }
        Ok(())
    }
}

fn resolve_username(args: &LoginArgs) -> CliResult<String> {
    if let Some(value) = &args.username {
        return non_empty(value.trim(), "username");
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(CliError::validation(
            "username is required (pass --username when stdin is not a terminal)",
        ));
    }
    eprint!("Username: ");
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .map_err(|err| CliError::failure(anyhow!("failed to read username from stdin: {err}")))?;
    non_empty(line.trim(), "username")
}

fn resolve_password(args: &LoginArgs) -> CliResult<String> {
    if let Some(value) = &args.password {
        return non_empty(value, "password");
    }

    if !io::stdin().is_terminal() {
        return Err(CliError::validation(
            "password is required (pass --password when stdin is not a terminal)",
        ));
    }
    let password = rpassword::prompt_password("Password: ")
        .map_err(|err| CliError::failure(anyhow!("failed to read password from stdin: {err}")))?;
    non_empty(&password, "password")
}

fn non_empty(value: &str, field: &str) -> CliResult<String> {
    if value.is_empty() {
        return Err(CliError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{mock_session, run_handler};
    use httpmock::prelude::*;
    use serde_json::json;

    fn credentials(username: &str, password: &str) -> LoginArgs {
        LoginArgs {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn userpass_login_stores_token_on_current_target() -> CliResult<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/v1/info");
            then.status(200)
                .json_body(json!({"version": "0.9.1", "auth_type": "userpass"}));
        });
        let auth = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/auth")
                .json_body(json!({"username": "admin", "password": "hunter2"}));
            then.status(200).json_body(json!({"token": "fresh-token"}));
        });

        let (mut session, client) = mock_session(&server, "")?;
        let command = LoginCommand::new(credentials(" admin ", "hunter2"));
        let (result, out) = run_handler(&command, &mut session, Some(&client)).await;
        result?;

        auth.assert();
        assert_eq!(out, "Logged in to mock as admin\n");
        assert_eq!(
            session.current_target().map(|t| t.token.as_str()),
            Some("fresh-token")
        );
        Ok(())
    }

    #[tokio::test]
    async fn open_server_needs_no_credentials() -> CliResult<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/v1/info");
            then.status(200)
                .json_body(json!({"version": "0.9.1", "auth_type": "none"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/v1/auth");
            then.status(500);
        });

        let (mut session, client) = mock_session(&server, "")?;
        let command = LoginCommand::new(LoginArgs::default());
        let (result, out) = run_handler(&command, &mut session, Some(&client)).await;
        result?;

        assert!(out.contains("does not require authentication"));
        assert_eq!(session.current_target().map(|t| t.token.as_str()), Some(""));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_credentials_leave_token_untouched() -> CliResult<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/v1/info");
            then.status(200)
                .json_body(json!({"version": "0.9.1", "auth_type": "userpass"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/v1/auth");
            then.status(401);
        });

        let (mut session, client) = mock_session(&server, "old")?;
        let command = LoginCommand::new(credentials("admin", "wrong"));
        let (result, _) = run_handler(&command, &mut session, Some(&client)).await;

        assert!(matches!(result, Err(CliError::Unauthorized)));
        assert_eq!(session.current_target().map(|t| t.token.as_str()), Some("old"));
        Ok(())
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let err = resolve_username(&credentials("   ", "pw")).err();
        assert_eq!(err.map(|err| err.exit_code()), Some(2));
        let err = resolve_password(&credentials("admin", "")).err();
        assert_eq!(err.map(|err| err.exit_code()), Some(2));
    }
}
