//! `scheduler`: inspect the server's refresh scheduler.

use async_trait::async_trait;

use crate::client::CliResult;
use crate::output::render_scheduler;
use crate::registry::{CommandContext, CommandHandler, Verb};

pub(crate) struct SchedulerCommand;

#[async_trait]
impl CommandHandler for SchedulerCommand {
    fn verb(&self) -> Verb {
        Verb::Scheduler
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()> {
        let state = ctx.client()?.scheduler().await?;
        render_scheduler(&mut *ctx.out, &state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CliError;
    use crate::commands::test_support::{mock_session, run_handler};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn prints_workers_and_queues() -> CliResult<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/v1/scheduler");
            then.status(200).json_body(json!({
                "workers": 4,
                "pending": [],
                "running": [{
                    "id": 12,
                    "at": 0,
                    "backend": "credhub",
                    "reason": "interval",
                    "kind": "refresh",
                    "ready": false
                }]
            }));
        });

        let (mut session, client) = mock_session(&server, "")?;
        let (result, out) = run_handler(&SchedulerCommand, &mut session, Some(&client)).await;
        result?;
        assert!(out.starts_with("workers: 4\nrunning tasks: 1\n"));
        assert!(out.contains("credhub"));
        assert!(out.ends_with("pending tasks: 0\n"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_client_is_reported() {
        let mut session = doomsday_session::SessionConfig::default();
        let (result, _) = run_handler(&SchedulerCommand, &mut session, None).await;
        assert!(matches!(result, Err(CliError::Failure(_))));
    }
}
