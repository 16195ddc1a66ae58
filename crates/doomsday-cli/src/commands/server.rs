//! `server`: run the doomsday server in the foreground.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use tokio::process::Command;

use crate::cli::ServerArgs;
use crate::client::{CliError, CliResult};
use crate::registry::{CommandContext, CommandHandler, Verb};

pub(crate) const DEFAULT_MANIFEST: &str = "ddayconfig.yml";
pub(crate) const DEFAULT_SERVER_BIN: &str = "doomsday-server";

pub(crate) struct ServerCommand {
    args: ServerArgs,
}

impl ServerCommand {
    pub(crate) const fn new(args: ServerArgs) -> Self {
        Self { args }
    }
}

#[async_trait]
impl CommandHandler for ServerCommand {
    fn verb(&self) -> Verb {
        Verb::Server
    }

    async fn execute(&self, _ctx: &mut CommandContext<'_>) -> CliResult<()> {
        let ServerArgs {
            manifest,
            server_bin,
        } = &self.args;
        tracing::info!(
            server_bin = %server_bin.display(),
            manifest = %manifest.display(),
            "starting doomsday server"
        );

        let status = Command::new(server_bin)
            .arg("--manifest")
            .arg(manifest)
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to launch `{}`", server_bin.display()))
            .map_err(CliError::failure)?;

        if status.success() {
            return Ok(());
        }
        Err(CliError::failure(anyhow!(
            "server exited unsuccessfully ({status})"
        )))
    }
}
