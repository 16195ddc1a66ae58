//! `info`: describe the currently targeted server.

use async_trait::async_trait;

use crate::client::CliResult;
use crate::output::render_info;
use crate::registry::{CommandContext, CommandHandler, Verb};

pub(crate) struct InfoCommand;

#[async_trait]
impl CommandHandler for InfoCommand {
    fn verb(&self) -> Verb {
        Verb::Info
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()> {
        let client = ctx.client()?;
        let info = client.info().await?;
        render_info(&mut *ctx.out, &info, client.base_url(), client.skip_verify())?;
        Ok(())
    }
}
