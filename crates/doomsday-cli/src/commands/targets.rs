//! `target` and `targets`: manage the saved set of doomsday servers.

use async_trait::async_trait;
use reqwest::Url;

use crate::cli::TargetArgs;
use crate::client::{CliError, CliResult};
use crate::output::{render_current_target, render_targets};
use crate::registry::{CommandContext, CommandHandler, Verb, missing_session};

pub(crate) struct TargetCommand {
    args: TargetArgs,
}

impl TargetCommand {
    pub(crate) const fn new(args: TargetArgs) -> Self {
        Self { args }
    }
}

#[async_trait]
impl CommandHandler for TargetCommand {
    fn verb(&self) -> Verb {
        Verb::Target
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()> {
        let session = ctx.session.as_deref_mut().ok_or_else(missing_session)?;
        let args = &self.args;

        let Some(name) = args.name.as_deref() else {
            if args.delete {
                return Err(CliError::validation("--delete requires a target name"));
            }
            render_current_target(&mut *ctx.out, session.current_target())?;
            return Ok(());
        };

        if args.delete {
            session.delete_target(name);
            writeln!(ctx.out, "Deleted target {name}")?;
            return Ok(());
        }

        match args.address.as_deref() {
            Some(address) => {
                if let Err(err) = Url::parse(address) {
                    tracing::warn!(
                        target_name = name,
                        error = %err,
                        "target address is not a valid URL"
                    );
                }
                session.set_target(name, address, args.insecure);
                writeln!(ctx.out, "Set target {name}")?;
            }
            None => {
                if args.insecure {
                    return Err(CliError::validation(format!(
                        "--insecure only applies when setting an address; \
                         run `doomsday target {name} <address> --insecure`"
                    )));
                }
                session.select_target(name).map_err(|err| {
                    CliError::validation(format!(
                        "{err}; add it with `doomsday target {name} <address>`"
                    ))
                })?;
                writeln!(ctx.out, "Now targeting {name}")?;
            }
        }
        Ok(())
    }
}

pub(crate) struct TargetsCommand;

#[async_trait]
impl CommandHandler for TargetsCommand {
    fn verb(&self) -> Verb {
        Verb::Targets
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()> {
        let session = ctx.session.as_deref().ok_or_else(missing_session)?;
        render_targets(&mut *ctx.out, session)?;
        Ok(())
    }
}
