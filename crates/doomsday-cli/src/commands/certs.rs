//! Certificate cache views: `list`, `dashboard`, and `refresh`.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use doomsday_api_models::CacheItem;

use crate::cli::ListArgs;
use crate::client::{CliError, CliResult};
use crate::output::{render_cert_list, render_dashboard};
use crate::registry::{CommandContext, CommandHandler, Verb};

pub(crate) struct ListCommand {
    args: ListArgs,
}

impl ListCommand {
    pub(crate) const fn new(args: ListArgs) -> Self {
        Self { args }
    }
}

#[async_trait]
impl CommandHandler for ListCommand {
    fn verb(&self) -> Verb {
        Verb::List
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()> {
        validate_window(&self.args)?;
        let cache = ctx.client()?.cache().await?;
        let now = Utc::now();
        let items = filter_certs(&cache.content, &self.args, now);
        tracing::debug!(total = cache.content.len(), shown = items.len(), "filtered cache");
        render_cert_list(&mut *ctx.out, &items, now)?;
        Ok(())
    }
}

fn validate_window(args: &ListArgs) -> CliResult<()> {
    if let (Some(beyond), Some(within)) = (args.beyond, args.within)
        && beyond >= within
    {
        return Err(CliError::validation(
            "--beyond must be shorter than --within or no certificate can match",
        ));
    }
    Ok(())
}

/// Certificates whose time left falls inside the requested window, soonest first.
fn filter_certs<'a>(
    items: &'a [CacheItem],
    args: &ListArgs,
    now: DateTime<Utc>,
) -> Vec<&'a CacheItem> {
    let mut selected: Vec<&CacheItem> = items
        .iter()
        .filter(|item| {
            let Some(left) = item.expires_at().map(|at| at - now) else {
                return args.beyond.is_none() && args.within.is_none();
            };
            args.beyond.is_none_or(|beyond| left > beyond)
                && args.within.is_none_or(|within| left < within)
        })
        .collect();
    selected.sort_by(|a, b| {
        a.not_after
            .cmp(&b.not_after)
            .then_with(|| a.common_name.cmp(&b.common_name))
    });
    selected
}

/// One titled group of certificates on the dashboard.
pub(crate) struct Bucket<'a> {
    pub(crate) title: &'static str,
    pub(crate) items: Vec<&'a CacheItem>,
}

/// Certificates grouped by how soon they expire.
pub(crate) struct Dashboard<'a> {
    pub(crate) buckets: Vec<Bucket<'a>>,
    /// Certificates expiring after the last bucket; counted, not listed.
    pub(crate) later: usize,
}

impl<'a> Dashboard<'a> {
    pub(crate) fn build(items: &'a [CacheItem], now: DateTime<Utc>) -> Self {
        let bounds = [
            ("EXPIRED", TimeDelta::zero()),
            ("DOOM IMMINENT (< 1 week)", TimeDelta::days(7)),
            ("DANGER (< 4 weeks)", TimeDelta::days(28)),
            ("WARNING (< 1 year)", TimeDelta::days(365)),
        ];
        let mut buckets: Vec<Bucket<'a>> = bounds
            .iter()
            .map(|&(title, _)| Bucket {
                title,
                items: Vec::new(),
            })
            .collect();
        let mut later = 0;

        let mut sorted: Vec<&CacheItem> = items.iter().collect();
        sorted.sort_by_key(|item| item.not_after);
        for item in sorted {
            let left = item.expires_at().map_or(TimeDelta::zero(), |at| at - now);
            match bounds.iter().position(|(_, bound)| left <= *bound) {
                Some(index) => buckets[index].items.push(item),
                None => later += 1,
            }
        }
        Self { buckets, later }
    }
}

pub(crate) struct DashboardCommand;

#[async_trait]
impl CommandHandler for DashboardCommand {
    fn verb(&self) -> Verb {
        Verb::Dashboard
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()> {
        let cache = ctx.client()?.cache().await?;
        let now = Utc::now();
        let dashboard = Dashboard::build(&cache.content, now);
        render_dashboard(&mut *ctx.out, &dashboard, now)?;
        Ok(())
    }
}

pub(crate) struct RefreshCommand;

#[async_trait]
impl CommandHandler for RefreshCommand {
    fn verb(&self) -> Verb {
        Verb::Refresh
    }

    async fn execute(&self, ctx: &mut CommandContext<'_>) -> CliResult<()> {
        let client = ctx.client()?;
        client.refresh().await?;
        writeln!(ctx.out, "Cache refresh requested on {}", client.base_url())?;
        Ok(())
    }
}
