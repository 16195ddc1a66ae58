//! Output renderers and formatting helpers for CLI commands.

use std::io::{self, Write};

use chrono::{DateTime, TimeDelta, Utc};
use doomsday_api_models::{CacheItem, InfoResponse, SchedulerInfo, SchedulerTask};
use doomsday_session::{SessionConfig, TargetRecord};
use reqwest::Url;

use crate::commands::certs::Dashboard;

const MINUTES_PER_HOUR: i64 = 60;
const HOURS_PER_DAY: i64 = 24;
const DAYS_PER_YEAR: i64 = 365;

pub(crate) fn render_targets<W: Write + ?Sized>(
    out: &mut W,
    session: &SessionConfig,
) -> io::Result<()> {
    let records: Vec<&TargetRecord> = session.targets().collect();
    if records.is_empty() {
        return writeln!(out, "No targets configured");
    }

    let name_width = column_width("NAME", records.iter().map(|t| t.name.as_str()));
    let address_width = column_width("ADDRESS", records.iter().map(|t| t.address.as_str()));
    writeln!(
        out,
        "{:<7} {:<name_width$} {:<address_width$} INSECURE",
        "CURRENT", "NAME", "ADDRESS"
    )?;
    for record in records {
        let marker = if session.is_current(&record.name) { "*" } else { "" };
        writeln!(
            out,
            "{:<7} {:<name_width$} {:<address_width$} {}",
            marker, record.name, record.address, record.skip_verify
        )?;
    }
    Ok(())
}

pub(crate) fn render_current_target<W: Write + ?Sized>(
    out: &mut W,
    current: Option<&TargetRecord>,
) -> io::Result<()> {
    let Some(target) = current else {
        return writeln!(out, "No target selected");
    };
    writeln!(out, "name: {}", target.name)?;
    writeln!(out, "address: {}", target.address)?;
    writeln!(out, "insecure: {}", target.skip_verify)?;
    writeln!(out, "logged in: {}", !target.token.is_empty())
}

/// Table of certificates in the order given.
pub(crate) fn render_cert_list<W: Write + ?Sized>(
    out: &mut W,
    items: &[&CacheItem],
    now: DateTime<Utc>,
) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "No certificates matched");
    }

    let name_width = column_width("COMMON NAME", items.iter().map(|i| i.common_name.as_str()));
    let expiry: Vec<String> = items.iter().map(|item| time_left_label(item, now)).collect();
    let expiry_width = column_width("EXPIRY", expiry.iter().map(String::as_str));
    writeln!(
        out,
        "{:<name_width$}  {:<expiry_width$}  PATHS",
        "COMMON NAME", "EXPIRY"
    )?;
    for (item, left) in items.iter().zip(&expiry) {
        writeln!(
            out,
            "{:<name_width$}  {:<expiry_width$}  {}",
            item.common_name,
            left,
            format_paths(item)
        )?;
    }
    Ok(())
}

pub(crate) fn render_dashboard<W: Write + ?Sized>(
    out: &mut W,
    dashboard: &Dashboard<'_>,
    now: DateTime<Utc>,
) -> io::Result<()> {
    let mut printed = false;
    for bucket in &dashboard.buckets {
        if bucket.items.is_empty() {
            continue;
        }
        if printed {
            writeln!(out)?;
        }
        printed = true;
        writeln!(out, "{} ({})", bucket.title, bucket.items.len())?;
        for item in &bucket.items {
            writeln!(
                out,
                "  {}  {}  {}",
                item.common_name,
                time_left_label(item, now),
                format_paths(item)
            )?;
        }
    }
    if !printed {
        writeln!(out, "Nothing expires within a year")?;
    }
    if dashboard.later > 0 {
        writeln!(out)?;
        writeln!(out, "{} more certificate(s) expire after a year", dashboard.later)?;
    }
    Ok(())
}

pub(crate) fn render_scheduler<W: Write + ?Sized>(
    out: &mut W,
    info: &SchedulerInfo,
) -> io::Result<()> {
    writeln!(out, "workers: {}", info.workers)?;
    render_tasks(out, "running", &info.running)?;
    render_tasks(out, "pending", &info.pending)
}

fn render_tasks<W: Write + ?Sized>(
    out: &mut W,
    label: &str,
    tasks: &[SchedulerTask],
) -> io::Result<()> {
    writeln!(out, "{label} tasks: {}", tasks.len())?;
    for task in tasks {
        let at = DateTime::from_timestamp(task.at, 0)
            .map_or_else(|| task.at.to_string(), |at| at.to_rfc3339());
        let ready = if task.ready { " ready" } else { "" };
        writeln!(
            out,
            "  #{:<5} {:<8} {:<20} {}{}",
            task.id, task.kind, task.backend, at, ready
        )?;
        if !task.reason.is_empty() {
            writeln!(out, "         reason: {}", task.reason)?;
        }
    }
    Ok(())
}

pub(crate) fn render_info<W: Write + ?Sized>(
    out: &mut W,
    info: &InfoResponse,
    target: &Url,
    skip_verify: bool,
) -> io::Result<()> {
    writeln!(out, "target: {target}")?;
    writeln!(out, "version: {}", info.version)?;
    writeln!(out, "auth type: {}", info.auth_type.as_str())?;
    if skip_verify {
        writeln!(out, "tls verification: disabled")?;
    }
    Ok(())
}

/// Human-readable time until expiry, e.g. `1y 12d 3h`.
pub(crate) fn format_time_left(left: TimeDelta) -> String {
    if left <= TimeDelta::zero() {
        return "expired".to_string();
    }
    let total_minutes = left.num_minutes();
    if total_minutes == 0 {
        return "<1m".to_string();
    }

    let minutes = total_minutes % MINUTES_PER_HOUR;
    let total_hours = total_minutes / MINUTES_PER_HOUR;
    let hours = total_hours % HOURS_PER_DAY;
    let total_days = total_hours / HOURS_PER_DAY;
    let days = total_days % DAYS_PER_YEAR;
    let years = total_days / DAYS_PER_YEAR;

    let parts: Vec<String> = [(years, 'y'), (days, 'd'), (hours, 'h'), (minutes, 'm')]
        .into_iter()
        .filter(|(amount, _)| *amount > 0)
        .take(3)
        .map(|(amount, unit)| format!("{amount}{unit}"))
        .collect();
    parts.join(" ")
}

fn time_left_label(item: &CacheItem, now: DateTime<Utc>) -> String {
    item.expires_at()
        .map_or_else(|| "unknown".to_string(), |at| format_time_left(at - now))
}

fn format_paths(item: &CacheItem) -> String {
    item.paths
        .iter()
        .map(|path| format!("{}:{}", path.backend, path.location))
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(str::len).fold(header.len(), usize::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doomsday_api_models::{AuthType, CacheItemPath};

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    fn cert(name: &str, expires_in: TimeDelta) -> CacheItem {
        CacheItem {
            common_name: name.to_string(),
            not_after: (now() + expires_in).timestamp(),
            paths: vec![CacheItemPath {
                backend: "vault".to_string(),
                location: format!("secret/{name}"),
            }],
        }
    }

    fn rendered(render: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buffer = Vec::new();
        assert!(render(&mut buffer).is_ok());
        String::from_utf8_lossy(&buffer).to_string()
    }

    #[test]
    fn time_left_uses_largest_units() {
        assert_eq!(format_time_left(TimeDelta::seconds(-5)), "expired");
        assert_eq!(format_time_left(TimeDelta::zero()), "expired");
        assert_eq!(format_time_left(TimeDelta::seconds(30)), "<1m");
        assert_eq!(format_time_left(TimeDelta::minutes(90)), "1h 30m");
        assert_eq!(
            format_time_left(TimeDelta::days(400) + TimeDelta::hours(5) + TimeDelta::minutes(1)),
            "1y 35d 5h"
        );
    }

    #[test]
    fn targets_table_marks_current() {
        let mut session = SessionConfig::default();
        session.set_target("dev", "https://dev.example", false);
        session.set_target("prod", "https://prod.example", true);

        let text = rendered(|out| render_targets(out, &session));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("CURRENT"));
        assert!(lines[1].contains("dev") && lines[1].ends_with("false"));
        assert!(lines[2].starts_with('*') && lines[2].ends_with("true"));
    }

    #[test]
    fn empty_targets_table_says_so() {
        let text = rendered(|out| render_targets(out, &SessionConfig::default()));
        assert_eq!(text, "No targets configured\n");
    }

    #[test]
    fn cert_list_shows_expiry_and_paths() {
        let soon = cert("soon.example", TimeDelta::days(3));
        let gone = cert("gone.example", TimeDelta::days(-1));
        let text = rendered(|out| render_cert_list(out, &[&gone, &soon], now()));

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("COMMON NAME"));
        assert!(lines[1].starts_with("gone.example") && lines[1].contains("expired"));
        assert!(lines[2].contains("3d") && lines[2].ends_with("vault:secret/soon.example"));
    }

    #[test]
    fn info_mentions_disabled_verification() -> Result<(), url::ParseError> {
        let info = InfoResponse {
            version: "1.0.0".into(),
            auth_type: AuthType::None,
        };
        let url = Url::parse("https://prod.example")?;
        let text = rendered(|out| render_info(out, &info, &url, true));
        assert!(text.contains("auth type: none"));
        assert!(text.contains("tls verification: disabled"));
        Ok(())
    }

    #[test]
    fn scheduler_lists_tasks() {
        let info = SchedulerInfo {
            workers: 2,
            pending: vec![SchedulerTask {
                id: 7,
                at: 0,
                backend: "vault".into(),
                reason: "scheduled".into(),
                kind: "refresh".into(),
                ready: true,
            }],
            running: Vec::new(),
        };
        let text = rendered(|out| render_scheduler(out, &info));
        assert!(text.starts_with("workers: 2\nrunning tasks: 0\npending tasks: 1\n"));
        assert!(text.contains("#7"));
        assert!(text.contains("1970-01-01T00:00:00+00:00 ready"));
        assert!(text.contains("reason: scheduled"));
    }
}
