//! Excel export links.
//!
//! The date range goes through the dialog layer either way: flags are
//! answered immediately, otherwise the range is prompted for on the
//! terminal. Both paths get the same inversion and length checks.

use std::io::IsTerminal;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone};
use dialoguer::Input;
use serde::Serialize;
use tracing::debug;

use tidewatch_api::ExportQuery;
use tidewatch_core::dialog::{
    DateRange, DateRangeProps, DateRangeSelector, DialogComponent, DialogHost, Responder,
};

use crate::cli::{ExportArgs, GlobalOpts};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

// ── Dialog host & components ────────────────────────────────────────

/// Dialogs on a terminal have nothing to mount; containers only mark
/// where a prompt begins and ends.
struct TerminalHost;

impl DialogHost for TerminalHost {
    fn create_container(&self, container_id: &str) -> Result<(), String> {
        debug!(container = %container_id, "prompt opened");
        Ok(())
    }

    fn destroy_container(&self, container_id: &str) {
        debug!(container = %container_id, "prompt closed");
    }
}

/// A range already supplied on the command line.
struct GivenRange(DateRange);

impl DialogComponent<Option<DateRange>> for GivenRange {
    type Props = DateRangeProps;

    fn mount(
        self,
        _container_id: &str,
        _props: DateRangeProps,
        responder: Responder<Option<DateRange>>,
    ) -> Result<(), String> {
        responder.resolve(Some(self.0));
        Ok(())
    }
}

/// Asks for both ends of the range on stdin. Blank input cancels.
struct PromptPicker;

impl DialogComponent<Option<DateRange>> for PromptPicker {
    type Props = DateRangeProps;

    fn mount(
        self,
        _container_id: &str,
        props: DateRangeProps,
        responder: Responder<Option<DateRange>>,
    ) -> Result<(), String> {
        if !std::io::stdin().is_terminal() {
            return Err("pass --start and --end when not running interactively".into());
        }
        tokio::task::spawn_blocking(move || {
            eprintln!(
                "Export range (RFC 3339 or YYYY-MM-DD, at most {} days; blank to cancel)",
                props.max_days
            );
            let ask = |prompt: &str| {
                Input::<String>::new()
                    .with_prompt(prompt)
                    .allow_empty(true)
                    .interact_text()
            };
            let start = match ask("Start") {
                Ok(s) if s.trim().is_empty() => return responder.resolve(None),
                Ok(s) => s,
                Err(e) => return responder.reject(e.to_string()),
            };
            let end = match ask("End") {
                Ok(s) if s.trim().is_empty() => return responder.resolve(None),
                Ok(s) => s,
                Err(e) => return responder.reject(e.to_string()),
            };
            match parse_range(&start, &end) {
                Ok(range) => responder.resolve(Some(range)),
                Err(reason) => responder.reject(reason),
            }
        });
        Ok(())
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

/// RFC 3339, or a bare date meaning the start (or end) of that local day.
pub(super) fn parse_bound(
    input: &str,
    end_of_day: bool,
) -> Result<DateTime<FixedOffset>, String> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at);
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| format!("'{input}' is not a date (use RFC 3339 or YYYY-MM-DD)"))?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .unwrap_or_default();
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|at| at.fixed_offset())
        .ok_or_else(|| format!("'{input}' does not exist in the local time zone"))
}

fn parse_range(start: &str, end: &str) -> Result<DateRange, String> {
    Ok(DateRange {
        start: parse_bound(start, false)?,
        end: parse_bound(end, true)?,
    })
}

// ── Handler ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ExportLink {
    url: String,
    start: String,
    end: String,
}

pub async fn handle(ctx: &Context, args: ExportArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let target = ctx.console.resolve_target(&args.device, args.channel).await?;

    let host: Arc<dyn DialogHost> = Arc::new(TerminalHost);
    let props = DateRangeProps {
        max_days: args.max_days,
        use_utc: args.utc,
    };
    let selector = DateRangeSelector::new(host, props);
    let range = match (args.start, args.end) {
        (Some(start), Some(end)) => {
            let given = parse_range(&start, &end).map_err(|reason| CliError::Validation {
                field: "range".into(),
                reason,
            })?;
            selector.select(GivenRange(given)).await
        }
        _ => selector.select(PromptPicker).await,
    };
    let Some(range) = range else {
        return Err(CliError::Validation {
            field: "range".into(),
            reason: format!(
                "no usable range selected (it must not end before it starts or span more than {} days)",
                args.max_days
            ),
        });
    };

    let url = ctx.console.export_url(&ExportQuery {
        model_number: target.model_number,
        serial_number: target.serial_number,
        upload_channel: target.upload_channel,
        start: range.start.to_rfc3339(),
        end: range.end.to_rfc3339(),
    })?;
    let link = ExportLink {
        url: url.to_string(),
        start: range.start.to_rfc3339(),
        end: range.end.to_rfc3339(),
    };
    let out = output::render_single(&global.output, &link, |l| l.url.clone(), |l| l.url.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_bounds_keep_their_offset() {
        let at = parse_bound("2024-05-01T08:00:00+08:00", false).unwrap();
        assert_eq!(at.offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn bare_dates_cover_whole_days() {
        let range = parse_range("2024-05-01", "2024-05-02").unwrap();
        assert_eq!(range.start.format("%H:%M:%S").to_string(), "00:00:00");
        assert_eq!(range.end.format("%H:%M:%S").to_string(), "23:59:59");
        assert_eq!(range.days(), 1);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_bound("yesterday", false).is_err());
    }

    #[tokio::test]
    async fn given_range_is_checked_against_max_days() {
        let host: Arc<dyn DialogHost> = Arc::new(TerminalHost);
        let selector = DateRangeSelector::new(
            host,
            DateRangeProps {
                max_days: 7,
                use_utc: true,
            },
        );
        let long = parse_range("2024-05-01T00:00:00Z", "2024-06-01T00:00:00Z").unwrap();
        assert_eq!(selector.select(GivenRange(long)).await, None);

        let short = parse_range("2024-05-01T08:00:00+08:00", "2024-05-02T00:00:00Z").unwrap();
        let picked = selector.select(GivenRange(short)).await.unwrap();
        assert_eq!(picked.start.to_rfc3339(), "2024-05-01T00:00:00+00:00");
    }
}
