//! Telemetry browsing: anchor-paged feeds and the offset-paged listing.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use tidewatch_api::data_center::models::DataQueryOptions;
use tidewatch_core::Notifier;
use tidewatch_core::pagination::DeviceTarget;
use tidewatch_core::pagination::{
    AnchorPager, BeidouFeed, BeidouSelector, DeviceDataSource, Feed, IridiumFeed,
    IridiumSelector, OffsetPager, ParsedFeed, StatusFeed,
};

use crate::cli::{DataArgs, DataCommand, GlobalOpts, PagingArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

use super::{export, watch};

fn notifier(ctx: &Context) -> Arc<dyn Notifier> {
    ctx.notifier.clone()
}

fn page_limit(ctx: &Context, paging: &PagingArgs) -> Result<u32, CliError> {
    match paging.limit {
        Some(0) => Err(CliError::Validation {
            field: "limit".into(),
            reason: "must be at least 1".into(),
        }),
        Some(limit) => Ok(limit),
        None => Ok(ctx.console.config().page_size),
    }
}

/// Walk up to `--pages` pages, newest first, starting below `--before`.
async fn walk<F: Feed>(
    pager: &AnchorPager<F>,
    selector: F::Selector,
    paging: &PagingArgs,
) -> Vec<F::Item> {
    let pages = paging.pages.max(1);
    pager.seek(selector, paging.before.clone()).await;

    let mut records = Vec::new();
    for page in 1..=pages {
        let state = pager.snapshot();
        let done = state.is_last_page || state.items.is_empty();
        records.extend(state.items);
        if done || page == pages {
            break;
        }
        pager.go_next_page().await;
    }
    debug!(count = records.len(), "telemetry pages collected");
    records
}

fn to_values<T: Serialize>(items: &[T]) -> Result<Vec<Value>, CliError> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(CliError::from))
        .collect()
}

fn print_records(
    ctx: &Context,
    records: &[Value],
    decode: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = output::render_records(&global.output, records, decode);
    output::print_output(&out, global.quiet);
    ctx.check_notices()
}

/// The records ahead of `head` in a newest-first page. A head that has
/// scrolled off (or was never set) means the whole page is new.
fn ahead_of<'a>(items: &'a [Value], head: Option<&Value>) -> &'a [Value] {
    let end = head
        .and_then(|head| items.iter().position(|r| r == head))
        .unwrap_or(items.len());
    &items[..end]
}

/// Keep the first page live, printing pushes oldest first as they land.
async fn follow(
    ctx: &Context,
    pager: &Arc<AnchorPager<ParsedFeed>>,
    decode: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut view = pager.subscribe();
    let mut head = view.borrow_and_update().items.first().cloned();

    let live = ctx.console.follow(pager).await?;
    if live.status().is_disconnected {
        live.close().await;
        return Err(CliError::ConnectionFailed {
            url: ctx.console.config().data_center_url.to_string(),
            reason: "could not subscribe to live device data".into(),
        });
    }
    output::success("Following live data (Ctrl-C to stop)", ctx.color, global.quiet);

    let mut status = live.watch_status();
    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let items = view.borrow_and_update().items.clone();
                for record in ahead_of(&items, head.as_ref()).iter().rev() {
                    watch::print_record(record, decode, global);
                }
                head = items.first().cloned();
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                watch::report_status(current, ctx.color, global.quiet);
                if current.is_disconnected {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
        }
    }

    live.close().await;
    ctx.check_notices()
}

/// Storage bucket behind the target's device model.
async fn bucket_of(ctx: &Context, target: &DeviceTarget) -> Result<String, CliError> {
    let models = ctx.console.device_models(false).await?;
    models
        .iter()
        .find(|m| m.id == target.device_model_id)
        .and_then(|m| m.bucket_maps.as_ref())
        .map(|b| b.bucket_name.clone())
        .ok_or_else(|| CliError::Validation {
            field: "device".into(),
            reason: format!("model {} has no storage bucket", target.model_number),
        })
}

fn query_bound(
    field: &str,
    input: Option<&str>,
    end_of_day: bool,
) -> Result<Option<String>, CliError> {
    input
        .map(|input| {
            export::parse_bound(input, end_of_day)
                .map(|at| at.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true))
                .map_err(|reason| CliError::Validation {
                    field: field.into(),
                    reason,
                })
        })
        .transpose()
}

pub async fn handle(ctx: &Context, args: DataArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let data = ctx.console.data_center().clone();

    match args.command {
        DataCommand::Parsed {
            device,
            channel,
            decode,
            follow: keep_following,
            paging,
        } => {
            let target = ctx.console.resolve_target(&device, channel).await?;
            let pager = Arc::new(AnchorPager::new(
                ParsedFeed(data),
                page_limit(ctx, &paging)?,
                notifier(ctx),
            ));
            let records = walk(&pager, target, &paging).await;
            print_records(ctx, &records, decode, global)?;
            if keep_following {
                follow(ctx, &pager, decode, global).await?;
            }
            Ok(())
        }

        DataCommand::Query {
            device,
            channel,
            start,
            end,
            before,
            limit,
            ascending,
            decode,
        } => {
            let target = ctx.console.resolve_target(&device, None).await?;
            let options = DataQueryOptions {
                bucket: bucket_of(ctx, &target).await?,
                psn: Some(target.serial_number.clone()),
                upload_channel: channel,
                anchor_time: before,
                limit,
                start: query_bound("start", start.as_deref(), false)?,
                end: query_bound("end", end.as_deref(), true)?,
                sort_ascending: ascending.then_some(true),
                ..DataQueryOptions::default()
            };
            ctx.console.ensure_fresh().await?;
            let records = data.query_data(&options).await?;
            print_records(ctx, &records, decode, global)
        }

        DataCommand::Status {
            device,
            decode,
            paging,
        } => {
            let target = ctx.console.resolve_target(&device, None).await?;
            let pager =
                AnchorPager::new(StatusFeed(data), page_limit(ctx, &paging)?, notifier(ctx));
            let records = walk(&pager, target, &paging).await;
            print_records(ctx, &records, decode, global)
        }

        DataCommand::Beidou {
            from_card,
            to_card,
            paging,
        } => {
            let pager =
                AnchorPager::new(BeidouFeed(data), page_limit(ctx, &paging)?, notifier(ctx));
            let records = walk(&pager, BeidouSelector { from_card, to_card }, &paging).await;
            print_records(ctx, &to_values(&records)?, false, global)
        }

        DataCommand::Iridium { imei, paging } => {
            let pager =
                AnchorPager::new(IridiumFeed(data), page_limit(ctx, &paging)?, notifier(ctx));
            let records = walk(&pager, IridiumSelector { imei }, &paging).await;
            print_records(ctx, &to_values(&records)?, false, global)
        }

        DataCommand::Page {
            device,
            channel,
            page,
            size,
        } => {
            if size == 0 {
                return Err(CliError::Validation {
                    field: "size".into(),
                    reason: "must be at least 1".into(),
                });
            }
            let target = ctx.console.resolve_target(&device, None).await?;
            let pager = OffsetPager::new(DeviceDataSource(data), size, notifier(ctx));
            pager.load(target, channel, page).await;

            let state = pager.snapshot();
            print_records(ctx, &state.items, false, global)?;
            if !global.quiet {
                eprintln!(
                    "Page {} of {} ({} records, channel {})",
                    state.page_index,
                    pager.page_count(),
                    state.total,
                    state.upload_channel
                );
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn only_records_above_the_old_head_are_new() {
        let items = vec![json!({ "seq": 3 }), json!({ "seq": 2 }), json!({ "seq": 1 })];
        assert_eq!(ahead_of(&items, Some(&json!({ "seq": 2 }))), &items[..1]);
        assert!(ahead_of(&items, Some(&json!({ "seq": 3 }))).is_empty());
    }

    #[test]
    fn lost_head_makes_the_whole_page_new() {
        let items = vec![json!({ "seq": 9 }), json!({ "seq": 8 })];
        assert_eq!(ahead_of(&items, Some(&json!({ "seq": 1 }))).len(), 2);
        assert_eq!(ahead_of(&items, None).len(), 2);
    }

    #[test]
    fn query_bounds_go_out_in_utc() {
        let start = query_bound("start", Some("2024-05-01T08:00:00+08:00"), false).unwrap();
        assert_eq!(start.as_deref(), Some("2024-05-01T00:00:00.000Z"));
        assert_eq!(query_bound("end", None, true).unwrap(), None);
        assert!(query_bound("end", Some("soon"), true).is_err());
    }
}
