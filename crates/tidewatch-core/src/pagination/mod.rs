// ── Telemetry paging ──
//
// Two pagers over the data center feeds: `AnchorPager` walks a
// reverse-chronological feed with a rolling timestamp cursor, and
// `OffsetPager` walks the page/size/total device-data listing. Both keep
// their state in a `watch` channel so a renderer can follow changes, and
// both report outcomes through a `Notifier` instead of returning errors.

mod anchor;
mod feeds;
mod offset;

pub use anchor::{AnchorPager, AnchorState, Feed, Timestamped};
pub use feeds::{
    BeidouFeed, BeidouSelector, DeviceDataSource, DeviceTarget, IridiumFeed, IridiumSelector,
    ParsedFeed, StatusFeed,
};
pub use offset::{OffsetPager, OffsetState, PageSource};

use tracing::{error, info, warn};

/// A user-facing outcome of a paging operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

/// Surfaces pager outcomes to the user (toast, status line, log).
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Routes notices into the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Success(msg) => info!("{msg}"),
            Notice::Warning(msg) => warn!("{msg}"),
            Notice::Error(msg) => error!("{msg}"),
        }
    }
}
