// ── Dialogs as futures ──
//
// `open` mounts a component into its own container and hands back a future
// that settles when the component answers through its `Responder`. Each
// dialog owns its container; teardown runs exactly once no matter how the
// dialog ends.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Default upper bound for [`select_date_range`].
pub const DEFAULT_MAX_RANGE_DAYS: u32 = 60;

const CONTAINER_PREFIX: &str = "global-dialog-";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("dialog rejected: {reason}")]
    Rejected { reason: String },

    /// The component went away without answering.
    #[error("dialog dismissed")]
    Dismissed,

    #[error("dialog failed to mount: {message}")]
    Mount { message: String },
}

/// Where dialogs are mounted (a window, a terminal, a test recorder).
pub trait DialogHost: Send + Sync {
    fn create_container(&self, container_id: &str) -> Result<(), String>;

    /// Unmount the container's component and remove the container.
    fn destroy_container(&self, container_id: &str);
}

/// A component that can be shown as a dialog producing `T`.
pub trait DialogComponent<T>: Send {
    type Props: Send;

    /// Render into `container_id`. The component answers later (or
    /// immediately) through `responder`.
    fn mount(
        self,
        container_id: &str,
        props: Self::Props,
        responder: Responder<T>,
    ) -> Result<(), String>;
}

struct Teardown {
    host: Arc<dyn DialogHost>,
    container_id: String,
    done: AtomicBool,
}

impl Teardown {
    fn run(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(container = %self.container_id, "tearing down dialog");
        self.host.destroy_container(&self.container_id);
    }
}

/// The component's side of an open dialog.
///
/// Answering tears the dialog down before the caller is woken. Dropping
/// it unanswered dismisses the dialog.
pub struct Responder<T> {
    tx: Option<oneshot::Sender<Result<T, String>>>,
    teardown: Arc<Teardown>,
}

impl<T> std::fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("container_id", &self.teardown.container_id)
            .finish_non_exhaustive()
    }
}

impl<T> Responder<T> {
    pub fn container_id(&self) -> &str {
        &self.teardown.container_id
    }

    pub fn resolve(mut self, value: T) {
        self.settle(Ok(value));
    }

    pub fn reject(mut self, reason: impl Into<String>) {
        self.settle(Err(reason.into()));
    }

    fn settle(&mut self, outcome: Result<T, String>) {
        self.teardown.run();
        if let Some(tx) = self.tx.take() {
            // The caller may have stopped waiting.
            let _ = tx.send(outcome);
        }
    }
}

impl<T> Drop for Responder<T> {
    fn drop(&mut self) {
        self.teardown.run();
    }
}

/// Single-owner future for an open dialog's answer.
///
/// Dropping the handle closes the dialog.
#[must_use = "a dialog handle does nothing unless awaited"]
pub struct DialogHandle<T> {
    rx: oneshot::Receiver<Result<T, String>>,
    teardown: Arc<Teardown>,
    mount_error: Option<String>,
}

impl<T> std::fmt::Debug for DialogHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogHandle")
            .field("container_id", &self.teardown.container_id)
            .finish_non_exhaustive()
    }
}

impl<T> DialogHandle<T> {
    pub fn container_id(&self) -> &str {
        &self.teardown.container_id
    }
}

impl<T> Future for DialogHandle<T> {
    type Output = Result<T, DialogError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(message) = self.mount_error.take() {
            return Poll::Ready(Err(DialogError::Mount { message }));
        }
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            self.teardown.run();
            match received {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(reason)) => Err(DialogError::Rejected { reason }),
                Err(_) => Err(DialogError::Dismissed),
            }
        })
    }
}

impl<T> Drop for DialogHandle<T> {
    fn drop(&mut self) {
        self.teardown.run();
    }
}

/// Millisecond container id, bumped past the last one issued so two
/// dialogs opened in the same millisecond never share a container.
fn next_container_id() -> String {
    static LAST: AtomicU64 = AtomicU64::new(0);
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return format!("{CONTAINER_PREFIX}{next}"),
            Err(actual) => last = actual,
        }
    }
}

/// Mount `component` in a fresh container on `host`.
pub fn open<T, C>(host: &Arc<dyn DialogHost>, component: C, props: C::Props) -> DialogHandle<T>
where
    C: DialogComponent<T>,
{
    let container_id = next_container_id();
    let (tx, rx) = oneshot::channel();
    let teardown = Arc::new(Teardown {
        host: Arc::clone(host),
        container_id,
        done: AtomicBool::new(false),
    });
    let handle = |mount_error| DialogHandle {
        rx,
        teardown: Arc::clone(&teardown),
        mount_error,
    };

    if let Err(message) = host.create_container(&teardown.container_id) {
        warn!(container = %teardown.container_id, %message, "dialog container creation failed");
        teardown.run();
        return handle(Some(message));
    }

    let responder = Responder {
        tx: Some(tx),
        teardown: Arc::clone(&teardown),
    };
    match component.mount(&teardown.container_id, props, responder) {
        Ok(()) => handle(None),
        Err(message) => {
            warn!(container = %teardown.container_id, %message, "dialog mount failed");
            teardown.run();
            handle(Some(message))
        }
    }
}

// ── Date range selection ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DateRange {
    pub fn to_utc(self) -> Self {
        Self {
            start: self.start.with_timezone(&Utc).fixed_offset(),
            end: self.end.with_timezone(&Utc).fixed_offset(),
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeProps {
    pub max_days: u32,
    /// Return UTC instead of the picker's local offset.
    pub use_utc: bool,
}

impl Default for DateRangeProps {
    fn default() -> Self {
        Self {
            max_days: DEFAULT_MAX_RANGE_DAYS,
            use_utc: false,
        }
    }
}

/// Ask the user for a date range. `None` on cancel, failure, or a range
/// that is inverted or longer than `max_days`.
pub async fn select_date_range<C>(
    host: &Arc<dyn DialogHost>,
    picker: C,
    props: DateRangeProps,
) -> Option<DateRange>
where
    C: DialogComponent<Option<DateRange>, Props = DateRangeProps>,
{
    let range = match open(host, picker, props).await {
        Ok(Some(range)) => range,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "date range selection failed");
            return None;
        }
    };

    if range.end < range.start {
        warn!(?range, "date range ends before it starts");
        return None;
    }
    let span = range.end - range.start;
    if span > chrono::Duration::days(i64::from(props.max_days)) {
        warn!(days = span.num_days(), max_days = props.max_days, "date range too long");
        return None;
    }
    Some(if props.use_utc { range.to_utc() } else { range })
}

/// Date range picker that ignores re-entrant requests while one is open.
pub struct DateRangeSelector {
    host: Arc<dyn DialogHost>,
    props: DateRangeProps,
    selecting: AtomicBool,
}

impl std::fmt::Debug for DateRangeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateRangeSelector")
            .field("props", &self.props)
            .field("selecting", &self.is_selecting())
            .finish_non_exhaustive()
    }
}

impl DateRangeSelector {
    pub fn new(host: Arc<dyn DialogHost>, props: DateRangeProps) -> Self {
        Self {
            host,
            props,
            selecting: AtomicBool::new(false),
        }
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting.load(Ordering::SeqCst)
    }

    pub async fn select<C>(&self, picker: C) -> Option<DateRange>
    where
        C: DialogComponent<Option<DateRange>, Props = DateRangeProps>,
    {
        if self.selecting.swap(true, Ordering::SeqCst) {
            debug!("date range dialog already open");
            return None;
        }
        let _selecting = SelectingGuard(&self.selecting);
        select_date_range(&self.host, picker, self.props).await
    }
}

/// Clears the selecting flag however the selection ends, including when
/// the future is dropped mid-dialog.
struct SelectingGuard<'a>(&'a AtomicBool);

impl Drop for SelectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    // ── Test doubles ────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingHost {
        created: Mutex<Vec<String>>,
        destroyed: Mutex<Vec<String>>,
        refuse: bool,
    }

    impl RecordingHost {
        fn destroyed(&self) -> Vec<String> {
            self.destroyed.lock().unwrap().clone()
        }
    }

    impl DialogHost for RecordingHost {
        fn create_container(&self, container_id: &str) -> Result<(), String> {
            if self.refuse {
                return Err("no display".into());
            }
            self.created.lock().unwrap().push(container_id.to_owned());
            Ok(())
        }

        fn destroy_container(&self, container_id: &str) {
            self.destroyed.lock().unwrap().push(container_id.to_owned());
        }
    }

    /// Answers through a closure at mount time, or parks the responder.
    enum Script<T> {
        Resolve(T),
        Reject(&'static str),
        Abandon,
        Fail,
        Park(Arc<Mutex<Option<Responder<T>>>>),
    }

    impl<T: Send> DialogComponent<T> for Script<T> {
        type Props = ();

        fn mount(self, _container: &str, (): (), responder: Responder<T>) -> Result<(), String> {
            match self {
                Script::Resolve(v) => responder.resolve(v),
                Script::Reject(r) => responder.reject(r),
                Script::Abandon => drop(responder),
                Script::Fail => return Err("render error".into()),
                Script::Park(slot) => *slot.lock().unwrap() = Some(responder),
            }
            Ok(())
        }
    }

    fn host() -> (Arc<RecordingHost>, Arc<dyn DialogHost>) {
        let host = Arc::new(RecordingHost::default());
        let dyn_host: Arc<dyn DialogHost> = host.clone();
        (host, dyn_host)
    }

    // ── Teardown ────────────────────────────────────────────────────

    #[tokio::test]
    async fn resolve_tears_down_once() {
        let (rec, host) = host();
        let handle = open(&host, Script::Resolve(7), ());
        let id = handle.container_id().to_owned();

        assert_eq!(handle.await, Ok(7));
        assert_eq!(rec.destroyed(), vec![id]);
    }

    #[tokio::test]
    async fn reject_tears_down_once() {
        let (rec, host) = host();
        let result: Result<u8, _> = open(&host, Script::Reject("cancelled"), ()).await;

        assert_eq!(
            result,
            Err(DialogError::Rejected {
                reason: "cancelled".into()
            })
        );
        assert_eq!(rec.destroyed().len(), 1);
    }

    #[tokio::test]
    async fn dropped_responder_dismisses() {
        let (rec, host) = host();
        let result: Result<u8, _> = open(&host, Script::Abandon, ()).await;

        assert_eq!(result, Err(DialogError::Dismissed));
        assert_eq!(rec.destroyed().len(), 1);
    }

    #[tokio::test]
    async fn mount_failure_tears_down_and_rejects() {
        let (rec, host) = host();
        let result: Result<u8, _> = open(&host, Script::Fail, ()).await;

        assert!(matches!(result, Err(DialogError::Mount { .. })));
        assert_eq!(rec.created.lock().unwrap().len(), 1);
        assert_eq!(rec.destroyed().len(), 1);
    }

    #[tokio::test]
    async fn container_failure_rejects() {
        let rec = Arc::new(RecordingHost {
            refuse: true,
            ..RecordingHost::default()
        });
        let host: Arc<dyn DialogHost> = rec.clone();
        let result: Result<u8, _> = open(&host, Script::Resolve(1), ()).await;

        assert_eq!(
            result,
            Err(DialogError::Mount {
                message: "no display".into()
            })
        );
    }

    #[tokio::test]
    async fn dropping_handle_closes_dialog() {
        let (rec, host) = host();
        let slot = Arc::new(Mutex::new(None));
        let handle: DialogHandle<u8> = open(&host, Script::Park(Arc::clone(&slot)), ());
        drop(handle);
        assert_eq!(rec.destroyed().len(), 1);

        // A late answer neither panics nor tears down again.
        slot.lock().unwrap().take().unwrap().resolve(3);
        assert_eq!(rec.destroyed().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_dialogs_own_their_containers() {
        let (rec, host) = host();
        let first_slot = Arc::new(Mutex::new(None));
        let second_slot = Arc::new(Mutex::new(None));
        let first: DialogHandle<&str> = open(&host, Script::Park(Arc::clone(&first_slot)), ());
        let second: DialogHandle<&str> = open(&host, Script::Park(Arc::clone(&second_slot)), ());
        assert_ne!(first.container_id(), second.container_id());
        assert!(first.container_id().starts_with("global-dialog-"));

        second_slot.lock().unwrap().take().unwrap().resolve("b");
        first_slot.lock().unwrap().take().unwrap().resolve("a");
        assert_eq!(second.await, Ok("b"));
        assert_eq!(first.await, Ok("a"));
        assert_eq!(rec.destroyed().len(), 2);
    }

    // ── Date range ──────────────────────────────────────────────────

    struct Picker(Option<DateRange>);

    impl DialogComponent<Option<DateRange>> for Picker {
        type Props = DateRangeProps;

        fn mount(
            self,
            _container: &str,
            _props: DateRangeProps,
            responder: Responder<Option<DateRange>>,
        ) -> Result<(), String> {
            responder.resolve(self.0);
            Ok(())
        }
    }

    fn range(days: i64) -> DateRange {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let start = offset.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        DateRange {
            start,
            end: start + chrono::Duration::days(days),
        }
    }

    #[tokio::test]
    async fn date_range_within_limit_is_returned() {
        let (_, host) = host();
        let picked = select_date_range(&host, Picker(Some(range(30))), DateRangeProps::default()).await;
        assert_eq!(picked, Some(range(30)));
    }

    #[tokio::test]
    async fn date_range_over_limit_is_rejected() {
        let (_, host) = host();
        let picked = select_date_range(&host, Picker(Some(range(61))), DateRangeProps::default()).await;
        assert_eq!(picked, None);
    }

    #[tokio::test]
    async fn date_range_utc_conversion() {
        let (_, host) = host();
        let props = DateRangeProps {
            use_utc: true,
            ..DateRangeProps::default()
        };
        let picked = select_date_range(&host, Picker(Some(range(1))), props)
            .await
            .unwrap();
        assert_eq!(picked.start.offset().local_minus_utc(), 0);
        assert_eq!(picked.start.to_rfc3339(), "2024-04-30T16:00:00+00:00");
    }

    struct ParkedPicker(Arc<Mutex<Option<Responder<Option<DateRange>>>>>);

    impl DialogComponent<Option<DateRange>> for ParkedPicker {
        type Props = DateRangeProps;

        fn mount(
            self,
            _container: &str,
            _props: DateRangeProps,
            responder: Responder<Option<DateRange>>,
        ) -> Result<(), String> {
            *self.0.lock().unwrap() = Some(responder);
            Ok(())
        }
    }

    #[tokio::test]
    async fn selector_ignores_reentry_while_open() {
        let (_, host) = host();
        let selector = DateRangeSelector::new(host, DateRangeProps::default());
        let slot = Arc::new(Mutex::new(None));

        let first = selector.select(ParkedPicker(Arc::clone(&slot)));
        let second = async {
            tokio::task::yield_now().await;
            assert!(selector.is_selecting());
            let again = selector.select(Picker(Some(range(1)))).await;
            slot.lock().unwrap().take().unwrap().resolve(Some(range(2)));
            again
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, Some(range(2)));
        assert_eq!(second, None);
        assert!(!selector.is_selecting());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_selection_clears_selecting() {
        let (rec, host) = host();
        let selector = DateRangeSelector::new(host, DateRangeProps::default());
        let slot = Arc::new(Mutex::new(None));

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            selector.select(ParkedPicker(Arc::clone(&slot))),
        )
        .await;

        assert!(outcome.is_err());
        assert!(!selector.is_selecting());
        assert_eq!(rec.destroyed().len(), 1);
        assert_eq!(
            selector.select(Picker(Some(range(1)))).await,
            Some(range(1))
        );
    }

    #[tokio::test]
    async fn cancelled_picker_yields_none() {
        let (_, host) = host();
        let picked = select_date_range(&host, Picker(None), DateRangeProps::default()).await;
        assert_eq!(picked, None);
    }
}
