use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tidewatch_api::Error;
use tidewatch_api::data_center::models::{Anchor, BeidouRecord, IridiumRecord};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{Notice, Notifier};

/// A record carrying the timestamp the cursor advances by.
pub trait Timestamped {
    fn time(&self) -> Option<&str>;
}

impl Timestamped for Value {
    fn time(&self) -> Option<&str> {
        self.get("time").and_then(Value::as_str)
    }
}

impl Timestamped for BeidouRecord {
    fn time(&self) -> Option<&str> {
        Some(&self.time)
    }
}

impl Timestamped for IridiumRecord {
    fn time(&self) -> Option<&str> {
        Some(&self.time)
    }
}

/// One anchor-paged endpoint.
pub trait Feed: Send + Sync {
    /// What is being queried (device, card, IMEI).
    type Selector: Clone + fmt::Debug + Send + Sync;
    type Item: Timestamped + Clone + Send + Sync;

    fn fetch(
        &self,
        selector: &Self::Selector,
        anchor: Anchor,
    ) -> impl Future<Output = Result<Vec<Self::Item>, Error>> + Send;
}

/// Observable pager state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorState<T> {
    pub items: Vec<T>,
    /// Exclusive boundary of the current page; `None` means newest.
    pub anchor: Option<String>,
    /// 1-based.
    pub page_index: u32,
    pub is_last_page: bool,
    pub loading: bool,
}

impl<T> Default for AnchorState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            anchor: None,
            page_index: 1,
            is_last_page: false,
            loading: false,
        }
    }
}

/// Cursor pagination over a reverse-chronological feed.
///
/// Only moves forward (older): [`go_next_page`](Self::go_next_page) sets
/// the anchor to the oldest visible record, and
/// [`reset_to_first_page`](Self::reset_to_first_page) starts over from
/// the newest. Every fetch takes a generation number, and a response that
/// arrives after a newer fetch started is dropped.
///
/// Records sharing the boundary timestamp are not disambiguated: the
/// anchor is exclusive, so rows with the exact same `time` as the last
/// visible record can be skipped.
pub struct AnchorPager<F: Feed> {
    feed: F,
    limit: u32,
    notifier: Arc<dyn Notifier>,
    selector: Mutex<Option<F::Selector>>,
    state: watch::Sender<AnchorState<F::Item>>,
    generation: AtomicU64,
}

impl<F: Feed> fmt::Debug for AnchorPager<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("AnchorPager")
            .field("limit", &self.limit)
            .field("items", &state.items.len())
            .field("page_index", &state.page_index)
            .field("is_last_page", &state.is_last_page)
            .finish_non_exhaustive()
    }
}

impl<F: Feed> AnchorPager<F> {
    pub fn new(feed: F, limit: u32, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(AnchorState::default());
        Self {
            feed,
            limit,
            notifier,
            selector: Mutex::new(None),
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn limit_len(&self) -> usize {
        usize::try_from(self.limit).unwrap_or(usize::MAX)
    }

    pub fn selector(&self) -> Option<F::Selector> {
        self.selector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current state (cloned).
    pub fn snapshot(&self) -> AnchorState<F::Item> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnchorState<F::Item>> {
        self.state.subscribe()
    }

    pub fn items(&self) -> Vec<F::Item> {
        self.state.borrow().items.clone()
    }

    pub fn page_index(&self) -> u32 {
        self.state.borrow().page_index
    }

    pub fn is_last_page(&self) -> bool {
        self.state.borrow().is_last_page
    }

    pub fn anchor(&self) -> Option<String> {
        self.state.borrow().anchor.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Change the target. A resolved selector restarts from the newest
    /// page; `None` just clears the target.
    pub async fn set_selector(&self, selector: Option<F::Selector>) {
        let resolved = selector.is_some();
        *self.selector.lock().unwrap_or_else(PoisonError::into_inner) = selector;
        if resolved {
            self.reset_to_first_page().await;
        }
    }

    /// Query the page at the current anchor.
    ///
    /// Never fails: errors clear the list, mark the last page, and are
    /// reported through the notifier.
    pub async fn fetch_data(&self) {
        let (anchor_time, page_index) = {
            let state = self.state.borrow();
            (state.anchor.clone(), state.page_index)
        };
        self.load(anchor_time, page_index).await;
    }

    /// Fetch the page below `anchor_time` and, unless a newer fetch has
    /// started meanwhile, install it as page `page_index`. The anchor,
    /// page index and items are written together. Returns whether the
    /// result was applied.
    async fn load(&self, anchor_time: Option<String>, page_index: u32) -> bool {
        let Some(selector) = self.selector() else {
            warn!("no target selected, skipping fetch");
            self.notifier
                .notify(Notice::Warning("Select a device to query".into()));
            return false;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| s.loading = true);
        debug!(
            ?selector,
            anchor = ?anchor_time,
            page_index,
            limit = self.limit,
            generation,
            "fetching page"
        );

        let result = self
            .feed
            .fetch(
                &selector,
                Anchor {
                    anchor_time: anchor_time.clone(),
                    reverse: true,
                    limit: self.limit,
                },
            )
            .await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "discarding stale page");
            return false;
        }

        match result {
            Ok(items) => {
                let is_last_page = items.len() < self.limit_len();
                debug!(count = items.len(), is_last_page, "page loaded");
                self.state.send_modify(|s| {
                    s.items = items;
                    s.anchor = anchor_time;
                    s.page_index = page_index;
                    s.is_last_page = is_last_page;
                    s.loading = false;
                });
                self.notifier.notify(Notice::Success("Query complete".into()));
            }
            Err(e) => {
                warn!(error = %e, "page fetch failed");
                self.state.send_modify(|s| {
                    s.items.clear();
                    s.anchor = anchor_time;
                    s.page_index = page_index;
                    s.is_last_page = true;
                    s.loading = false;
                });
                self.notifier
                    .notify(Notice::Error(format!("Query failed: {e}")));
            }
        }
        true
    }

    /// Advance to the next older page. No-op when nothing is shown.
    pub async fn go_next_page(&self) {
        let (next_anchor, page_index) = {
            let state = self.state.borrow();
            let Some(last) = state.items.last() else {
                return;
            };
            (last.time().map(str::to_owned), state.page_index)
        };
        let Some(anchor) = next_anchor else {
            warn!("last record has no time field, cannot advance");
            return;
        };

        self.load(Some(anchor), page_index + 1).await;
    }

    /// Clear the anchor and fetch the newest page.
    pub async fn reset_to_first_page(&self) {
        debug!("resetting to first page");
        self.state.send_modify(|s| {
            s.anchor = None;
            s.page_index = 1;
        });
        self.load(None, 1).await;
    }

    /// Select a target and fetch the page just older than `anchor_time`
    /// (newest when `None`) in one request.
    pub async fn seek(&self, selector: F::Selector, anchor_time: Option<String>) {
        *self.selector.lock().unwrap_or_else(PoisonError::into_inner) = Some(selector);
        self.state.send_modify(|s| {
            s.anchor.clone_from(&anchor_time);
            s.page_index = 1;
        });
        self.load(anchor_time, 1).await;
    }

    /// Merge a pushed record into the view.
    ///
    /// Only the first page follows live data: the record is prepended and
    /// the page trimmed back to `limit`. Returns whether it was merged.
    pub fn merge_live(&self, record: F::Item) -> bool {
        let limit = self.limit_len();
        self.state.send_if_modified(|s| {
            if s.page_index != 1 {
                return false;
            }
            s.items.insert(0, record);
            s.items.truncate(limit);
            true
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    // ── Test doubles ────────────────────────────────────────────────

    /// Serves a fixed reverse-chronological series of `total` rows, with
    /// optional per-selector latency and a failure switch.
    struct SeriesFeed {
        total: usize,
        calls: AtomicUsize,
        fail: bool,
        /// Delay every page after the newest one.
        slow_older: bool,
    }

    impl SeriesFeed {
        fn new(total: usize) -> Self {
            Self {
                total,
                calls: AtomicUsize::new(0),
                fail: false,
                slow_older: false,
            }
        }
    }

    fn ts(i: usize) -> String {
        format!("2024-05-01T00:{:02}:{:02}Z", (10_000 - i) / 60 % 60, (10_000 - i) % 60)
    }

    impl Feed for SeriesFeed {
        type Selector = String;
        type Item = Value;

        async fn fetch(&self, selector: &String, anchor: Anchor) -> Result<Vec<Value>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Api {
                    code: 1,
                    message: "bucket offline".into(),
                    status: 200,
                });
            }
            if selector == "slow" || (self.slow_older && anchor.anchor_time.is_some()) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            let start = match &anchor.anchor_time {
                None => 0,
                Some(t) => (0..self.total).find(|&i| ts(i) == *t).map_or(self.total, |i| i + 1),
            };
            Ok((start..self.total)
                .take(anchor.limit as usize)
                .map(|i| json!({ "time": ts(i), "seq": i, "src": selector }))
                .collect())
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notice>>);

    impl Notifier for Recorder {
        fn notify(&self, notice: Notice) {
            self.0.lock().unwrap().push(notice);
        }
    }

    fn pager(feed: SeriesFeed, limit: u32) -> (AnchorPager<SeriesFeed>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();
        (AnchorPager::new(feed, limit, notifier), recorder)
    }

    // ── Paging ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn full_page_is_not_last() {
        let (pager, _) = pager(SeriesFeed::new(120), 50);
        pager.set_selector(Some("SN-1".into())).await;

        assert_eq!(pager.items().len(), 50);
        assert!(!pager.is_last_page());
        assert_eq!(pager.page_index(), 1);
    }

    #[tokio::test]
    async fn short_page_is_last() {
        let (pager, _) = pager(SeriesFeed::new(10), 50);
        pager.set_selector(Some("SN-1".into())).await;

        assert_eq!(pager.items().len(), 10);
        assert!(pager.is_last_page());
    }

    #[tokio::test]
    async fn next_page_anchors_on_last_time() {
        let (pager, _) = pager(SeriesFeed::new(120), 50);
        pager.set_selector(Some("SN-1".into())).await;
        let boundary = pager.items()[49]["time"].as_str().unwrap().to_owned();

        pager.go_next_page().await;
        assert_eq!(pager.anchor(), Some(boundary));
        assert_eq!(pager.page_index(), 2);
        assert_eq!(pager.items()[0]["seq"], 50);

        pager.go_next_page().await;
        assert_eq!(pager.page_index(), 3);
        assert_eq!(pager.items().len(), 20);
        assert!(pager.is_last_page());
    }

    #[tokio::test]
    async fn next_page_on_empty_is_noop() {
        let feed = SeriesFeed::new(0);
        let (pager, _) = pager(feed, 50);
        pager.set_selector(Some("SN-1".into())).await;
        let calls_before = pager.feed.calls.load(Ordering::SeqCst);

        pager.go_next_page().await;
        assert_eq!(pager.page_index(), 1);
        assert_eq!(pager.feed.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test]
    async fn reset_clears_anchor_and_page_index() {
        let (pager, _) = pager(SeriesFeed::new(120), 50);
        pager.set_selector(Some("SN-1".into())).await;
        pager.go_next_page().await;

        pager.reset_to_first_page().await;
        assert_eq!(pager.anchor(), None);
        assert_eq!(pager.page_index(), 1);
        assert_eq!(pager.items()[0]["seq"], 0);
    }

    #[tokio::test]
    async fn seek_starts_below_boundary() {
        let (pager, _) = pager(SeriesFeed::new(120), 50);
        pager.seek("SN-1".into(), Some(ts(9))).await;

        assert_eq!(pager.items()[0]["seq"], 10);
        assert_eq!(pager.page_index(), 1);
        assert_eq!(pager.feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_selector_is_noop_with_warning() {
        let (pager, recorder) = pager(SeriesFeed::new(10), 50);
        pager.fetch_data().await;

        assert!(pager.items().is_empty());
        assert_eq!(pager.feed.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(recorder.0.lock().unwrap()[0], Notice::Warning(_)));
    }

    #[tokio::test]
    async fn clearing_selector_does_not_fetch() {
        let (pager, _) = pager(SeriesFeed::new(10), 50);
        pager.set_selector(None).await;
        assert_eq!(pager.feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_clears_items_and_marks_last_page() {
        let mut feed = SeriesFeed::new(120);
        feed.fail = true;
        let (pager, recorder) = pager(feed, 50);
        pager.state.send_modify(|s| s.items = vec![json!({ "time": "x" })]);

        pager.set_selector(Some("SN-1".into())).await;
        assert!(pager.items().is_empty());
        assert!(pager.is_last_page());
        assert!(!pager.is_loading());
        assert!(matches!(recorder.0.lock().unwrap().last(), Some(Notice::Error(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_never_overwrites_newer() {
        let (pager, _) = pager(SeriesFeed::new(120), 50);

        tokio::join!(pager.set_selector(Some("slow".into())), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            pager.set_selector(Some("fast".into())).await;
        });

        let items = pager.items();
        assert_eq!(items.len(), 50);
        assert!(items.iter().all(|r| r["src"] == "fast"));
        assert!(!pager.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_next_page_lands_on_first_page() {
        let mut feed = SeriesFeed::new(120);
        feed.slow_older = true;
        let (pager, _) = pager(feed, 50);
        pager.set_selector(Some("SN-1".into())).await;

        tokio::join!(pager.go_next_page(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            pager.reset_to_first_page().await;
        });

        let state = pager.snapshot();
        assert_eq!(state.page_index, 1);
        assert_eq!(state.anchor, None);
        assert_eq!(state.items[0]["seq"], 0);
        assert!(!state.loading);
        assert!(pager.merge_live(json!({ "time": "2024-05-02T00:00:00Z", "seq": -1 })));
    }

    #[tokio::test]
    async fn failed_next_page_still_advances_index() {
        let (pager, recorder) = pager(SeriesFeed::new(120), 50);
        pager.set_selector(Some("SN-1".into())).await;
        let boundary = pager.items()[49]["time"].as_str().unwrap().to_owned();

        let failing = AnchorPager::new(
            SeriesFeed {
                fail: true,
                ..SeriesFeed::new(120)
            },
            50,
            recorder.clone(),
        );
        failing.state.send_replace(pager.snapshot());
        *failing.selector.lock().unwrap() = Some("SN-1".into());

        failing.go_next_page().await;
        let state = failing.snapshot();
        assert_eq!(state.page_index, 2);
        assert_eq!(state.anchor, Some(boundary));
        assert!(state.items.is_empty());
        assert!(state.is_last_page);
    }

    #[tokio::test]
    async fn is_last_page_tracks_item_count() {
        for total in [0, 1, 49, 50, 51, 100] {
            let (pager, _) = pager(SeriesFeed::new(total), 50);
            pager.set_selector(Some("SN-1".into())).await;
            let state = pager.snapshot();
            assert_eq!(state.is_last_page, state.items.len() < 50, "total {total}");
        }
    }

    // ── Live merge ──────────────────────────────────────────────────

    #[tokio::test]
    async fn live_records_merge_only_on_first_page() {
        let (pager, _) = pager(SeriesFeed::new(120), 50);
        pager.set_selector(Some("SN-1".into())).await;

        assert!(pager.merge_live(json!({ "time": "2024-05-02T00:00:00Z", "seq": -1 })));
        let items = pager.items();
        assert_eq!(items.len(), 50);
        assert_eq!(items[0]["seq"], -1);

        pager.go_next_page().await;
        assert!(!pager.merge_live(json!({ "time": "2024-05-02T00:00:01Z" })));
    }
}
