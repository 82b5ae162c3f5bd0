use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tidewatch_api::{Error, QueryResult};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{Notice, Notifier};

/// One page/size/total paged endpoint.
pub trait PageSource: Send + Sync {
    type Selector: Clone + fmt::Debug + Send + Sync;
    type Item: Clone + Send + Sync;

    /// Fetch the 1-based `page` of `size` rows on `channel`.
    fn fetch_page(
        &self,
        selector: &Self::Selector,
        channel: u8,
        page: u32,
        size: u32,
    ) -> impl Future<Output = Result<QueryResult<Self::Item>, Error>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetState<T> {
    pub items: Vec<T>,
    pub total: u64,
    /// 1-based.
    pub page_index: u32,
    pub page_size: u32,
    /// `0` means every channel.
    pub upload_channel: u8,
    pub loading: bool,
}

/// Offset pagination: jump to any page, total known up front.
///
/// A failed fetch keeps whatever was shown before.
pub struct OffsetPager<S: PageSource> {
    source: S,
    notifier: Arc<dyn Notifier>,
    selector: Mutex<Option<S::Selector>>,
    state: watch::Sender<OffsetState<S::Item>>,
    generation: AtomicU64,
}

impl<S: PageSource> fmt::Debug for OffsetPager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("OffsetPager")
            .field("page_index", &state.page_index)
            .field("page_size", &state.page_size)
            .field("total", &state.total)
            .finish_non_exhaustive()
    }
}

impl<S: PageSource> OffsetPager<S> {
    pub fn new(source: S, page_size: u32, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(OffsetState {
            items: Vec::new(),
            total: 0,
            page_index: 1,
            page_size,
            upload_channel: 0,
            loading: false,
        });
        Self {
            source,
            notifier,
            selector: Mutex::new(None),
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> OffsetState<S::Item> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OffsetState<S::Item>> {
        self.state.subscribe()
    }

    pub fn page_count(&self) -> u64 {
        let state = self.state.borrow();
        state.total.div_ceil(u64::from(state.page_size.max(1)))
    }

    pub async fn set_selector(&self, selector: Option<S::Selector>) {
        let resolved = selector.is_some();
        *self.selector.lock().unwrap_or_else(PoisonError::into_inner) = selector;
        if resolved {
            self.fetch_first_page().await;
        }
    }

    pub async fn fetch_page(&self) {
        let selector = self
            .selector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(selector) = selector else {
            warn!("no device selected, skipping page fetch");
            self.notifier
                .notify(Notice::Warning("Select a device to query".into()));
            return;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (channel, page, size) = {
            let s = self.state.borrow();
            (s.upload_channel, s.page_index, s.page_size)
        };
        self.state.send_modify(|s| s.loading = true);
        debug!(?selector, channel, page, size, "fetching offset page");

        let result = self.source.fetch_page(&selector, channel, page, size).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "discarding stale page");
            return;
        }

        match result {
            Ok(QueryResult { items, total }) => {
                self.state.send_modify(|s| {
                    s.items = items;
                    s.total = total;
                    s.loading = false;
                });
            }
            Err(e) => {
                warn!(error = %e, page, "offset page fetch failed");
                self.state.send_modify(|s| s.loading = false);
                self.notifier
                    .notify(Notice::Error(format!("Failed to load device data: {e}")));
            }
        }
    }

    pub async fn fetch_first_page(&self) {
        self.state.send_modify(|s| s.page_index = 1);
        self.fetch_page().await;
    }

    /// Jump to `page`; only fetches when the index actually changes.
    pub async fn set_page(&self, page: u32) {
        let page = page.max(1);
        let changed = self.state.send_if_modified(|s| {
            if s.page_index == page {
                return false;
            }
            s.page_index = page;
            true
        });
        if changed {
            self.fetch_page().await;
        }
    }

    /// Select a target and load one page of one channel in one request.
    pub async fn load(&self, selector: S::Selector, channel: u8, page: u32) {
        *self.selector.lock().unwrap_or_else(PoisonError::into_inner) = Some(selector);
        self.state.send_modify(|s| {
            s.upload_channel = channel;
            s.page_index = page.max(1);
        });
        self.fetch_page().await;
    }

    pub async fn set_upload_channel(&self, channel: u8) {
        self.state.send_modify(|s| s.upload_channel = channel);
        self.fetch_first_page().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    use super::*;

    struct Rows {
        total: u64,
        calls: AtomicUsize,
        fail: AtomicBool,
        last: Mutex<Option<(u8, u32, u32)>>,
    }

    impl Rows {
        fn new(total: u64) -> Self {
            Self {
                total,
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                last: Mutex::new(None),
            }
        }
    }

    impl PageSource for Rows {
        type Selector = &'static str;
        type Item = u64;

        async fn fetch_page(
            &self,
            _selector: &&'static str,
            channel: u8,
            page: u32,
            size: u32,
        ) -> Result<QueryResult<u64>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((channel, page, size));
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::HubNotConnected);
            }
            let start = u64::from((page - 1) * size);
            let items = (start..self.total).take(size as usize).collect();
            Ok(QueryResult {
                items,
                total: self.total,
            })
        }
    }

    fn pager(total: u64) -> OffsetPager<Rows> {
        OffsetPager::new(Rows::new(total), 20, Arc::new(super::super::LogNotifier))
    }

    #[tokio::test]
    async fn selecting_device_loads_first_page() {
        let pager = pager(45);
        pager.set_selector(Some("SN-1")).await;

        let state = pager.snapshot();
        assert_eq!(state.items.len(), 20);
        assert_eq!(state.total, 45);
        assert_eq!(pager.page_count(), 3);
    }

    #[tokio::test]
    async fn set_page_fetches_only_on_change() {
        let pager = pager(45);
        pager.set_selector(Some("SN-1")).await;

        pager.set_page(3).await;
        assert_eq!(pager.snapshot().items, vec![40, 41, 42, 43, 44]);
        let calls = pager.source.calls.load(Ordering::SeqCst);

        pager.set_page(3).await;
        assert_eq!(pager.source.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn channel_change_returns_to_first_page() {
        let pager = pager(45);
        pager.set_selector(Some("SN-1")).await;
        pager.set_page(2).await;

        pager.set_upload_channel(2).await;
        assert_eq!(pager.snapshot().page_index, 1);
        assert_eq!(*pager.source.last.lock().unwrap(), Some((2, 1, 20)));
    }

    #[tokio::test]
    async fn load_fetches_requested_page_once() {
        let pager = pager(45);
        pager.load("SN-1", 3, 2).await;

        assert_eq!(pager.source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*pager.source.last.lock().unwrap(), Some((3, 2, 20)));
        assert_eq!(pager.snapshot().items[0], 20);
    }

    #[tokio::test]
    async fn failure_keeps_previous_items() {
        let pager = pager(45);
        pager.set_selector(Some("SN-1")).await;
        pager.source.fail.store(true, Ordering::SeqCst);

        pager.set_page(2).await;
        let state = pager.snapshot();
        assert_eq!(state.items.len(), 20);
        assert_eq!(state.items[0], 0);
        assert!(!state.loading);
    }
}
