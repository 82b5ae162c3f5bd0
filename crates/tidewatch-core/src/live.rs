// ── Live device data ──
//
// Subscription to one device model's push stream on the data center event
// hub. The hub transport handles reconnecting; this layer re-joins the
// model's group after every reconnect and folds the connection lifecycle
// into two flags a renderer can show. `follow_pager` merges one device's
// pushes into the first page of an anchor pager.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Value, json};
use tidewatch_api::{HubConnection, HubLifecycle};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::pagination::{AnchorPager, DeviceTarget, Feed};

/// Server-to-client push carrying `(device_id, payload)`.
pub const DEVICE_DATA_RECEIVED: &str = "DeviceDataReceived";
pub const SUBSCRIBE_MODEL: &str = "SubscribeModel";
pub const UNSUBSCRIBE_MODEL: &str = "UnsubscribeModel";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub is_reconnecting: bool,
    pub is_disconnected: bool,
}

impl LinkStatus {
    const CONNECTED: Self = Self {
        is_reconnecting: false,
        is_disconnected: false,
    };
    const RECONNECTING: Self = Self {
        is_reconnecting: true,
        is_disconnected: false,
    };
    const DISCONNECTED: Self = Self {
        is_reconnecting: false,
        is_disconnected: true,
    };
}

/// A live subscription to one device model.
///
/// Dropping it without [`close`](Self::close) still tears down the hub
/// connection, but skips the `UnsubscribeModel` call.
pub struct LiveSubscription {
    model_id: String,
    hub: Arc<HubConnection>,
    status: Arc<watch::Sender<LinkStatus>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for LiveSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSubscription")
            .field("model_id", &self.model_id)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl LiveSubscription {
    /// Connect `hub`, route `DeviceDataReceived` into `on_data`, and
    /// subscribe to `model_id`.
    ///
    /// Never fails: if the first connection or the subscribe call fails,
    /// the subscription comes back with `is_disconnected` set and is not
    /// retried.
    pub async fn open<F>(hub: HubConnection, model_id: impl Into<String>, on_data: F) -> Self
    where
        F: Fn(&str, Value) + Send + Sync + 'static,
    {
        let model_id = model_id.into();
        let hub = Arc::new(hub);
        let (status, _) = watch::channel(LinkStatus::default());
        let status = Arc::new(status);

        hub.on(DEVICE_DATA_RECEIVED, move |args| {
            let Some(device_id) = args.first().and_then(Value::as_str) else {
                warn!(?args, "device data push without a device id");
                return;
            };
            let payload = args.get(1).cloned().unwrap_or(Value::Null);
            on_data(device_id, payload);
        });
        let lifecycle = hub.lifecycle();

        let subscription = Self {
            model_id,
            hub,
            status,
            monitor: Mutex::new(None),
        };

        info!(model_id = %subscription.model_id, "opening live subscription");
        if let Err(e) = subscription.hub.start().await {
            warn!(error = %e, "device event hub connection failed");
            subscription.status.send_replace(LinkStatus::DISCONNECTED);
            return subscription;
        }

        let handle = tokio::spawn(monitor(
            Arc::clone(&subscription.hub),
            subscription.model_id.clone(),
            lifecycle,
            Arc::clone(&subscription.status),
        ));
        *subscription
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);

        match subscribe(&subscription.hub, &subscription.model_id).await {
            Ok(()) => {
                subscription.status.send_replace(LinkStatus::CONNECTED);
            }
            Err(e) => {
                warn!(error = %e, "subscribing to device model failed");
                subscription.status.send_replace(LinkStatus::DISCONNECTED);
            }
        }
        subscription
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn status(&self) -> LinkStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<LinkStatus> {
        self.status.subscribe()
    }

    /// Status changes as a `Stream`, starting with the current value.
    pub fn status_stream(&self) -> WatchStream<LinkStatus> {
        WatchStream::new(self.status.subscribe())
    }

    /// Unsubscribe, detach every handler, then close the connection.
    pub async fn close(self) {
        info!(model_id = %self.model_id, "closing live subscription");
        if let Err(e) = self
            .hub
            .invoke(UNSUBSCRIBE_MODEL, vec![json!(self.model_id)])
            .await
        {
            debug!(error = %e, "unsubscribe failed, closing anyway");
        }
        self.hub.off_all();
        self.abort_monitor();
        self.hub.stop().await;
        self.status.send_replace(LinkStatus::DISCONNECTED);
    }

    fn abort_monitor(&self) {
        let handle = self
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        // The monitor holds a hub reference; release it so the hub drops.
        self.abort_monitor();
    }
}

/// Subscribe to `target`'s model and merge pushes from `device_id` into
/// the first page of `pager`.
///
/// Pushes from other devices of the model are dropped, as are pushes from
/// another upload channel when `target` is filtered by one.
pub async fn follow_pager<F>(
    hub: HubConnection,
    target: &DeviceTarget,
    device_id: impl Into<String>,
    pager: Arc<AnchorPager<F>>,
) -> LiveSubscription
where
    F: Feed<Item = Value> + 'static,
{
    let device_id = device_id.into();
    let channel = target.upload_channel.clone();
    LiveSubscription::open(hub, target.device_model_id.clone(), move |from, record| {
        if from != device_id || !on_channel(channel.as_deref(), &record) {
            return;
        }
        if !pager.merge_live(record) {
            debug!(device_id = %from, "push not merged, view is past the first page");
        }
    })
    .await
}

/// Whether a pushed record belongs to `channel`. Records that do not say
/// which channel they came in on are kept.
fn on_channel(channel: Option<&str>, record: &Value) -> bool {
    let Some(channel) = channel else {
        return true;
    };
    match record.get("uploadChannel") {
        Some(Value::Number(n)) => n.to_string() == channel,
        Some(Value::String(s)) => s == channel,
        _ => true,
    }
}

async fn subscribe(hub: &HubConnection, model_id: &str) -> Result<(), tidewatch_api::Error> {
    hub.invoke(SUBSCRIBE_MODEL, vec![json!(model_id)]).await?;
    debug!(model_id, "subscribed to device model");
    Ok(())
}

/// Follow hub lifecycle events, re-subscribing after each reconnect.
async fn monitor(
    hub: Arc<HubConnection>,
    model_id: String,
    mut lifecycle: broadcast::Receiver<HubLifecycle>,
    status: Arc<watch::Sender<LinkStatus>>,
) {
    loop {
        match lifecycle.recv().await {
            Ok(HubLifecycle::Reconnecting) => {
                warn!(model_id, "device event hub lost, reconnecting");
                status.send_replace(LinkStatus::RECONNECTING);
            }
            Ok(HubLifecycle::Reconnected) => {
                info!(model_id, "device event hub reconnected");
                status.send_replace(LinkStatus::CONNECTED);
                if let Err(e) = subscribe(&hub, &model_id).await {
                    warn!(error = %e, "re-subscribing after reconnect failed");
                }
            }
            Ok(HubLifecycle::Closed) => {
                warn!(model_id, "device event hub closed");
                status.send_replace(LinkStatus::DISCONNECTED);
                break;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "lifecycle events lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
