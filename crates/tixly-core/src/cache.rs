// ── Entity cache controller ──
//
// Owns, per open handle, the authoritative in-memory page of one
// collection. Three triggers funnel into one sequence-guarded fetch
// path: opening the handle, replacing the query parameters with a
// value-different set, and any change notification on the collection's
// topic. Results are applied in issue order -- a slow stale response
// never overwrites a fresher one.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::entity::EntityType;
use crate::error::{ApiError, FALLBACK_MESSAGE, user_message};
use crate::gateway::{CollectionGateway, RawPage, resolve_fetch};
use crate::notify::ChangeNotification;
use crate::page::CachedPage;
use crate::query::QueryParameters;
use crate::registry::{SubscriptionHandle, SubscriptionRegistry};

// ── EntityCache ──────────────────────────────────────────────────────

/// Factory for cache handles, sharing one gateway and one subscription
/// registry across every open handle.
pub struct EntityCache<G> {
    gateway: Arc<G>,
    registry: SubscriptionRegistry,
}

impl<G: CollectionGateway> EntityCache<G> {
    pub fn new(gateway: Arc<G>, registry: SubscriptionRegistry) -> Self {
        Self { gateway, registry }
    }

    /// Begin managing a collection page for one consumer.
    ///
    /// Subscribes to the entity type's topic, spawns the driver task,
    /// and issues the initial fetch. The returned handle is the only
    /// way to observe or steer the page; dropping it (or calling
    /// [`close`](CacheHandle::close)) releases the subscription and
    /// makes any in-flight fetch a no-op.
    pub fn open<T>(&self, params: QueryParameters) -> CacheHandle<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let entity_type = params.entity_type;
        let (page_tx, page_rx) = watch::channel(CachedPage::default());
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (refetch_tx, refetch_rx) = mpsc::unbounded_channel();

        let subscription = self.registry.subscribe(entity_type.topic(), move |body| {
            log_notification(entity_type, body);
            let _ = refetch_tx.send(());
        });

        let cancel = CancellationToken::new();
        tokio::spawn(drive(
            Arc::clone(&self.gateway),
            params,
            page_tx,
            control_rx,
            refetch_rx,
            cancel.clone(),
        ));

        debug!(%entity_type, "cache handle opened");
        CacheHandle {
            page: page_rx,
            control: control_tx,
            cancel,
            _subscription: subscription,
        }
    }
}

/// Notifications are opaque beyond tracing: even an unparseable body
/// triggers the defensive refetch.
fn log_notification(entity_type: EntityType, body: &str) {
    match ChangeNotification::parse(body) {
        Ok(notification) => debug!(
            %entity_type,
            event = ?notification.event_type,
            entity_id = notification.entity_id,
            "change notification"
        ),
        Err(e) => warn!(%entity_type, error = %e, "unparseable change notification, refetching anyway"),
    }
}

// ── CacheHandle ──────────────────────────────────────────────────────

enum Control {
    SetParameters(QueryParameters),
    ClearError,
}

/// One consumer's live view of a cached collection page.
pub struct CacheHandle<T> {
    page: watch::Receiver<CachedPage<T>>,
    control: mpsc::UnboundedSender<Control>,
    cancel: CancellationToken,
    _subscription: SubscriptionHandle,
}

impl<T> CacheHandle<T> {
    /// Snapshot of the current page state.
    pub fn page(&self) -> CachedPage<T> {
        self.page.borrow().clone()
    }

    /// Wait for the next page revision. Returns `None` once the handle
    /// is closed.
    pub async fn changed(&mut self) -> Option<CachedPage<T>> {
        self.page.changed().await.ok()?;
        Some(self.page.borrow_and_update().clone())
    }

    /// A second receiver on the page state, e.g. for a render loop that
    /// outlives borrow scopes. Stops updating once the handle closes.
    pub fn watch(&self) -> watch::Receiver<CachedPage<T>> {
        self.page.clone()
    }

    /// Page revisions as a `Stream`, starting with the current page.
    pub fn stream(&self) -> crate::stream::PageStream<T>
    where
        T: Send + Sync + 'static,
    {
        crate::stream::PageStream::new(self.page.clone())
    }

    /// Replace the query parameters.
    ///
    /// A value-equal replacement is a no-op -- no network call. A
    /// different value triggers exactly one fetch which supersedes any
    /// in-flight fetch's result application.
    pub fn set_parameters(&self, params: QueryParameters) {
        let _ = self.control.send(Control::SetParameters(params));
    }

    /// Dismiss the current error without refetching.
    pub fn clear_error(&self) {
        let _ = self.control.send(Control::ClearError);
    }

    /// Release the subscription and stop all pending work. Equivalent
    /// to dropping the handle.
    pub fn close(self) {
        drop(self);
    }
}

impl<T> Drop for CacheHandle<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Driver task ──────────────────────────────────────────────────────

/// Serializes all mutation of one handle's page state. Fetches run
/// concurrently as spawned tasks; their completions funnel back here
/// and are applied only if still the latest issued.
async fn drive<T, G>(
    gateway: Arc<G>,
    mut params: QueryParameters,
    page: watch::Sender<CachedPage<T>>,
    mut control: mpsc::UnboundedReceiver<Control>,
    mut refetch: mpsc::UnboundedReceiver<()>,
    cancel: CancellationToken,
) where
    T: DeserializeOwned + Send + Sync + 'static,
    G: CollectionGateway,
{
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut seq: u64 = 0;

    // Initial fetch.
    issue_fetch(&gateway, &params, &mut seq, &done_tx);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(control_msg) = control.recv() => match control_msg {
                Control::SetParameters(next) => {
                    if next == params {
                        trace!("parameters unchanged, fetch skipped");
                    } else {
                        params = next;
                        issue_fetch(&gateway, &params, &mut seq, &done_tx);
                    }
                }
                Control::ClearError => {
                    page.send_modify(|p| p.error = None);
                }
            },

            Some(()) = refetch.recv() => {
                issue_fetch(&gateway, &params, &mut seq, &done_tx);
            }

            Some((fetch_seq, result)) = done_rx.recv() => {
                if fetch_seq == seq {
                    apply(&page, result);
                } else {
                    trace!(fetch_seq, latest = seq, "stale fetch result discarded");
                }
            }
        }
    }

    debug!("cache driver shut down");
}

/// Issue one fetch with the next sequence number. The request itself is
/// never cancelled; a superseded or closed handle simply discards the
/// completion.
fn issue_fetch<G: CollectionGateway>(
    gateway: &Arc<G>,
    params: &QueryParameters,
    seq: &mut u64,
    done: &mpsc::UnboundedSender<(u64, Result<RawPage, ApiError>)>,
) {
    *seq += 1;
    let fetch_seq = *seq;
    let caps = params.entity_type.capabilities();
    let gateway = Arc::clone(gateway);
    let params = params.clone();
    let done = done.clone();

    tokio::spawn(async move {
        let result = resolve_fetch(gateway.as_ref(), caps, &params).await;
        let _ = done.send((fetch_seq, result));
    });

    trace!(fetch_seq, "fetch issued");
}

/// Apply a fetch completion to the page state.
fn apply<T: DeserializeOwned>(
    page: &watch::Sender<CachedPage<T>>,
    result: Result<RawPage, ApiError>,
) {
    match result {
        Ok(raw) => {
            let total_count = raw.total_count;
            let decoded: Result<Vec<T>, _> = raw
                .items
                .into_iter()
                .map(serde_json::from_value)
                .collect();
            match decoded {
                Ok(items) => {
                    debug!(count = items.len(), total_count, "page applied");
                    page.send_modify(|p| {
                        p.items = Arc::new(items);
                        p.total_count = total_count;
                        p.error = None;
                    });
                }
                Err(e) => {
                    warn!(error = %e, "failed to decode page rows");
                    page.send_modify(|p| {
                        p.items = Arc::new(Vec::new());
                        p.error = Some(FALLBACK_MESSAGE.to_owned());
                    });
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "fetch failed");
            let message = user_message(&e);
            page.send_modify(|p| {
                p.items = Arc::new(Vec::new());
                p.error = Some(message);
            });
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
