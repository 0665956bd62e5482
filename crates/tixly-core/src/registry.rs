// ── Subscription registry ──
//
// Decouples "intent to subscribe" from "channel is actually connected".
// Subscriptions made before the channel connects are buffered and
// replayed FIFO on the connected event; subscriptions that were active
// before an unexpected disconnect are re-registered on reconnect, so a
// channel drop never silently loses a consumer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use tixly_api::ChannelEvent;

/// Handler invoked once per notification received on a topic, with the
/// raw message body.
pub type NotificationCallback = dyn Fn(&str) + Send + Sync;

/// The channel operations the registry consumes.
///
/// Implemented for [`tixly_api::NotificationChannel`]; tests substitute
/// fakes. All methods are synchronous fire-and-forget -- the transport
/// queues frames internally.
pub trait ChannelTransport: Send + Sync {
    /// Start the connection (idempotent) and return an event receiver.
    fn connect(&self) -> broadcast::Receiver<ChannelEvent>;
    /// Ask the service to deliver notifications for `topic`.
    fn subscribe(&self, topic: &str);
    /// Stop delivery for `topic`.
    fn unsubscribe(&self, topic: &str);
    /// Publish a payload to a topic.
    fn publish(&self, topic: &str, body: &str);
    /// Tear the connection down.
    fn disconnect(&self);
}

impl ChannelTransport for tixly_api::NotificationChannel {
    fn connect(&self) -> broadcast::Receiver<ChannelEvent> {
        Self::connect(self)
    }

    fn subscribe(&self, topic: &str) {
        self.subscribe_topic(topic);
    }

    fn unsubscribe(&self, topic: &str) {
        self.unsubscribe_topic(topic);
    }

    fn publish(&self, topic: &str, body: &str) {
        Self::publish(self, topic, body);
    }

    fn disconnect(&self) {
        Self::disconnect(self);
    }
}

// ── Registry state ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disconnected,
    Connecting,
    Connected,
}

struct Registration {
    id: u64,
    topic: String,
    callback: Arc<NotificationCallback>,
}

struct RegistryState {
    phase: Phase,
    /// Subscriptions made before the channel connected, FIFO.
    pending: Vec<Registration>,
    /// Subscriptions registered against the live channel. Retained
    /// across disconnects so they can be replayed on reconnect.
    active: Vec<Registration>,
    driver: Option<JoinHandle<()>>,
}

struct RegistryInner {
    transport: Arc<dyn ChannelTransport>,
    state: Mutex<RegistryState>,
    next_id: AtomicU64,
}

impl RegistryInner {
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().expect("registry state lock poisoned")
    }
}

// ── SubscriptionRegistry ─────────────────────────────────────────────

/// Manages topic subscriptions over a shared channel transport.
///
/// Cheaply cloneable; all clones share one registration list and one
/// transport connection.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new(transport: Arc<dyn ChannelTransport>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                transport,
                state: Mutex::new(RegistryState {
                    phase: Phase::Disconnected,
                    pending: Vec::new(),
                    active: Vec::new(),
                    driver: None,
                }),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Establish the channel connection. Idempotent: while a driver
    /// task exists, later calls are no-ops.
    pub fn connect(&self) {
        let mut st = self.inner.lock();
        if st.driver.is_some() {
            debug!("registry already connected");
            return;
        }
        st.phase = Phase::Connecting;
        let events = self.inner.transport.connect();
        st.driver = Some(tokio::spawn(registry_driver(
            Arc::clone(&self.inner),
            events,
        )));
    }

    /// Tear down the channel and drop every pending and active
    /// subscription. Outstanding [`SubscriptionHandle`]s become no-ops.
    pub fn disconnect(&self) {
        let driver = {
            let mut st = self.inner.lock();
            st.phase = Phase::Disconnected;
            st.pending.clear();
            st.active.clear();
            st.driver.take()
        };
        if let Some(handle) = driver {
            handle.abort();
        }
        self.inner.transport.disconnect();
        info!("subscription registry disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().phase == Phase::Connected
    }

    /// Register `callback` for `topic`.
    ///
    /// When the channel is live the registration happens immediately;
    /// otherwise it is buffered and replayed on the connected event.
    /// Either way the call returns synchronously with a handle that
    /// removes exactly this registration -- equal topics with distinct
    /// callbacks coexist.
    pub fn subscribe(
        &self,
        topic: impl Into<String>,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let topic = topic.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let registration = Registration {
            id,
            topic: topic.clone(),
            callback: Arc::new(callback),
        };

        let register_live = {
            let mut st = self.inner.lock();
            if st.phase == Phase::Connected {
                let first_for_topic = !st.active.iter().any(|r| r.topic == registration.topic);
                st.active.push(registration);
                first_for_topic
            } else {
                debug!(%topic, "channel not connected, subscription buffered");
                st.pending.push(registration);
                false
            }
        };

        if register_live {
            self.inner.transport.subscribe(&topic);
        }

        SubscriptionHandle {
            id,
            topic,
            inner: Arc::downgrade(&self.inner),
            released: false,
        }
    }
}

// ── SubscriptionHandle ───────────────────────────────────────────────

/// Owner's handle to one registration. Releasing it (explicitly or on
/// drop) removes the matching entry from the pending or active list;
/// after the registry disconnects the release is a no-op.
pub struct SubscriptionHandle {
    id: u64,
    topic: String,
    inner: Weak<RegistryInner>,
    released: bool,
}

impl SubscriptionHandle {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Deregister now instead of waiting for drop.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        release_registration(&inner, self.id);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

fn release_registration(inner: &RegistryInner, id: u64) {
    let unsubscribe_topic = {
        let mut st = inner.lock();
        if let Some(pos) = st.pending.iter().position(|r| r.id == id) {
            st.pending.remove(pos);
            None
        } else if let Some(pos) = st.active.iter().position(|r| r.id == id) {
            let registration = st.active.remove(pos);
            let last_for_topic = !st.active.iter().any(|r| r.topic == registration.topic);
            (last_for_topic && st.phase == Phase::Connected).then_some(registration.topic)
        } else {
            // Already cleared by disconnect().
            None
        }
    };

    if let Some(topic) = unsubscribe_topic {
        inner.transport.unsubscribe(&topic);
    }
}

// ── Driver task ──────────────────────────────────────────────────────

/// Consumes the transport's event stream: promotes registrations on
/// connect, marks the phase on disconnect, dispatches messages.
async fn registry_driver(
    inner: Arc<RegistryInner>,
    mut events: broadcast::Receiver<ChannelEvent>,
) {
    loop {
        match events.recv().await {
            Ok(ChannelEvent::Connected) => on_connected(&inner),
            Ok(ChannelEvent::Disconnected) => {
                inner.lock().phase = Phase::Disconnected;
                debug!("channel disconnected, new subscriptions will buffer");
            }
            Ok(ChannelEvent::Message { topic, body }) => dispatch(&inner, &topic, &body),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "registry event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("registry driver exiting");
}

/// Re-register every active topic (reconnect replay), then promote the
/// pending list FIFO. Wire subscribe frames are sent once per topic.
fn on_connected(inner: &RegistryInner) {
    let topics = {
        let mut st = inner.lock();
        st.phase = Phase::Connected;

        let mut topics: Vec<String> = Vec::new();
        for registration in &st.active {
            if !topics.contains(&registration.topic) {
                topics.push(registration.topic.clone());
            }
        }
        let pending: Vec<Registration> = st.pending.drain(..).collect();
        for registration in pending {
            if !topics.contains(&registration.topic) {
                topics.push(registration.topic.clone());
            }
            st.active.push(registration);
        }
        topics
    };

    for topic in &topics {
        inner.transport.subscribe(topic);
    }
    info!(topics = topics.len(), "channel connected, registrations replayed");
}

fn dispatch(inner: &RegistryInner, topic: &str, body: &str) {
    // Snapshot the matching callbacks, then invoke outside the lock.
    let callbacks: Vec<Arc<NotificationCallback>> = {
        let st = inner.lock();
        st.active
            .iter()
            .filter(|r| r.topic == topic)
            .map(|r| Arc::clone(&r.callback))
            .collect()
    };

    trace!(topic, receivers = callbacks.len(), "dispatching notification");
    for callback in callbacks {
        callback(body);
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Transport fake: records the frames it is asked to send and lets
    /// tests inject channel events.
    struct FakeChannel {
        events: broadcast::Sender<ChannelEvent>,
        log: Mutex<Vec<String>>,
    }

    impl FakeChannel {
        fn new() -> Arc<Self> {
            let (events, _) = broadcast::channel(64);
            Arc::new(Self {
                events,
                log: Mutex::new(Vec::new()),
            })
        }

        fn push(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }

        fn sent(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn emit(&self, event: ChannelEvent) {
            let _ = self.events.send(event);
        }
    }

    impl ChannelTransport for FakeChannel {
        fn connect(&self) -> broadcast::Receiver<ChannelEvent> {
            self.push("connect".to_owned());
            self.events.subscribe()
        }

        fn subscribe(&self, topic: &str) {
            self.push(format!("subscribe {topic}"));
        }

        fn unsubscribe(&self, topic: &str) {
            self.push(format!("unsubscribe {topic}"));
        }

        fn publish(&self, topic: &str, _body: &str) {
            self.push(format!("publish {topic}"));
        }

        fn disconnect(&self) {
            self.push("disconnect".to_owned());
        }
    }

    /// Let the driver task drain everything that has been emitted.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    fn counting_callback() -> (Arc<AtomicUsize>, impl Fn(&str) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move |_body: &str| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn pending_subscription_replays_on_connect() {
        let channel = FakeChannel::new();
        let registry = SubscriptionRegistry::new(channel.clone());

        let (count, callback) = counting_callback();
        let _handle = registry.subscribe("/topic/tickets", callback);
        registry.connect();
        assert!(!registry.is_connected());

        channel.emit(ChannelEvent::Connected);
        settle().await;

        assert!(registry.is_connected());
        assert_eq!(
            channel.sent(),
            vec!["connect".to_owned(), "subscribe /topic/tickets".to_owned()]
        );

        channel.emit(ChannelEvent::Message {
            topic: "/topic/tickets".to_owned(),
            body: r#"{"eventType":"CREATED","entityId":1}"#.to_owned(),
        });
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribe_while_connected_registers_immediately() {
        let channel = FakeChannel::new();
        let registry = SubscriptionRegistry::new(channel.clone());
        registry.connect();
        channel.emit(ChannelEvent::Connected);
        settle().await;

        let (count, callback) = counting_callback();
        let _handle = registry.subscribe("/topic/venues", callback);

        assert!(channel.sent().contains(&"subscribe /topic/venues".to_owned()));

        channel.emit(ChannelEvent::Message {
            topic: "/topic/venues".to_owned(),
            body: "{}".to_owned(),
        });
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribed_pending_entry_is_not_replayed() {
        let channel = FakeChannel::new();
        let registry = SubscriptionRegistry::new(channel.clone());

        let (count, callback) = counting_callback();
        let handle = registry.subscribe("/topic/persons", callback);
        handle.unsubscribe();

        registry.connect();
        channel.emit(ChannelEvent::Connected);
        channel.emit(ChannelEvent::Message {
            topic: "/topic/persons".to_owned(),
            body: "{}".to_owned(),
        });
        settle().await;

        assert_eq!(channel.sent(), vec!["connect".to_owned()]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn duplicate_topics_with_distinct_callbacks_coexist() {
        let channel = FakeChannel::new();
        let registry = SubscriptionRegistry::new(channel.clone());
        registry.connect();
        channel.emit(ChannelEvent::Connected);
        settle().await;

        let (first_count, first_callback) = counting_callback();
        let (second_count, second_callback) = counting_callback();
        let first_handle = registry.subscribe("/topic/events", first_callback);
        let _second_handle = registry.subscribe("/topic/events", second_callback);

        // One wire subscribe for the shared topic.
        let subscribes = channel
            .sent()
            .iter()
            .filter(|e| e.as_str() == "subscribe /topic/events")
            .count();
        assert_eq!(subscribes, 1);

        channel.emit(ChannelEvent::Message {
            topic: "/topic/events".to_owned(),
            body: "{}".to_owned(),
        });
        settle().await;
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);

        // Releasing one of two keeps the wire subscription.
        first_handle.unsubscribe();
        assert!(!channel.sent().contains(&"unsubscribe /topic/events".to_owned()));

        channel.emit(ChannelEvent::Message {
            topic: "/topic/events".to_owned(),
            body: "{}".to_owned(),
        });
        settle().await;
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn releasing_last_registration_unsubscribes_topic() {
        let channel = FakeChannel::new();
        let registry = SubscriptionRegistry::new(channel.clone());
        registry.connect();
        channel.emit(ChannelEvent::Connected);
        settle().await;

        let (_count, callback) = counting_callback();
        let handle = registry.subscribe("/topic/locations", callback);
        handle.unsubscribe();

        assert!(channel.sent().contains(&"unsubscribe /topic/locations".to_owned()));
    }

    #[tokio::test]
    async fn reconnect_replays_active_subscriptions() {
        let channel = FakeChannel::new();
        let registry = SubscriptionRegistry::new(channel.clone());
        registry.connect();
        channel.emit(ChannelEvent::Connected);
        settle().await;

        let (count, callback) = counting_callback();
        let _handle = registry.subscribe("/topic/tickets", callback);
        settle().await;

        channel.emit(ChannelEvent::Disconnected);
        settle().await;
        assert!(!registry.is_connected());

        channel.emit(ChannelEvent::Connected);
        settle().await;
        assert!(registry.is_connected());

        let subscribes = channel
            .sent()
            .iter()
            .filter(|e| e.as_str() == "subscribe /topic/tickets")
            .count();
        assert_eq!(subscribes, 2, "active subscription must be re-registered");

        channel.emit(ChannelEvent::Message {
            topic: "/topic/tickets".to_owned(),
            body: "{}".to_owned(),
        });
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pending_replay_preserves_fifo_order() {
        let channel = FakeChannel::new();
        let registry = SubscriptionRegistry::new(channel.clone());

        let (_c1, cb1) = counting_callback();
        let (_c2, cb2) = counting_callback();
        let (_c3, cb3) = counting_callback();
        let _h1 = registry.subscribe("/topic/tickets", cb1);
        let _h2 = registry.subscribe("/topic/venues", cb2);
        let _h3 = registry.subscribe("/topic/persons", cb3);

        registry.connect();
        channel.emit(ChannelEvent::Connected);
        settle().await;

        assert_eq!(
            channel.sent(),
            vec![
                "connect".to_owned(),
                "subscribe /topic/tickets".to_owned(),
                "subscribe /topic/venues".to_owned(),
                "subscribe /topic/persons".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let channel = FakeChannel::new();
        let registry = SubscriptionRegistry::new(channel.clone());
        registry.connect();
        registry.connect();
        registry.connect();

        let connects = channel
            .sent()
            .iter()
            .filter(|e| e.as_str() == "connect")
            .count();
        assert_eq!(connects, 1);
    }

    #[tokio::test]
    async fn disconnect_clears_subscriptions_and_handles_become_noops() {
        let channel = FakeChannel::new();
        let registry = SubscriptionRegistry::new(channel.clone());
        registry.connect();
        channel.emit(ChannelEvent::Connected);
        settle().await;

        let (count, callback) = counting_callback();
        let handle = registry.subscribe("/topic/tickets", callback);

        registry.disconnect();
        assert!(!registry.is_connected());
        assert!(channel.sent().contains(&"disconnect".to_owned()));

        // Release after disconnect must not emit an unsubscribe frame.
        let frames_before = channel.sent().len();
        handle.unsubscribe();
        assert_eq!(channel.sent().len(), frames_before);

        channel.emit(ChannelEvent::Message {
            topic: "/topic/tickets".to_owned(),
            body: "{}".to_owned(),
        });
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
