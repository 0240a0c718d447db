use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use mqttd_core::qos::QosLevel;
use mqttd_core::topic::TopicName;
use mqttd_core::v3::PublishPacket;
use tokio::sync::{Mutex, MutexGuard};

use crate::auth::{Authenticator, TopicAuthorizer};
use crate::mailbox::Mailbox;
use crate::session::{Session, SessionStore};

/// The shared broker: the connection registries and session store behind one
/// async mutex, plus the two authentication ports.
///
/// There is exactly one Broker per server, owned by the server and handed to
/// connection handlers behind an Arc. All registry mutation happens inside
/// [lock](Self::lock), so no handler ever observes a torn intermediate state.
pub struct Broker {
    auth_enabled: bool,
    authenticator: Arc<dyn Authenticator>,
    authorizer: Arc<dyn TopicAuthorizer>,
    state: Mutex<BrokerState>,
}

impl Broker {
    pub fn new(
        auth_enabled: bool,
        authenticator: Arc<dyn Authenticator>,
        authorizer: Arc<dyn TopicAuthorizer>,
    ) -> Self {
        return Self {
            auth_enabled,
            authenticator,
            authorizer,
            state: Mutex::new(BrokerState::new()),
        };
    }

    pub fn auth_enabled(&self) -> bool {
        return self.auth_enabled;
    }

    pub async fn lock(&self) -> MutexGuard<'_, BrokerState> {
        return self.state.lock().await;
    }

    /// Checks CONNECT credentials. A CONNECT that omits the username or the
    /// password never verifies.
    pub fn verify_credentials(&self, username: Option<&str>, password: Option<&[u8]>) -> bool {
        let (username, password) = match (username, password) {
            (Some(username), Some(password)) => (username, password),
            _ => return false,
        };

        let password = match std::str::from_utf8(password) {
            Ok(password) => password,
            Err(_) => return false,
        };

        return self.authenticator.verify(username, password);
    }

    /// Topic-level authorization for SUBSCRIBE and PUBLISH. Everything is
    /// allowed when authentication is disabled; an anonymous connection is
    /// allowed nothing when it is enabled.
    pub fn is_topic_authorized(&self, username: Option<&str>, topic: &TopicName) -> bool {
        if !self.auth_enabled {
            return true;
        }

        match username {
            Some(username) => {
                return self.authorizer.is_topic_authorized(username, topic.as_str())
            }
            None => return false,
        }
    }
}

/// The four coupled registries plus the session store.
///
/// Invariant: `(topic, handle)` is in `subscriptions` exactly when `topic` is
/// in `client_subscriptions[handle]`, and every handle in `connected_clients`
/// has exactly one reverse entry in `writer_to_client_id`. Every mutation
/// below maintains both directions.
pub struct BrokerState {
    connected_clients: HashMap<String, Mailbox>,
    writer_to_client_id: HashMap<u64, String>,
    subscriptions: HashMap<TopicName, HashMap<u64, Mailbox>>,
    client_subscriptions: HashMap<u64, HashSet<TopicName>>,
    sessions: SessionStore,
}

impl BrokerState {
    pub fn new() -> Self {
        return Self {
            connected_clients: HashMap::new(),
            writer_to_client_id: HashMap::new(),
            subscriptions: HashMap::new(),
            client_subscriptions: HashMap::new(),
            sessions: SessionStore::new(),
        };
    }

    /// Resolves the session for a connecting client, wiping prior state on a
    /// clean-session CONNECT.
    pub fn resolve_session(&mut self, client_id: &str, clean_session: bool) -> &mut Session {
        return self.sessions.resolve(client_id, clean_session);
    }

    pub fn session_mut(&mut self, client_id: &str) -> Option<&mut Session> {
        return self.sessions.get_mut(client_id);
    }

    /// Detaches the currently registered connection for `client_id`, if any:
    /// removes its handle from every subscription set and from the reverse
    /// map, and returns the handle so the caller can close it. The session is
    /// left alone, it now belongs to the superseding connection.
    pub fn take_over(&mut self, client_id: &str) -> Option<Mailbox> {
        let old = self.connected_clients.remove(client_id)?;

        if let Some(topics) = self.client_subscriptions.remove(&old.id()) {
            for topic in topics {
                if let Some(subscribers) = self.subscriptions.get_mut(&topic) {
                    subscribers.remove(&old.id());
                    if subscribers.is_empty() {
                        self.subscriptions.remove(&topic);
                    }
                }
            }
        }

        self.writer_to_client_id.remove(&old.id());

        return Some(old);
    }

    /// Registers a freshly connected client in both directions.
    pub fn register(&mut self, client_id: &str, mailbox: &Mailbox) {
        self.connected_clients
            .insert(client_id.to_string(), mailbox.clone());
        self.writer_to_client_id
            .insert(mailbox.id(), client_id.to_string());
    }

    pub fn is_connected(&self, client_id: &str) -> bool {
        return self.connected_clients.contains_key(client_id);
    }

    /// Adds a subscription to the registries and the session. Returns true
    /// when this connection was not yet subscribed to the topic; a duplicate
    /// leaves every set unchanged.
    pub fn subscribe(&mut self, client_id: &str, mailbox: &Mailbox, topic: &TopicName) -> bool {
        let newly_added = self
            .client_subscriptions
            .entry(mailbox.id())
            .or_default()
            .insert(topic.clone());

        self.subscriptions
            .entry(topic.clone())
            .or_default()
            .insert(mailbox.id(), mailbox.clone());

        if let Some(session) = self.sessions.get_mut(client_id) {
            session.subscribe(topic);
        }

        return newly_added;
    }

    /// Removes a subscription from the registries and the session. A topic
    /// the connection never subscribed to is a no-op.
    pub fn unsubscribe(&mut self, client_id: &str, mailbox_id: u64, topic: &TopicName) {
        if let Some(subscribers) = self.subscriptions.get_mut(topic) {
            subscribers.remove(&mailbox_id);
            if subscribers.is_empty() {
                self.subscriptions.remove(topic);
            }
        }

        if let Some(topics) = self.client_subscriptions.get_mut(&mailbox_id) {
            topics.remove(topic);
        }

        if let Some(session) = self.sessions.get_mut(client_id) {
            session.unsubscribe(topic);
        }
    }

    /// Snapshot of the connected subscribers for a topic, excluding the
    /// publishing connection.
    pub fn subscribers(&self, topic: &TopicName, exclude: u64) -> Vec<Mailbox> {
        match self.subscriptions.get(topic) {
            Some(subscribers) => {
                return subscribers
                    .values()
                    .filter(|mailbox| mailbox.id() != exclude)
                    .cloned()
                    .collect()
            }
            None => return Vec::new(),
        }
    }

    /// Queues a QoS 1/2 PUBLISH for every offline session subscribed to its
    /// topic. QoS 0 messages are never queued.
    pub fn queue_for_offline_sessions(&mut self, packet: &PublishPacket) {
        if packet.qos() == QosLevel::AtMostOnce {
            return;
        }

        for (client_id, session) in self.sessions.iter_mut() {
            if self.connected_clients.contains_key(client_id) {
                continue;
            }

            if !session.is_subscribed(packet.topic()) {
                continue;
            }

            if session.queue_message(packet) {
                log::info!(
                    "Queued PUBLISH for offline client_id={client_id}, topic='{}'",
                    packet.topic()
                );
            }
        }
    }

    /// Unwinds a departing connection from every registry. Runs for every
    /// connection teardown, graceful or not.
    ///
    /// After a take-over the registries already point at the superseding
    /// connection; the `still_current` guard keeps the superseded handler
    /// from deleting the session or registration its successor now owns.
    pub fn cleanup(&mut self, mailbox_id: u64, client_id: Option<&str>, clean_session: bool) {
        if let Some(topics) = self.client_subscriptions.remove(&mailbox_id) {
            for topic in topics {
                if let Some(subscribers) = self.subscriptions.get_mut(&topic) {
                    subscribers.remove(&mailbox_id);
                    if subscribers.is_empty() {
                        self.subscriptions.remove(&topic);
                    }
                }
            }
        }

        if let Some(client_id) = client_id {
            let still_current = self
                .connected_clients
                .get(client_id)
                .map(|mailbox| mailbox.id() == mailbox_id)
                .unwrap_or(false);

            if still_current {
                self.connected_clients.remove(client_id);

                if clean_session {
                    self.sessions.remove(client_id);
                }
            }
        }

        self.writer_to_client_id.remove(&mailbox_id);
    }

    #[cfg(test)]
    fn registries_are_consistent(&self) -> bool {
        for (topic, subscribers) in &self.subscriptions {
            for id in subscribers.keys() {
                let has_reverse = self
                    .client_subscriptions
                    .get(id)
                    .map(|topics| topics.contains(topic))
                    .unwrap_or(false);
                if !has_reverse {
                    return false;
                }
            }
        }

        for (id, topics) in &self.client_subscriptions {
            for topic in topics {
                let has_forward = self
                    .subscriptions
                    .get(topic)
                    .map(|subscribers| subscribers.contains_key(id))
                    .unwrap_or(false);
                if !has_forward {
                    return false;
                }
            }
        }

        for (client_id, mailbox) in &self.connected_clients {
            if self.writer_to_client_id.get(&mailbox.id()) != Some(client_id) {
                return false;
            }
        }

        return true;
    }
}

#[cfg(test)]
mod state {
    use bytes::Bytes;
    use mqttd_core::topic::TopicName;
    use mqttd_core::v3::PublishPacket;

    use crate::mailbox::Mailbox;

    use super::BrokerState;

    fn topic(name: &str) -> TopicName {
        return TopicName::from_str(name).unwrap();
    }

    fn qos1_publish(topic_name: &str, payload: &'static [u8], id: u16) -> PublishPacket {
        let mut packet =
            PublishPacket::new(&topic(topic_name), Bytes::from_static(payload));
        packet.set_qos_atleastonce(id);
        return packet;
    }

    #[test]
    fn subscribe_links_both_directions() {
        let mut state = BrokerState::new();
        let (mailbox, _rx) = Mailbox::new();

        state.resolve_session("A", true);
        state.register("A", &mailbox);

        assert!(state.subscribe("A", &mailbox, &topic("t")));
        // duplicate leaves the sets unchanged.
        assert!(!state.subscribe("A", &mailbox, &topic("t")));

        assert!(state.registries_are_consistent());
        assert_eq!(state.subscribers(&topic("t"), 0).len(), 1);
        // the publisher itself is excluded from fan-out.
        assert!(state.subscribers(&topic("t"), mailbox.id()).is_empty());
    }

    #[test]
    fn unsubscribe_unlinks_both_directions() {
        let mut state = BrokerState::new();
        let (mailbox, _rx) = Mailbox::new();

        state.resolve_session("A", true);
        state.register("A", &mailbox);
        state.subscribe("A", &mailbox, &topic("t"));

        state.unsubscribe("A", mailbox.id(), &topic("t"));

        assert!(state.registries_are_consistent());
        assert!(state.subscribers(&topic("t"), 0).is_empty());
        assert!(!state.session_mut("A").unwrap().is_subscribed(&topic("t")));
    }

    #[test]
    fn take_over_detaches_the_old_connection() {
        let mut state = BrokerState::new();
        let (old, _rx_old) = Mailbox::new();
        let (new, _rx_new) = Mailbox::new();

        state.resolve_session("A", false);
        state.register("A", &old);
        state.subscribe("A", &old, &topic("t"));

        let detached = state.take_over("A").expect("old connection registered");
        assert_eq!(detached.id(), old.id());

        state.register("A", &new);

        assert!(state.registries_are_consistent());
        assert!(state.subscribers(&topic("t"), 0).is_empty());
        // the session survived the take-over.
        assert!(state.session_mut("A").unwrap().is_subscribed(&topic("t")));
    }

    #[test]
    fn cleanup_after_take_over_spares_the_successor() {
        let mut state = BrokerState::new();
        let (old, _rx_old) = Mailbox::new();
        let (new, _rx_new) = Mailbox::new();

        state.resolve_session("A", true);
        state.register("A", &old);
        state.take_over("A");
        state.resolve_session("A", true);
        state.register("A", &new);

        // the superseded handler tears down with clean_session = true; the
        // successor's registration and session must survive.
        state.cleanup(old.id(), Some("A"), true);

        assert!(state.is_connected("A"));
        assert!(state.session_mut("A").is_some());
        assert!(state.registries_are_consistent());
    }

    #[test]
    fn clean_session_cleanup_removes_every_trace() {
        let mut state = BrokerState::new();
        let (mailbox, _rx) = Mailbox::new();

        state.resolve_session("A", true);
        state.register("A", &mailbox);
        state.subscribe("A", &mailbox, &topic("t"));

        state.cleanup(mailbox.id(), Some("A"), true);

        assert!(!state.is_connected("A"));
        assert!(state.session_mut("A").is_none());
        assert!(state.subscribers(&topic("t"), 0).is_empty());
        assert!(state.registries_are_consistent());
    }

    #[test]
    fn persistent_cleanup_keeps_the_session() {
        let mut state = BrokerState::new();
        let (mailbox, _rx) = Mailbox::new();

        state.resolve_session("A", false);
        state.register("A", &mailbox);
        state.subscribe("A", &mailbox, &topic("t"));

        state.cleanup(mailbox.id(), Some("A"), false);

        assert!(!state.is_connected("A"));
        let session = state.session_mut("A").expect("session persisted");
        assert!(session.is_subscribed(&topic("t")));
    }

    #[test]
    fn offline_queueing_skips_connected_and_unsubscribed_sessions() {
        let mut state = BrokerState::new();
        let (online, _rx_online) = Mailbox::new();

        // offline subscriber of "t".
        state.resolve_session("offline", false);
        state.session_mut("offline").unwrap().subscribe(&topic("t"));

        // connected subscriber of "t".
        state.resolve_session("online", false);
        state.register("online", &online);
        state.subscribe("online", &online, &topic("t"));

        // offline session subscribed elsewhere.
        state.resolve_session("other", false);
        state.session_mut("other").unwrap().subscribe(&topic("u"));

        state.queue_for_offline_sessions(&qos1_publish("t", b"m1", 1));

        assert_eq!(state.session_mut("offline").unwrap().queued_len(), 1);
        assert_eq!(state.session_mut("online").unwrap().queued_len(), 0);
        assert_eq!(state.session_mut("other").unwrap().queued_len(), 0);
    }

    #[test]
    fn qos0_is_never_queued_offline() {
        let mut state = BrokerState::new();

        state.resolve_session("offline", false);
        state.session_mut("offline").unwrap().subscribe(&topic("t"));

        let packet = PublishPacket::new(&topic("t"), Bytes::from_static(b"m"));
        state.queue_for_offline_sessions(&packet);

        assert_eq!(state.session_mut("offline").unwrap().queued_len(), 0);
    }
}
