use std::collections::{HashMap, HashSet};

use mqttd_core::topic::TopicName;
use mqttd_core::v3::PublishPacket;

/// Per-client session state: the exact-match subscription set and the queue
/// of QoS 1/2 messages that arrived while the client was offline.
#[derive(Debug, Default)]
pub struct Session {
    subscriptions: HashSet<TopicName>,
    queued_messages: Vec<PublishPacket>,
    queued_message_ids: HashSet<String>,
}

impl Session {
    pub fn new() -> Self {
        return Self::default();
    }

    /// Returns true when the topic was not already in the subscription set.
    pub fn subscribe(&mut self, topic: &TopicName) -> bool {
        return self.subscriptions.insert(topic.clone());
    }

    pub fn unsubscribe(&mut self, topic: &TopicName) {
        self.subscriptions.remove(topic);
    }

    pub fn is_subscribed(&self, topic: &TopicName) -> bool {
        return self.subscriptions.contains(topic);
    }

    /// Appends a PUBLISH to the offline queue unless an identical delivery is
    /// already queued. Returns true when the message was enqueued.
    pub fn queue_message(&mut self, packet: &PublishPacket) -> bool {
        let key = dedup_key(packet);

        if self.queued_message_ids.contains(&key) {
            return false;
        }

        self.queued_message_ids.insert(key);
        self.queued_messages.push(packet.clone());
        return true;
    }

    /// Takes the queued messages in enqueue order, clearing the queue and its
    /// dedup set together.
    pub fn drain_queue(&mut self) -> Vec<PublishPacket> {
        self.queued_message_ids.clear();
        return std::mem::take(&mut self.queued_messages);
    }

    pub fn queued_len(&self) -> usize {
        return self.queued_messages.len();
    }
}

/// Retransmissions of the same QoS 1/2 PUBLISH carry the same packet id,
/// topic and payload; the key collapses them to one queue entry. The payload
/// is folded in lossily, which is how the key has always been built.
pub fn dedup_key(packet: &PublishPacket) -> String {
    return format!(
        "{}-{}-{}",
        packet.id().unwrap_or(0),
        packet.topic(),
        String::from_utf8_lossy(packet.payload()),
    );
}

/// Sessions keyed by client id. A session lives here while its client is
/// connected, and survives disconnection when the client connected with
/// `clean_session = false`.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        return Self::default();
    }

    /// Resolves the session for a connecting client. A clean-session CONNECT
    /// wipes any prior state for the client id; otherwise an existing session
    /// is resumed as-is.
    pub fn resolve(&mut self, client_id: &str, clean_session: bool) -> &mut Session {
        if clean_session {
            self.sessions.remove(client_id);
        }

        return self
            .sessions
            .entry(client_id.to_string())
            .or_insert_with(Session::new);
    }

    pub fn get_mut(&mut self, client_id: &str) -> Option<&mut Session> {
        return self.sessions.get_mut(client_id);
    }

    pub fn remove(&mut self, client_id: &str) -> Option<Session> {
        return self.sessions.remove(client_id);
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Session)> {
        return self.sessions.iter_mut();
    }
}
