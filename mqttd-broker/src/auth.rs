use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Credential verifier consulted once per CONNECT when authentication is
/// enabled. How credentials are stored and hashed is the concern of whatever
/// implements this.
pub trait Authenticator: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Per-user topic ACL, consulted once per topic on SUBSCRIBE and once per
/// PUBLISH.
pub trait TopicAuthorizer: Send + Sync {
    fn is_topic_authorized(&self, username: &str, topic: &str) -> bool;
}

#[derive(Debug, Default)]
struct UserAccount {
    password: String,
    authorized_topics: HashSet<String>,
}

/// In-memory user table implementing both ports. Useful for tests and for
/// deployments whose credential tooling populates it at startup.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    users: RwLock<HashMap<String, UserAccount>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        return Self::default();
    }

    /// Returns false when the username is already taken.
    pub fn register(&self, username: &str, password: &str) -> bool {
        let mut users = self.users.write().unwrap();

        if users.contains_key(username) {
            log::warn!("User {username} already exists");
            return false;
        }

        users.insert(
            username.to_string(),
            UserAccount {
                password: password.to_string(),
                authorized_topics: HashSet::new(),
            },
        );
        return true;
    }

    /// Grants the user access to a topic. Returns false for unknown users.
    pub fn authorize_topic(&self, username: &str, topic: &str) -> bool {
        let mut users = self.users.write().unwrap();

        match users.get_mut(username) {
            Some(account) => {
                account.authorized_topics.insert(topic.to_string());
                return true;
            }
            None => {
                log::warn!("User {username} does not exist");
                return false;
            }
        }
    }
}

impl Authenticator for MemoryCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        let users = self.users.read().unwrap();

        match users.get(username) {
            Some(account) => return account.password == password,
            None => {
                log::warn!("User {username} does not exist");
                return false;
            }
        }
    }
}

impl TopicAuthorizer for MemoryCredentials {
    fn is_topic_authorized(&self, username: &str, topic: &str) -> bool {
        let users = self.users.read().unwrap();

        match users.get(username) {
            Some(account) => return account.authorized_topics.contains(topic),
            None => return false,
        }
    }
}

#[cfg(test)]
mod credentials {
    use super::{Authenticator, MemoryCredentials, TopicAuthorizer};

    #[test]
    fn verifies_registered_users() {
        let creds = MemoryCredentials::new();
        assert!(creds.register("alice", "hunter2"));
        assert!(!creds.register("alice", "other"));

        assert!(creds.verify("alice", "hunter2"));
        assert!(!creds.verify("alice", "wrong"));
        assert!(!creds.verify("bob", "hunter2"));
    }

    #[test]
    fn authorizes_granted_topics_only() {
        let creds = MemoryCredentials::new();
        creds.register("alice", "hunter2");
        assert!(creds.authorize_topic("alice", "devices/alpha"));
        assert!(!creds.authorize_topic("bob", "devices/alpha"));

        assert!(creds.is_topic_authorized("alice", "devices/alpha"));
        assert!(!creds.is_topic_authorized("alice", "devices/beta"));
        assert!(!creds.is_topic_authorized("bob", "devices/alpha"));
    }
}
