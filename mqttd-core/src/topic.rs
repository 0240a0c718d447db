use std::fmt::Display;

use crate::err::{DecodeError, DecodeErrorKind};

/*
 * Topics are opaque UTF-8 strings matched exactly. Wildcard filters ('+', '#')
 * are not supported by this broker; a SUBSCRIBE carries topic names, not
 * patterns.
 *
 * The Topic Name MUST be a UTF-8 encoded string and MUST be at least one
 * character long [MQTT-4.7.3-1]. Topic Names are case sensitive and a
 * leading or trailing '/' produces a distinct Topic Name.
 */
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug, Hash)]
pub struct TopicName {
    name: String,
}

impl TopicName {
    pub fn from_str(name: &str) -> Result<Self, DecodeError> {
        if name.is_empty() {
            return Err(DecodeError::new(
                DecodeErrorKind::MalformedTopicName,
                String::from("Topic names must be at least one character long."),
            ));
        }

        if name.contains('\0') {
            return Err(DecodeError::new(
                DecodeErrorKind::MalformedTopicName,
                String::from("Topic names cannot contain the null character."),
            ));
        }

        return Ok(Self {
            name: name.to_string(),
        });
    }

    pub fn as_str(&self) -> &str {
        return &self.name;
    }

    /// Byte length of the topic, not the character count.
    pub fn len(&self) -> usize {
        return self.name.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.name.is_empty();
    }
}

impl Display for TopicName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}", self.name);
    }
}

#[cfg(test)]
mod topic_name {
    use super::TopicName;

    #[test]
    fn accepts_plain_names() {
        let topic = TopicName::from_str("devices/alpha/temp").unwrap();
        assert_eq!(topic.as_str(), "devices/alpha/temp");
        assert_eq!(topic.len(), 18);
    }

    #[test]
    fn rejects_empty_names() {
        assert!(TopicName::from_str("").is_err());
    }

    #[test]
    fn rejects_null_character() {
        assert!(TopicName::from_str("bad\0topic").is_err());
    }
}
