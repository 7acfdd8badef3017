use crate::error::{Error, ErrorKind, Result};
use std::fmt;

/// Longest topic name the broker accepts.
const MAX_TOPIC_LEN: usize = 249;

/// A validated topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Validates `name` without touching the network.
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::new(ErrorKind::InvalidTopic, "topic is not provided"));
        }
        if name.len() > MAX_TOPIC_LEN {
            return Err(Error::new(
                ErrorKind::InvalidTopic,
                &format!("topic name is longer than {MAX_TOPIC_LEN} characters"),
            ));
        }
        if name == "." || name == ".." {
            return Err(Error::new(
                ErrorKind::InvalidTopic,
                "topic name cannot be \".\" or \"..\"",
            ));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(Error::new(
                ErrorKind::InvalidTopic,
                &format!("topic name contains illegal character {c:?}"),
            ));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Consumer group identity, unique per session so no two sessions share a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId(String);

impl GroupId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a freshly attached consumer starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPolicy {
    /// Start `window` messages before the latest offset of every partition.
    Tail { window: u32 },
}

impl Default for StartPolicy {
    fn default() -> Self {
        StartPolicy::Tail { window: 2 }
    }
}

/// Everything needed to attach one session to one topic.
#[derive(Debug, Clone)]
pub struct Subscription {
    topic: Topic,
    group_id: GroupId,
    start: StartPolicy,
}

impl Subscription {
    /// Creates a subscription with a freshly generated group identity.
    pub fn new(topic: Topic, start: StartPolicy) -> Self {
        Self {
            topic,
            group_id: GroupId::new(),
            start,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn start(&self) -> StartPolicy {
        self.start
    }
}
