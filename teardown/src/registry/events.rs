//! Container and volume lifecycle events.
//!
//! Events are kept in a bounded in-memory history and fanned out to live
//! subscribers over a tokio broadcast channel. Subscribers that fall behind
//! see `Lagged` and can catch up from [`EventLog::history`].

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::container::Container;
use crate::runtime::constants::EVENT_HISTORY;
use crate::runtime::types::ContainerId;

const CHANNEL_CAPACITY: usize = 64;

/// Kind of object an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Container,
    Volume,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Container id or volume name.
    pub actor: String,
    pub action: String,
    /// Containers carry `name` (without the leading `/`) and `image`;
    /// volumes carry whatever the caller supplies, usually `driver`.
    pub attributes: BTreeMap<String, String>,
    pub time: DateTime<Utc>,
}

#[derive(Debug)]
pub struct EventLog {
    sender: broadcast::Sender<Event>,
    history: RwLock<VecDeque<Event>>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENT_HISTORY)
    }
}

impl EventLog {
    /// `capacity` bounds the retained history; zero keeps none.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            history: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn log(&self, container: &Container, action: &str) -> Event {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "name".to_string(),
            container.name().trim_start_matches('/').to_string(),
        );
        if !container.image().is_empty() {
            attributes.insert("image".to_string(), container.image().to_string());
        }

        self.record(EventType::Container, container.id().as_str(), action, attributes)
    }

    pub fn log_volume(
        &self,
        name: &str,
        action: &str,
        attributes: BTreeMap<String, String>,
    ) -> Event {
        self.record(EventType::Volume, name, action, attributes)
    }

    fn record(
        &self,
        kind: EventType,
        actor: &str,
        action: &str,
        attributes: BTreeMap<String, String>,
    ) -> Event {
        let event = Event {
            kind,
            actor: actor.to_string(),
            action: action.to_string(),
            attributes,
            time: Utc::now(),
        };

        if self.capacity > 0 {
            let mut history = self.history.write();
            while history.len() >= self.capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // No receivers is fine.
        let _ = self.sender.send(event.clone());

        tracing::debug!(
            kind = ?event.kind,
            actor = %event.actor,
            action = %event.action,
            "Event"
        );
        event
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Retained events, oldest first.
    pub fn history(&self) -> Vec<Event> {
        self.history.read().iter().cloned().collect()
    }

    /// Retained container events for `id` with the given action.
    pub fn count(&self, id: &ContainerId, action: &str) -> usize {
        self.count_matching(EventType::Container, id.as_str(), action)
    }

    /// Retained volume events for `name` with the given action.
    pub fn count_volume(&self, name: &str, action: &str) -> usize {
        self.count_matching(EventType::Volume, name, action)
    }

    fn count_matching(&self, kind: EventType, actor: &str, action: &str) -> usize {
        self.history
            .read()
            .iter()
            .filter(|e| e.kind == kind && e.actor == actor && e.action == action)
            .count()
    }
}
