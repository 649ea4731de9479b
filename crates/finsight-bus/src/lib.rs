use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use finsight_schema::ConsoleEvent;
use tokio::sync::{mpsc, RwLock};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Topic {
    Notification,
    BeliefChanged,
    StatusFetchFailed,
    SchedulesRefreshed,
}

impl Topic {
    pub fn from_event(event: &ConsoleEvent) -> Self {
        match event {
            ConsoleEvent::Notification { .. } => Topic::Notification,
            ConsoleEvent::BeliefChanged { .. } => Topic::BeliefChanged,
            ConsoleEvent::StatusFetchFailed { .. } => Topic::StatusFetchFailed,
            ConsoleEvent::SchedulesRefreshed { .. } => Topic::SchedulesRefreshed,
        }
    }
}

type Subscriber = mpsc::Sender<ConsoleEvent>;
type Subscribers = Arc<RwLock<HashMap<Topic, Vec<Subscriber>>>>;

pub struct EventBus {
    subscribers: Subscribers,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    pub async fn subscribe(&self, topic: Topic) -> mpsc::Receiver<ConsoleEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut subs = self.subscribers.write().await;
        subs.entry(topic).or_default().push(tx);
        rx
    }

    pub async fn publish(&self, event: ConsoleEvent) -> Result<()> {
        deliver(&self.subscribers, event).await
    }

    pub fn publisher(&self) -> BusPublisher {
        BusPublisher {
            subscribers: self.subscribers.clone(),
        }
    }
}

/// Cloneable publishing half, handed to the controller and the registry.
#[derive(Clone)]
pub struct BusPublisher {
    subscribers: Subscribers,
}

impl BusPublisher {
    pub async fn publish(&self, event: ConsoleEvent) -> Result<()> {
        deliver(&self.subscribers, event).await
    }
}

async fn deliver(subscribers: &Subscribers, event: ConsoleEvent) -> Result<()> {
    let topic = Topic::from_event(&event);
    let mut subs = subscribers.write().await;
    if let Some(senders) = subs.get_mut(&topic) {
        senders.retain(|tx| !tx.is_closed());
        for tx in senders.iter() {
            if tx.try_send(event.clone()).is_err() {
                tracing::debug!(?topic, "subscriber queue full, dropping console event");
            }
        }
    }
    Ok(())
}
