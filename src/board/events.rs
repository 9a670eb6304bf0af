//! Change notifications published by the project model.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::github::types::{Item, ProjectSnapshot};

/// Notification channels a renderer can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
  ProjectUpdated,
  ItemsUpdated,
  ItemUpdated,
  ItemAdded,
  ItemRemoved,
  CardMoved,
  StateCleared,
}

/// A state transition of the model, carrying its channel's payload
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
  ProjectUpdated(ProjectSnapshot),
  ItemsUpdated(Vec<Item>),
  ItemUpdated(Item),
  ItemAdded(Item),
  ItemRemoved(Item),
  CardMoved { card_id: String, to_column_id: String },
  StateCleared,
}

impl ModelEvent {
  pub fn channel(&self) -> Channel {
    match self {
      Self::ProjectUpdated(_) => Channel::ProjectUpdated,
      Self::ItemsUpdated(_) => Channel::ItemsUpdated,
      Self::ItemUpdated(_) => Channel::ItemUpdated,
      Self::ItemAdded(_) => Channel::ItemAdded,
      Self::ItemRemoved(_) => Channel::ItemRemoved,
      Self::CardMoved { .. } => Channel::CardMoved,
      Self::StateCleared => Channel::StateCleared,
    }
  }
}

type Callback = Arc<dyn Fn(&ModelEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
  next_id: u64,
  by_channel: HashMap<Channel, Vec<(u64, Callback)>>,
}

/// Synchronous publish/subscribe registry.
///
/// Callbacks run on the publishing thread, in registration order. A callback
/// must not call back into the model that owns this bus.
#[derive(Clone, Default)]
pub struct EventBus {
  listeners: Arc<Mutex<Listeners>>,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  fn listeners(&self) -> MutexGuard<'_, Listeners> {
    self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Register `callback` on `channel`. Dropping the returned handle does not
  /// unsubscribe; call [`Subscription::unsubscribe`].
  pub fn subscribe<F>(&self, channel: Channel, callback: F) -> Subscription
  where
    F: Fn(&ModelEvent) + Send + Sync + 'static,
  {
    let mut listeners = self.listeners();
    let id = listeners.next_id;
    listeners.next_id += 1;
    listeners
      .by_channel
      .entry(channel)
      .or_default()
      .push((id, Arc::new(callback)));

    Subscription {
      listeners: Arc::downgrade(&self.listeners),
      channel,
      id,
    }
  }

  /// Deliver `event` to everyone subscribed to its channel right now.
  pub fn publish(&self, event: &ModelEvent) {
    // Snapshot first so callbacks run without the registry locked.
    let callbacks: Vec<Callback> = self
      .listeners()
      .by_channel
      .get(&event.channel())
      .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
      .unwrap_or_default();

    for callback in callbacks {
      callback(event);
    }
  }

  pub fn subscriber_count(&self, channel: Channel) -> usize {
    self
      .listeners()
      .by_channel
      .get(&channel)
      .map(Vec::len)
      .unwrap_or(0)
  }
}

/// Capability to remove one registered callback
#[derive(Debug)]
pub struct Subscription {
  listeners: Weak<Mutex<Listeners>>,
  channel: Channel,
  id: u64,
}

impl Subscription {
  pub fn unsubscribe(self) {
    let Some(listeners) = self.listeners.upgrade() else {
      return;
    };
    let mut listeners = listeners.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(list) = listeners.by_channel.get_mut(&self.channel) {
      list.retain(|(id, _)| *id != self.id);
    }
  }
}
