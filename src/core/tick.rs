use std::collections::BTreeMap;

use crate::decimal::Decimal;
use crate::model::LayerId;
use crate::reactive::Memo;

use super::resource_store::Resource;
use super::simulation::Simulation;

/// Event published once per frame with the elapsed seconds.
pub const UPDATE_EVENT: &str = "update";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

pub type TickCallback = Box<dyn FnMut(&mut Simulation, f64)>;

pub enum TickHandler {
    /// `target += rate * delta`.
    Accrue {
        target: Resource,
        rate: Memo<Decimal>,
    },
    Custom(TickCallback),
}

pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    pub(crate) owner: Option<LayerId>,
    pub(crate) handler: TickHandler,
}

/// Subscribers taken out for one `publish` call, plus the ones among them
/// that were unsubscribed before their turn.
struct Delivery {
    taken: Vec<SubscriptionId>,
    cancelled: Vec<SubscriptionId>,
}

/// Ordered subscriber lists keyed by event name.
#[derive(Default)]
pub struct TickBus {
    channels: BTreeMap<&'static str, Vec<Subscriber>>,
    next_id: u64,
    in_flight: Vec<Delivery>,
}

impl TickBus {
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.channels.get(event).map_or(0, Vec::len)
    }

    pub fn subscriptions_of(&self, owner: LayerId) -> Vec<SubscriptionId> {
        self.channels
            .values()
            .flatten()
            .filter(|subscriber| subscriber.owner == Some(owner))
            .map(|subscriber| subscriber.id)
            .collect()
    }

    pub(crate) fn subscribe(
        &mut self,
        event: &'static str,
        owner: Option<LayerId>,
        handler: TickHandler,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.channels.entry(event).or_default().push(Subscriber {
            id,
            owner,
            handler,
        });
        id
    }

    /// Removes a subscription. One that is taken out by a delivery in flight
    /// is skipped by that delivery and dropped when it finishes. Unknown ids
    /// return `false` and leave no trace.
    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for subscribers in self.channels.values_mut() {
            if let Some(position) = subscribers.iter().position(|entry| entry.id == id) {
                subscribers.remove(position);
                return true;
            }
        }
        let Some(delivery) = self
            .in_flight
            .iter_mut()
            .find(|delivery| delivery.taken.contains(&id))
        else {
            return false;
        };
        if delivery.cancelled.contains(&id) {
            return false;
        }
        delivery.cancelled.push(id);
        true
    }

    /// Whether the innermost delivery should skip `id`.
    pub(crate) fn is_cancelled(&self, id: SubscriptionId) -> bool {
        self.in_flight
            .last()
            .is_some_and(|delivery| delivery.cancelled.contains(&id))
    }

    pub(crate) fn take(&mut self, event: &'static str) -> Vec<Subscriber> {
        let subscribers = self.channels.remove(event).unwrap_or_default();
        self.in_flight.push(Delivery {
            taken: subscribers.iter().map(|subscriber| subscriber.id).collect(),
            cancelled: Vec::new(),
        });
        subscribers
    }

    /// Ends the innermost delivery. Delivered subscribers go back ahead of
    /// any that subscribed meanwhile.
    pub(crate) fn restore(&mut self, event: &'static str, mut delivered: Vec<Subscriber>) {
        if let Some(delivery) = self.in_flight.pop() {
            delivered.retain(|subscriber| !delivery.cancelled.contains(&subscriber.id));
        }
        if let Some(added) = self.channels.remove(event) {
            delivered.extend(added);
        }
        if !delivered.is_empty() {
            self.channels.insert(event, delivered);
        }
    }
}
