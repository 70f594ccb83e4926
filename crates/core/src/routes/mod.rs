//! Where a published event goes: one [`Route`] per subscriber input.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    events::EnrichedEvent,
    queues::{BacklogQueue, FifoDropOldestQueue, IsolatedForwarder},
};

/// Routes keyed by event type.
pub struct Routes {
    pub table: HashMap<&'static str, Vec<Route>>,
}

impl Routes {
    pub fn for_event(&self, event_type: &str) -> Option<&[Route]> {
        self.table.get(event_type).map(Vec::as_slice)
    }

    /// Events lost on the way to `subscriber_id`, summed over its inputs.
    pub fn drops_for(&self, subscriber_id: &str) -> u64 {
        self.table
            .values()
            .flatten()
            .filter(|r| r.subscriber_id == subscriber_id)
            .map(Route::drops)
            .sum()
    }
}

pub struct Route {
    pub subscriber_id: &'static str,
    pub inbox: RouteInbox,
    pub drops_total: Arc<AtomicU64>,
}

impl Route {
    /// Hand `event` to the subscriber. Returns `false` and counts a drop when
    /// the inbox lost an event doing so.
    pub fn deliver(&self, event: Arc<EnrichedEvent>) -> bool {
        let delivered = match &self.inbox {
            RouteInbox::Backlog(q) => q.push(event),
            RouteInbox::FifoDropOldest(q) => q.push_overwrite(event),
            RouteInbox::Isolated(fwd) => fwd.try_send(event).is_ok(),
        };
        if !delivered {
            self.drops_total.fetch_add(1, Ordering::Relaxed);
        }
        delivered
    }

    pub fn drops(&self) -> u64 {
        self.drops_total.load(Ordering::Relaxed)
    }
}

pub enum RouteInbox {
    Backlog(BacklogQueue<Arc<EnrichedEvent>>),
    FifoDropOldest(Arc<FifoDropOldestQueue<Arc<EnrichedEvent>>>),
    Isolated(IsolatedForwarder<Arc<EnrichedEvent>>),
}
