//! Log notifications and the in-process notification channel
//!
//! The filtering engine reports tab lifecycle and filtering decisions as
//! [`LogEvent`]s. Consumers register a listener for the kinds they care
//! about and get back a [`ListenerId`] which is the only way to unregister.
//!
//! Delivery is synchronous on the caller's thread. A listener that is
//! removed while a dispatch is in progress receives nothing further, so a
//! torn-down page never observes a late notification.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::types::{FilteringEvent, TabInfo};

// =============================================================================
// Notifications
// =============================================================================

bitflags::bitflags! {
    /// Notification kinds a listener subscribes to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LogEventKinds: u8 {
        const TAB_ADDED = 1 << 0;
        const TAB_UPDATED = 1 << 1;
        const TAB_CLOSED = 1 << 2;
        const TAB_RESET = 1 << 3;
        const EVENT_ADDED = 1 << 4;

        /// Every kind
        const ALL = 0x1F;
    }
}

/// Notification emitted by the filtering engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    TabAdded { tab: TabInfo },
    TabUpdated { tab: TabInfo },
    TabClosed { tab: TabInfo },
    TabReset { tab: TabInfo },
    EventAdded { tab: TabInfo, event: FilteringEvent },
}

impl LogEvent {
    pub fn kind(&self) -> LogEventKinds {
        match self {
            Self::TabAdded { .. } => LogEventKinds::TAB_ADDED,
            Self::TabUpdated { .. } => LogEventKinds::TAB_UPDATED,
            Self::TabClosed { .. } => LogEventKinds::TAB_CLOSED,
            Self::TabReset { .. } => LogEventKinds::TAB_RESET,
            Self::EventAdded { .. } => LogEventKinds::EVENT_ADDED,
        }
    }

    /// Tab the notification refers to.
    pub fn tab(&self) -> &TabInfo {
        match self {
            Self::TabAdded { tab }
            | Self::TabUpdated { tab }
            | Self::TabClosed { tab }
            | Self::TabReset { tab }
            | Self::EventAdded { tab, .. } => tab,
        }
    }
}

// =============================================================================
// Channel
// =============================================================================

/// Listener callback.
pub type Listener = Box<dyn FnMut(&LogEvent)>;

/// Handle returned by listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Source of log notifications.
pub trait NotificationChannel {
    /// Register a listener for the given kinds.
    fn add_listener(&self, kinds: LogEventKinds, listener: Listener) -> ListenerId;

    /// Unregister a listener. Returns `false` if the id was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

struct Registration {
    id: ListenerId,
    kinds: LogEventKinds,
    listener: Rc<RefCell<Listener>>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Registration>,
}

/// In-process notification channel.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct EventNotifier {
    registry: Rc<RefCell<Registry>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.registry
            .borrow()
            .listeners
            .iter()
            .any(|r| r.id == id)
    }

    /// Deliver a notification to every listener subscribed to its kind.
    /// Returns the number of listeners that received it.
    pub fn notify(&self, event: &LogEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<(ListenerId, Rc<RefCell<Listener>>)> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .filter(|r| r.kinds.intersects(kind))
            .map(|r| (r.id, Rc::clone(&r.listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in targets {
            // An earlier listener in this dispatch may have unregistered it
            if !self.is_registered(id) {
                debug!("listener {:?} removed during dispatch, skipping {:?}", id, kind);
                continue;
            }
            match listener.try_borrow_mut() {
                Ok(mut callback) => {
                    let callback = &mut *callback;
                    callback(event);
                    delivered += 1;
                }
                Err(_) => warn!("listener {:?} re-entered, dropping {:?}", id, kind),
            }
        }
        delivered
    }
}

impl NotificationChannel for EventNotifier {
    fn add_listener(&self, kinds: LogEventKinds, listener: Listener) -> ListenerId {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry.listeners.push(Registration {
            id,
            kinds,
            listener: Rc::new(RefCell::new(listener)),
        });
        debug!("registered listener {:?} for {:?}", id, kinds);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let before = registry.listeners.len();
        registry.listeners.retain(|r| r.id != id);
        let removed = registry.listeners.len() != before;
        if removed {
            debug!("removed listener {:?}", id);
        }
        removed
    }
}
