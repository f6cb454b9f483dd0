//! Filtering Log Core Library
//!
//! This crate holds the data model behind the filtering log page: the per-tab
//! record of filtering decisions reported by the filtering engine, and the
//! client-side search that hides and shows those records.
//!
//! # Architecture
//!
//! Everything here is single-threaded and synchronous. The filtering engine
//! pushes notifications through a [`NotificationChannel`]; whoever listens
//! applies them to a [`TabEventStore`] and evaluates [`SearchCriteria`] over
//! the stored events. Nothing in this crate renders anything.
//!
//! # Modules
//!
//! - `types`: Tab, event and rule records plus request type vocabulary
//! - `url`: Allocation-free URL slicing helpers
//! - `store`: Per-tab append-only event store
//! - `search`: Search criteria and the row predicate
//! - `notifier`: Log notifications and the in-process listener registry

pub mod notifier;
pub mod search;
pub mod store;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use notifier::{EventNotifier, ListenerId, LogEvent, LogEventKinds, NotificationChannel};
pub use search::SearchCriteria;
pub use store::{StoreChange, TabEventStore};
pub use types::{FilterId, FilteringEvent, MatchedRule, RequestType, RequestTypes, TabId, TabInfo};
