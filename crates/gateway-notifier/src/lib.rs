//! # Gateway Notifier
//!
//! Sends content change events to the enrichment service so the context
//! index stays current.
//!
//! Events go through a bounded queue drained by a single worker. Producers
//! never block: when the queue is full the event is dropped and logged.
//! Delivery is fire-and-forget.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod notifier;
pub mod watcher;

pub use error::NotifierError;
pub use event::{is_content_path, ChangeEvent, ChangeKind, CONTENT_ROOT};
pub use notifier::{ChangeNotifier, DeliveryStats, NotifierHandle, SubmitOutcome};
pub use watcher::ContentWatcher;
