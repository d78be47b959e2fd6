//! Bounded change queue and delivery worker.

use crate::{error::NotifierError, event::ChangeEvent};
use gateway_config::{HttpConfig, NotifierConfig};
use gateway_providers::HttpClient;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Result of handing an event to the notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Queued for delivery
    Queued,
    /// Notifier switched off
    Disabled,
    /// Path outside `/content` or a system node
    Filtered,
    /// Queue at capacity, event dropped
    QueueFull,
    /// Worker already stopped
    Closed,
}

/// Delivery counts reported when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Events answered with a 2xx status
    pub delivered: u64,
    /// Events that failed or were answered with another status
    pub failed: u64,
}

/// Cloneable producer side of the queue
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    sender: Option<mpsc::Sender<ChangeEvent>>,
}

impl NotifierHandle {
    /// Queue an event without waiting
    pub fn submit(&self, event: ChangeEvent) -> SubmitOutcome {
        let Some(sender) = &self.sender else {
            debug!(path = %event.path, "Notifier disabled, ignoring change");
            return SubmitOutcome::Disabled;
        };

        if !event.is_relevant() {
            debug!(path = %event.path, "Ignoring change outside content");
            return SubmitOutcome::Filtered;
        }

        match sender.try_send(event) {
            Ok(()) => SubmitOutcome::Queued,
            Err(TrySendError::Full(event)) => {
                warn!(path = %event.path, "Change queue full, dropping event");
                SubmitOutcome::QueueFull
            }
            Err(TrySendError::Closed(event)) => {
                warn!(path = %event.path, "Change notifier stopped, dropping event");
                SubmitOutcome::Closed
            }
        }
    }
}

/// Change notifier owning the delivery worker
#[derive(Debug)]
pub struct ChangeNotifier {
    handle: NotifierHandle,
    worker: Option<JoinHandle<DeliveryStats>>,
}

impl ChangeNotifier {
    /// Start the worker. Must be called inside a Tokio runtime.
    ///
    /// Returns a disabled notifier when `config.enabled` is false.
    ///
    /// # Errors
    /// Returns [`NotifierError::ZeroCapacity`] for an empty queue, or
    /// [`NotifierError::Client`] if the HTTP client cannot be built
    pub fn start(config: &NotifierConfig, http: &HttpConfig) -> Result<Self, NotifierError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        if config.queue_capacity == 0 {
            return Err(NotifierError::ZeroCapacity);
        }

        let client = HttpClient::new(http).map_err(|e| NotifierError::Client(e.to_string()))?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let worker = tokio::spawn(deliver(
            receiver,
            client,
            config.endpoint.clone(),
            config.timeout,
        ));

        info!(
            endpoint = %config.endpoint,
            capacity = config.queue_capacity,
            "Change notifier started"
        );

        Ok(Self {
            handle: NotifierHandle {
                sender: Some(sender),
            },
            worker: Some(worker),
        })
    }

    /// A notifier that accepts nothing
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            handle: NotifierHandle { sender: None },
            worker: None,
        }
    }

    /// Whether events are being delivered
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.worker.is_some()
    }

    /// Producer handle for other tasks
    #[must_use]
    pub fn handle(&self) -> NotifierHandle {
        self.handle.clone()
    }

    /// Queue an event without waiting
    pub fn submit(&self, event: ChangeEvent) -> SubmitOutcome {
        self.handle.submit(event)
    }

    /// Close the queue and wait for queued events to be delivered.
    ///
    /// The worker finishes once every [`NotifierHandle`] is dropped.
    pub async fn shutdown(self) -> DeliveryStats {
        let Self { handle, worker } = self;
        drop(handle);

        let Some(worker) = worker else {
            return DeliveryStats::default();
        };

        match worker.await {
            Ok(stats) => {
                info!(
                    delivered = stats.delivered,
                    failed = stats.failed,
                    "Change notifier stopped"
                );
                stats
            }
            Err(e) => {
                error!(error = %e, "Change notifier worker failed");
                DeliveryStats::default()
            }
        }
    }
}

async fn deliver(
    mut receiver: mpsc::Receiver<ChangeEvent>,
    client: HttpClient,
    endpoint: String,
    timeout: Duration,
) -> DeliveryStats {
    let mut stats = DeliveryStats::default();

    while let Some(event) = receiver.recv().await {
        match client
            .send_buffered(client.post_json(&endpoint, &event), timeout)
            .await
        {
            Ok(response) if response.status.is_success() => {
                stats.delivered += 1;
                info!(
                    path = %event.path,
                    status = response.status.as_u16(),
                    "Sent change to enrichment service"
                );
            }
            Ok(response) => {
                stats.failed += 1;
                warn!(
                    path = %event.path,
                    status = response.status.as_u16(),
                    "Enrichment service rejected change"
                );
            }
            Err(e) => {
                stats.failed += 1;
                error!(path = %event.path, error = %e, "Failed to send change to enrichment service");
            }
        }
    }

    stats
}
