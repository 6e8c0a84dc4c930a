//! Periodic removal of expired tickets

use crate::registry::TicketRegistry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use ticketry_core::{Error, Result};
use ticketry_utils::tracing::cleaner_span;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct CleanerOptions {
    /// Zero disables the schedule
    pub interval: Duration,
    pub startup_delay: Duration,
    /// Skip passes when the backend expires entries by itself
    pub delegate_to_native_expiry: bool,
}

impl Default for CleanerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(120),
            startup_delay: Duration::from_secs(15),
            delegate_to_native_expiry: false,
        }
    }
}

/// Deletes every ticket whose policy says it is expired
pub struct RegistryCleaner {
    registry: Arc<dyn TicketRegistry>,
    options: CleanerOptions,
    running: Mutex<()>,
}

impl RegistryCleaner {
    pub fn new(registry: Arc<dyn TicketRegistry>, options: CleanerOptions) -> Self {
        Self {
            registry,
            options,
            running: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &CleanerOptions {
        &self.options
    }

    pub async fn clean(&self) -> Result<usize> {
        self.clean_at(Utc::now()).await
    }

    /// One pass evaluated at `now`, returning how many tickets were removed.
    ///
    /// A pass that finds another one still running does nothing.
    pub async fn clean_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::debug!("previous cleaner pass still running, skipping");
            return Ok(0);
        };

        let backend = self.registry.backend();
        if self.options.delegate_to_native_expiry && backend.native_expiry {
            tracing::debug!(backend = backend.name, "expiry delegated to the backend");
            return Ok(0);
        }

        async {
            let tickets = self.registry.get_tickets().await?;
            let scanned = tickets.len();
            let mut removed = 0;
            for ticket in tickets.iter().filter(|ticket| ticket.is_expired_at(now)) {
                match self.registry.delete_ticket(ticket.id()).await {
                    Ok(true) => removed += 1,
                    // already gone, e.g. with an expired parent
                    Ok(false) => {}
                    Err(error) => {
                        tracing::warn!(
                            ticket_id = %ticket.id(),
                            error = %error,
                            "failed to delete expired ticket"
                        );
                    }
                }
            }
            if removed > 0 {
                tracing::info!(scanned, removed, "removed expired tickets");
            } else {
                tracing::debug!(scanned, "no expired tickets found");
            }
            Ok::<_, Error>(removed)
        }
        .instrument(cleaner_span(backend.name))
        .await
    }

    /// Run [`RegistryCleaner::clean`] on the configured schedule
    pub fn start(self: Arc<Self>) -> CleanerHandle {
        let interval = self.options.interval;
        if interval.is_zero() {
            tracing::info!("registry cleaner disabled");
            return CleanerHandle::disabled();
        }

        let start = tokio::time::Instant::now() + self.options.startup_delay;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if let Err(e) = self.clean().await {
                    tracing::warn!("Registry cleaner error: {}", e);
                }
            }
        });

        CleanerHandle {
            handle: Some(handle),
        }
    }
}

/// Owner of the scheduled cleaner task; dropping it stops the schedule
#[derive(Debug)]
pub struct CleanerHandle {
    handle: Option<JoinHandle<()>>,
}

impl CleanerHandle {
    pub(crate) fn disabled() -> Self {
        Self { handle: None }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for CleanerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
