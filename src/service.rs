// src/service.rs

//! The bot service: polls the gateway and runs one relay task per message.
//!
//! `BotService` is constructed once at startup and consumed by
//! [`BotService::start`], which hands back a [`ServiceHandle`] for stopping
//! it. Stopping is idempotent: the first `stop` flips a shared flag that the
//! poll loop and every in-flight worker watch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::BotSettings;
use crate::errors::{Error, Result};
use crate::gateway::ChatGateway;
use crate::relay::{Handled, Relay};
use crate::types::RequestId;

/// Timing knobs for the service loop.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub poll_retry_delay: Duration,
    pub shutdown_grace: Duration,
}

impl From<&BotSettings> for ServiceSettings {
    fn from(bot: &BotSettings) -> Self {
        Self {
            poll_retry_delay: bot.poll_retry_delay,
            shutdown_grace: bot.shutdown_grace,
        }
    }
}

pub struct BotService {
    gateway: Arc<dyn ChatGateway>,
    relay: Arc<Relay>,
    settings: ServiceSettings,
}

impl BotService {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        relay: Arc<Relay>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            gateway,
            relay,
            settings,
        }
    }

    /// Start polling in a background task.
    pub fn start(self) -> ServiceHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        info!("bot service started");
        ServiceHandle {
            stop_tx: Arc::new(stop_tx),
            task,
        }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        let mut flows: JoinSet<(RequestId, Handled)> = JoinSet::new();
        let mut next_id: RequestId = 0;

        loop {
            tokio::select! {
                _ = stop_requested(&mut stop) => break,

                polled = self.gateway.poll_events() => match polled {
                    Ok(events) => {
                        for event in events {
                            next_id += 1;
                            let request_id = next_id;
                            debug!(request_id, chat_id = event.chat(), "dispatching inbound event");

                            let relay = Arc::clone(&self.relay);
                            let shutdown = stop.clone();
                            flows.spawn(async move {
                                (request_id, relay.handle(request_id, event, shutdown).await)
                            });
                        }
                    }
                    Err(err) => {
                        warn!(
                            error = %err,
                            retry_in = ?self.settings.poll_retry_delay,
                            "polling the chat gateway failed"
                        );
                        tokio::select! {
                            _ = stop_requested(&mut stop) => break,
                            _ = sleep(self.settings.poll_retry_delay) => {}
                        }
                    }
                },
            }

            while let Some(joined) = flows.try_join_next() {
                log_finished(joined);
            }
        }

        info!(in_flight = flows.len(), "bot service stopping");
        self.drain(flows).await;
        info!("bot service stopped");
    }

    /// Wait for in-flight requests; abort whatever outlives the grace period.
    async fn drain(&self, mut flows: JoinSet<(RequestId, Handled)>) {
        let wait_all = async {
            while let Some(joined) = flows.join_next().await {
                log_finished(joined);
            }
        };

        if tokio::time::timeout(self.settings.shutdown_grace, wait_all)
            .await
            .is_err()
        {
            warn!(
                grace = ?self.settings.shutdown_grace,
                "requests still running after shutdown grace; aborting"
            );
            flows.shutdown().await;
        }
    }
}

/// Resolves once a stop was requested. Never resolves if every sender is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn log_finished(joined: std::result::Result<(RequestId, Handled), tokio::task::JoinError>) {
    match joined {
        Ok((request_id, handled)) => debug!(request_id, ?handled, "request task finished"),
        Err(e) if e.is_cancelled() => debug!("request task cancelled"),
        Err(e) => error!(error = %e, "request task panicked"),
    }
}

/// Handle to a running [`BotService`].
#[derive(Debug)]
pub struct ServiceHandle {
    stop_tx: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

/// Cloneable trigger for stopping the service, e.g. from a signal listener.
#[derive(Debug, Clone)]
pub struct StopSignal {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    /// Request a stop. Returns true for the first request only.
    pub fn stop(&self) -> bool {
        self.stop_tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }
}

impl ServiceHandle {
    pub fn stop_signal(&self) -> StopSignal {
        StopSignal {
            stop_tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Request a stop. Returns true for the first request only.
    pub fn stop(&self) -> bool {
        self.stop_signal().stop()
    }

    /// Wait until the service loop has finished.
    pub async fn stopped(self) -> Result<()> {
        self.task.await.map_err(Error::from)?;
        Ok(())
    }

    /// Stop and wait.
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        self.stopped().await
    }
}
