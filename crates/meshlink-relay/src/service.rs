// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subscription loop tying the bus, router, hub and mission pool together.

use std::future::Future;
use std::sync::Arc;

use meshlink_bus::{BusError, BusMessage, MessageBus, Subscription};
use meshlink_missions::{MissionError, MissionPool, MissionReport, MissionTicket};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::{BroadcastReport, Hub};
use crate::router::{RouteError, Routed, Router};

/// Why one bus message had no effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Routing rejected the message.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// The pool refused the mission.
    #[error("mission not queued: {0}")]
    Queue(#[from] MissionError),
}

/// Effect of one bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Command fanned out to sessions.
    Broadcast(BroadcastReport),
    /// Mission accepted by the pool.
    Queued(MissionTicket),
}

/// Relays bus messages to sessions and missions.
#[derive(Debug)]
pub struct RelayService<B> {
    bus: Arc<B>,
    hub: Hub,
    router: Router,
    pool: Arc<MissionPool>,
}

impl<B: MessageBus> RelayService<B> {
    /// Assembles a service from its parts.
    pub fn new(bus: Arc<B>, hub: Hub, router: Router, pool: Arc<MissionPool>) -> Self {
        Self {
            bus,
            hub,
            router,
            pool,
        }
    }

    /// Session hub fed by this service.
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Subscribes to the whole namespace.
    pub async fn subscribe(&self) -> Result<Subscription, BusError> {
        let sub = self.bus.subscribe(&self.router.subscription()).await?;
        info!(pattern = %sub.pattern(), "relay subscribed");
        Ok(sub)
    }

    /// Routes one message and applies the result.
    pub async fn dispatch(&self, msg: &BusMessage) -> Result<Dispatched, DispatchError> {
        match self.router.route(&msg.subject, &msg.payload)? {
            Routed::Broadcast(payload) => {
                Ok(Dispatched::Broadcast(self.hub.broadcast(payload).await))
            }
            Routed::Mission(work) => Ok(Dispatched::Queued(self.pool.enqueue(work)?)),
        }
    }

    /// Handles messages from `sub` until `shutdown` fires or the bus goes away.
    pub async fn serve(
        &self,
        mut sub: Subscription,
        shutdown: CancellationToken,
    ) -> Result<(), BusError> {
        loop {
            let msg = tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    debug!("relay loop stopping");
                    return Ok(());
                }
                msg = sub.next() => msg,
            };
            let Some(msg) = msg else {
                warn!(pattern = %sub.pattern(), "bus subscription ended");
                return Err(BusError::Closed);
            };
            match self.dispatch(&msg).await {
                Ok(Dispatched::Broadcast(report)) => {
                    if report.evicted > 0 {
                        warn!(
                            subject = %msg.subject,
                            evicted = report.evicted,
                            "evicted slow sessions"
                        );
                    }
                    debug!(subject = %msg.subject, delivered = report.delivered, "broadcast");
                }
                Ok(Dispatched::Queued(ticket)) => {
                    info!(subject = %msg.subject, mission = ticket.id, "mission queued");
                }
                Err(DispatchError::Route(RouteError::UnknownSubject(subject))) => {
                    debug!(%subject, "no route; dropped");
                }
                Err(err) => warn!(subject = %msg.subject, %err, "message dropped"),
            }
        }
    }

    /// Subscribes, then serves until shutdown.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), BusError> {
        let sub = self.subscribe().await?;
        self.serve(sub, shutdown).await
    }
}

/// Spawns `task` and cancels `shutdown` once it ends, including by panic.
pub fn spawn_linked<F>(shutdown: CancellationToken, task: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(async move {
        let _cancel_on_exit = shutdown.drop_guard();
        task.await
    })
}

/// Logs mission outcomes until the pool is drained or `shutdown` fires.
pub async fn log_reports(pool: Arc<MissionPool>, shutdown: CancellationToken) {
    loop {
        let report = tokio::select! {
            () = shutdown.cancelled() => break,
            report = pool.next_report() => report,
        };
        match report {
            Some(MissionReport::Completed { ticket, path, emitted }) => {
                info!(mission = ticket.id, %path, emitted, "mission completed");
            }
            Some(MissionReport::Cancelled { ticket, path, emitted }) => {
                info!(mission = ticket.id, %path, emitted, "mission cancelled");
            }
            Some(MissionReport::Failed { ticket, path, error }) => {
                warn!(mission = ticket.id, %path, %error, "mission failed");
            }
            None => break,
        }
    }
}
