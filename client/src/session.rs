//! The native event loop.
//!
//! A [`Session`] owns the waypoint store, the coalescer and the socket
//! transport, and is the only place their state changes. Transport events,
//! the reconnect timer and console lines are multiplexed with `select!` in
//! a single task.

use shared::{
    Coordinate, QueryCoalescer, Reaction, SubmitOutcome, TransportEvent, WaypointStore,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::ClientConfig;
use crate::console::{Command, render_slots};
use crate::error::ClientError;
use crate::transport::WsTransport;

/// Everything a session reports to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    Submitted(SubmitOutcome),
    Route(Vec<Coordinate>),
    ServerError(String),
    Slots(String),
    CommandFailed(String),
}

pub struct Session {
    config: ClientConfig,
    store: WaypointStore,
    coalescer: QueryCoalescer,
    transport: WsTransport,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    updates: mpsc::UnboundedSender<SessionEvent>,
}

impl Session {
    pub fn new(config: ClientConfig, updates: mpsc::UnboundedSender<SessionEvent>) -> Self {
        let (transport, events) = WsTransport::channel();
        Self {
            coalescer: QueryCoalescer::with_reconnect_delay(config.reconnect_delay),
            config,
            store: WaypointStore::new(),
            transport,
            events,
            updates,
        }
    }

    /// Runs until the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<String>) -> Result<(), ClientError> {
        self.coalescer
            .connect(self.config.endpoint.clone(), &mut self.transport)?;

        let mut reconnect_at: Option<Instant> = None;
        loop {
            let retry = async move {
                match reconnect_at {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                Some(event) = self.events.recv() => {
                    if let Some(deadline) = self.on_transport_event(event) {
                        reconnect_at = Some(deadline);
                    }
                }
                () = retry => {
                    reconnect_at = None;
                    self.coalescer.reconnect(&mut self.transport)?;
                }
                line = commands.recv() => match line {
                    Some(line) => self.on_command(&line),
                    None => break,
                },
            }
        }

        tracing::info!("console input closed, stopping");
        Ok(())
    }

    fn on_transport_event(&mut self, event: TransportEvent) -> Option<Instant> {
        match self.coalescer.handle(event, &mut self.transport) {
            Reaction::Connected => {
                self.emit(SessionEvent::Connected);
                // Whatever was pending on the old socket may be lost.
                self.submit();
            }
            Reaction::Route(path) => self.emit(SessionEvent::Route(path)),
            Reaction::ServerError(message) => self.emit(SessionEvent::ServerError(message)),
            Reaction::MalformedReply(_) => {}
            Reaction::Reconnect { after } => {
                self.emit(SessionEvent::Disconnected);
                return Some(Instant::now() + after);
            }
            Reaction::Disconnected => self.emit(SessionEvent::Disconnected),
        }
        None
    }

    fn on_command(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!("rejected command `{}`: {err}", line.trim());
                self.emit(SessionEvent::CommandFailed(err.to_string()));
                return;
            }
        };

        if let Err(err) = command.apply(&mut self.store) {
            tracing::warn!("rejected command `{}`: {err}", line.trim());
            self.emit(SessionEvent::CommandFailed(err.to_string()));
            return;
        }

        if command.is_mutating() {
            self.submit();
        } else {
            self.emit(SessionEvent::Slots(render_slots(&self.store)));
        }
    }

    fn submit(&mut self) {
        let outcome = self.coalescer.submit(&self.store, &mut self.transport);
        tracing::debug!("submit: {outcome:?}");
        self.emit(SessionEvent::Submitted(outcome));
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.updates.send(event);
    }
}
