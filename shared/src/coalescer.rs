//! Query coalescing over an auto-reconnecting socket.
//!
//! At most one query is in flight at any time. Edits made while a query is
//! pending collapse into a single queued message holding the latest state,
//! which goes out as soon as the server answers. The coalescer performs no
//! I/O of its own: drivers hand it a [`Transport`] and feed it the
//! [`TransportEvent`]s that transport produces, and they arm the reconnect
//! timer it asks for.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::{QueryError, ReplyError, RouteQuery, RouteReply};
use crate::store::WaypointSource;
use crate::{Coordinate, Endpoint};

/// Fixed delay between a close and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    /// Clean close, network drop, or a failed connection attempt.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("sockets are not available in this environment: {0}")]
    Unsupported(String),
    #[error("no open session")]
    NotOpen,
    #[error("failed to send query: {0}")]
    Send(String),
}

/// Message-oriented duplex channel to the routing server.
///
/// Implementations report the outcome of `open` and everything received
/// afterwards as [`TransportEvent`]s. An `Err` from `open` means the
/// environment cannot open sockets at all; a connection attempt that merely
/// fails must surface as [`TransportEvent::Closed`] instead.
pub trait Transport {
    fn open(&mut self, endpoint: &Endpoint) -> Result<(), TransportError>;
    fn send(&mut self, text: &str) -> Result<(), TransportError>;
}

/// What a driver should do after feeding an event to the coalescer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// Session is open; drivers resubmit the current waypoints.
    Connected,
    /// Replace the rendered polyline.
    Route(Vec<Coordinate>),
    /// The server rejected the query. The polyline stays as it is.
    ServerError(String),
    MalformedReply(ReplyError),
    /// Arm a timer and call [`QueryCoalescer::reconnect`] when it fires.
    Reconnect { after: Duration },
    /// Closed before any endpoint was known; nothing to retry.
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Sent,
    Queued,
    Unchanged,
    NotConnected,
    Rejected(QueryError),
    TransportFailed(TransportError),
}

#[derive(Debug)]
pub struct QueryCoalescer {
    state: ConnectionState,
    endpoint: Option<Endpoint>,
    pending: Option<String>,
    queued: Option<String>,
    last_sent: Option<String>,
    reconnect_delay: Duration,
}

impl Default for QueryCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCoalescer {
    pub fn new() -> Self {
        Self::with_reconnect_delay(RECONNECT_DELAY)
    }

    pub fn with_reconnect_delay(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            endpoint: None,
            pending: None,
            queued: None,
            last_sent: None,
            reconnect_delay,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn queued(&self) -> Option<&str> {
        self.queued.as_deref()
    }

    pub fn last_sent(&self) -> Option<&str> {
        self.last_sent.as_deref()
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn connect<T: Transport + ?Sized>(
        &mut self,
        endpoint: Endpoint,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        tracing::info!("connecting to routing server at {}", endpoint.url());
        self.state = ConnectionState::Connecting;
        let opened = transport.open(&endpoint);
        self.endpoint = Some(endpoint);

        if let Err(err) = opened {
            tracing::error!("cannot open a connection: {err}");
            self.state = ConnectionState::Disconnected;
            return Err(err);
        }
        Ok(())
    }

    /// Reopens the endpoint of the last [`connect`](Self::connect) call.
    pub fn reconnect<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        match self.endpoint.clone() {
            Some(endpoint) => self.connect(endpoint, transport),
            None => {
                tracing::debug!("reconnect requested before any endpoint was known");
                Ok(())
            }
        }
    }

    pub fn handle<T: Transport + ?Sized>(
        &mut self,
        event: TransportEvent,
        transport: &mut T,
    ) -> Reaction {
        match event {
            TransportEvent::Opened => {
                tracing::info!("connected to the server");
                self.state = ConnectionState::Open;
                self.pending = None;
                self.queued = None;
                self.last_sent = None;
                Reaction::Connected
            }
            TransportEvent::Message(payload) => {
                self.acknowledge(transport);
                Self::decode(&payload)
            }
            TransportEvent::Closed => {
                self.state = ConnectionState::Disconnected;
                self.pending = None;
                self.queued = None;
                if self.endpoint.is_none() {
                    return Reaction::Disconnected;
                }
                tracing::warn!(
                    "connection closed, retrying in {} ms",
                    self.reconnect_delay.as_millis()
                );
                Reaction::Reconnect {
                    after: self.reconnect_delay,
                }
            }
        }
    }

    /// Builds a query from the current waypoints and sends or queues it.
    pub fn submit<S, T>(&mut self, source: &S, transport: &mut T) -> SubmitOutcome
    where
        S: WaypointSource + ?Sized,
        T: Transport + ?Sized,
    {
        let query = match RouteQuery::build(source) {
            Ok(query) => query,
            Err(err) => {
                tracing::debug!("query not sent: {err}");
                return SubmitOutcome::Rejected(err);
            }
        };

        if self.state != ConnectionState::Open {
            return SubmitOutcome::NotConnected;
        }

        let message = query.into_string();

        if self.pending.is_some() {
            self.queued = Some(message);
            return SubmitOutcome::Queued;
        }

        if self.last_sent.as_deref() == Some(message.as_str()) {
            return SubmitOutcome::Unchanged;
        }

        self.dispatch(message, transport)
    }

    fn acknowledge<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        if self.pending.take().is_none() {
            return;
        }
        if let Some(message) = self.queued.take() {
            tracing::debug!("sending coalesced query");
            self.dispatch(message, transport);
        }
    }

    fn dispatch<T: Transport + ?Sized>(
        &mut self,
        message: String,
        transport: &mut T,
    ) -> SubmitOutcome {
        match transport.send(&message) {
            Ok(()) => {
                tracing::debug!("query sent: {}", message.trim_end());
                self.pending = Some(message.clone());
                self.last_sent = Some(message);
                SubmitOutcome::Sent
            }
            Err(err) => {
                tracing::warn!("failed to send query: {err}");
                SubmitOutcome::TransportFailed(err)
            }
        }
    }

    fn decode(payload: &str) -> Reaction {
        match RouteReply::parse(payload) {
            Ok(RouteReply::Route(path)) => {
                tracing::debug!("route received with {} points", path.len());
                Reaction::Route(path)
            }
            Ok(RouteReply::ServerError(message)) => {
                tracing::warn!("{message}");
                Reaction::ServerError(message)
            }
            Err(err) => {
                tracing::warn!("ignoring malformed reply: {err}");
                Reaction::MalformedReply(err)
            }
        }
    }
}
