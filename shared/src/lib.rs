pub mod coalescer;
pub mod protocol;
pub mod store;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use coalescer::{
    ConnectionState, QueryCoalescer, RECONNECT_DELAY, Reaction, SubmitOutcome, Transport,
    TransportError, TransportEvent,
};
pub use protocol::{CoordinateError, QueryError, ReplyError, RouteQuery, RouteReply};
pub use store::{WaypointRole, WaypointSource, WaypointStore};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Strict bounds: the poles and the antimeridian themselves are rejected.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && self.lat > -90.0
            && self.lat < 90.0
            && self.lon > -180.0
            && self.lon < 180.0
    }
}

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9090;

/// Address of the routing server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
