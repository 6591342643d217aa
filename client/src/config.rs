use std::time::Duration;

use shared::{Endpoint, RECONNECT_DELAY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub reconnect_delay: Duration,
    /// Print routes as JSON arrays instead of one point per line.
    pub json: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            reconnect_delay: RECONNECT_DELAY,
            json: false,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}
