//! Text wire format spoken with the routing server.
//!
//! Requests are the waypoint coordinates as space separated decimals, two
//! per waypoint and each followed by a space:
//!
//! ```text
//! 38.004697 23.800735 38.01 23.81
//! ```
//!
//! Replies are either an error line starting with `Error`, or the route
//! polyline in the same pairwise number format.

use std::fmt;

use thiserror::Error;

use crate::Coordinate;
use crate::store::WaypointSource;

/// Replies starting with this literal are error notifications.
pub const ERROR_PREFIX: &str = "Error";

/// Fractional digits used when a map interaction fills an input.
pub const DISPLAY_PRECISION: usize = 7;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("expected a latitude and a longitude, found {0} token(s)")]
    TokenCount(usize),
    #[error("`{0}` is not a number")]
    NotNumeric(String),
    #[error("({lat}, {lon}) is outside the coordinate domain")]
    OutOfRange { lat: f64, lon: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("waypoint {index} holds an invalid coordinate ({lat}, {lon})")]
    InvalidSlot { index: usize, lat: f64, lon: f64 },
    #[error("a route needs at least two waypoints, found {0}")]
    TooFewPoints(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplyError {
    #[error("token {position} of the reply (`{token}`) is not a number")]
    NotNumeric { position: usize, token: String },
}

/// Formats a coordinate the way it is written into a waypoint input.
pub fn format_coordinate(coord: Coordinate) -> String {
    format!(
        "{:.prec$} {:.prec$}",
        coord.lat,
        coord.lon,
        prec = DISPLAY_PRECISION
    )
}

/// Parses the text of a waypoint input: exactly two whitespace separated
/// numbers inside the coordinate domain.
pub fn parse_coordinate_text(text: &str) -> Result<Coordinate, CoordinateError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(CoordinateError::TokenCount(tokens.len()));
    }

    let lat = parse_number(tokens[0]).ok_or_else(|| CoordinateError::NotNumeric(tokens[0].into()))?;
    let lon = parse_number(tokens[1]).ok_or_else(|| CoordinateError::NotNumeric(tokens[1].into()))?;

    let coord = Coordinate { lat, lon };
    if !coord.is_valid() {
        return Err(CoordinateError::OutOfRange { lat, lon });
    }
    Ok(coord)
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// A serialized route request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuery {
    text: String,
    points: usize,
}

impl RouteQuery {
    /// Scans the waypoint slots in order, skipping empty ones.
    ///
    /// Fails on the first slot holding an invalid coordinate, so a query
    /// is never built from a half-edited waypoint list.
    pub fn build<S: WaypointSource + ?Sized>(source: &S) -> Result<Self, QueryError> {
        let mut text = String::new();
        let mut points = 0;

        for index in 0..source.count() {
            let Some(coord) = source.get(index) else {
                continue;
            };
            if !coord.is_valid() {
                return Err(QueryError::InvalidSlot {
                    index,
                    lat: coord.lat,
                    lon: coord.lon,
                });
            }
            text.push_str(&format!("{} {} ", coord.lat, coord.lon));
            points += 1;
        }

        if points < 2 {
            return Err(QueryError::TooFewPoints(points));
        }

        Ok(Self { text, points })
    }

    pub fn point_count(&self) -> usize {
        self.points
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for RouteQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A decoded server reply.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteReply {
    Route(Vec<Coordinate>),
    ServerError(String),
}

impl RouteReply {
    /// A trailing unpaired number is ignored.
    pub fn parse(payload: &str) -> Result<Self, ReplyError> {
        if payload.starts_with(ERROR_PREFIX) {
            return Ok(Self::ServerError(payload.to_string()));
        }

        let tokens: Vec<&str> = payload.split_whitespace().collect();
        let mut path = Vec::with_capacity(tokens.len() / 2);

        for (pair_index, pair) in tokens.chunks_exact(2).enumerate() {
            let position = pair_index * 2;
            let lat = parse_number(pair[0]).ok_or_else(|| ReplyError::NotNumeric {
                position,
                token: pair[0].to_string(),
            })?;
            let lon = parse_number(pair[1]).ok_or_else(|| ReplyError::NotNumeric {
                position: position + 1,
                token: pair[1].to_string(),
            })?;
            path.push(Coordinate { lat, lon });
        }

        Ok(Self::Route(path))
    }
}
