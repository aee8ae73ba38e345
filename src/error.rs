// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;

/// Error conditions reported by route creation, navigation and route/profile
/// (de)serialization.
///
/// None of these are fatal: a failed operation leaves any previously installed
/// [Route](crate::Route) and the [Navigator](crate::Navigator) state untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The router found no connecting edges, or the [Profile](crate::Profile)
    /// does not accept any of the roads it would need.
    #[error("no route")]
    NoRoute,

    /// The start of the route could not be matched to any routable road.
    #[error("no roads near start of route")]
    NoRoadsNearStartOfRoute,

    /// The end (or an intermediate waypoint) of the route could not be matched
    /// to any routable road.
    #[error("no roads near end of route")]
    NoRoadsNearEndOfRoute,

    /// The start and the end of the route lie in disconnected parts of the road network.
    #[error("start and end of route are not connected")]
    NoRouteConnectivity,

    /// Turn or position information was requested while not navigating.
    #[error("not navigating")]
    NotNavigating,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An asynchronous request was canceled, or superseded by a newer request.
    #[error("canceled")]
    Cancel,

    /// An asynchronous route request is already outstanding.
    #[error("busy: a route request is already outstanding")]
    Busy,

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("xml: {0}")]
    Xml(String),

    #[error("{element}.{attribute}: invalid value {value:?}")]
    Parse {
        element: String,
        attribute: String,
        value: String,
    },
}

impl Error {
    /// Returns true for [Error::Cancel], which callers that asked for cancellation
    /// (or superseded a request) should not treat as a failure.
    pub fn is_cancel(&self) -> bool {
        matches!(self, Self::Cancel)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for Error {
    fn from(e: quick_xml::escape::EscapeError) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(e: std::str::Utf8Error) -> Self {
        Error::Xml(e.to_string())
    }
}
