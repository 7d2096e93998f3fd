use std::{ffi::c_int, net::SocketAddr};

use nix::errno::Errno;
use thiserror::Error;

/// Why name resolution did not produce any candidate addresses.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("address lookup failed: {message} (code {code})")]
    Lookup { code: c_int, message: String },
    #[error("address lookup failed: {0}")]
    System(
        #[from]
        #[source]
        Errno,
    ),
    #[error("address lookup returned no usable addresses")]
    Empty,
}

/// The ways [super::connect_to_host] can fail. When several candidate addresses were tried only
/// the failure of the last one is reported.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("a port must be given when no service is")]
    MissingPort,
    #[error("failed to resolve address: {0}")]
    AddressResolutionFailed(
        #[from]
        #[source]
        ResolveError,
    ),
    #[error("failed to create socket: {0}")]
    SocketCreationFailed(#[source] Errno),
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: Errno,
    },
}

impl ConnectError {
    /// The integer code the C entry points return for this error.
    pub fn code(&self) -> c_int {
        use ConnectError::*;
        match self {
            AddressResolutionFailed(..) => -1,
            SocketCreationFailed(..) => -2,
            ConnectFailed { .. } => -3,
            MissingPort => -4,
        }
    }
}

/// The ways [super::listen_on] can fail.
#[derive(Debug, Error)]
pub enum ListenError {
    #[error("failed to construct listen address from {literal:?}: {reason}")]
    AddressConstructionFailed { literal: String, reason: String },
    #[error("failed to create socket: {0}")]
    SocketCreationFailed(#[source] Errno),
    #[error("failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: Errno,
    },
    #[error("failed to listen: {0}")]
    ListenFailed(#[source] Errno),
}

impl ListenError {
    /// The integer code the C entry points return for this error.
    pub fn code(&self) -> c_int {
        use ListenError::*;
        match self {
            AddressConstructionFailed { .. } => -1,
            SocketCreationFailed(..) => -2,
            BindFailed { .. } => -3,
            ListenFailed(..) => -4,
        }
    }
}

/// The ways [super::accept] can fail.
#[derive(Debug, Error)]
pub enum AcceptError {
    #[error("failed to accept connection: {0}")]
    AcceptFailed(#[source] Errno),
    #[error("peer address length {reported} exceeds the expected {expected} bytes")]
    InvalidAddressLength { reported: u32, expected: u32 },
}

impl AcceptError {
    /// The integer code the C entry points return for this error.
    pub fn code(&self) -> c_int {
        -1
    }
}
