//! The [self] module holds the socket operations themselves. Every operation is a single blocking
//! call that runs to completion before returning, there is no event loop and nothing is
//! multiplexed.
//!
//! The operations are:
//! - [connect_to_host] which resolves a host and connects to the first address that answers.
//! - [listen_on] which binds and listens on a loopback, wildcard or literal address.
//! - [accept] and [accept_into] which wait for an inbound connection and report the peer's raw
//! address bytes.
//! - [Socket::shutdown], [Socket::close], [Socket::read] and [Socket::write], along with their raw
//! descriptor counterparts [shutdown], [close], [read] and [write].
//!
//! Operations that can block for an unbounded time take a [crate::boundary::Scheduler] and run
//! their system call inside a [crate::boundary::BlockingRegion]. Each operation family reports its
//! own error type so callers can tell a failed lookup from a refused bind or a refused connection.

mod accept;
mod addr;
mod connect;
mod error;
mod family;
mod listener;
mod resolve;
mod socket;

pub(crate) use addr::{getpeername, getsockname, SocketAddrC};

pub use accept::{accept, accept_into, PeerAddr, PeerBuf};
pub use connect::connect_to_host;
pub use error::{AcceptError, ConnectError, ListenError, ResolveError};
pub use family::Family;
pub use listener::{listen_on, BindScope};
pub use socket::{close, read, shutdown, write, Shutdown, Socket};
