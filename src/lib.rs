//! # coopsock
//!
//! This is a small blocking socket layer designed to be called from a single threaded,
//! cooperatively scheduled host runtime, for example a garbage collected language that embeds it
//! through the C interface in [ffi]. It covers outbound connections with name resolution,
//! listeners, accepting connections, shutdown, close and raw reads and writes, for both IPv4 and
//! IPv6 stream sockets.
//!
//! The interesting part is not the sockets but the [boundary]: every call that can block for an
//! unbounded time (resolution, `connect(2)` and `accept(2)`) first pins the host owned memory it
//! hands to the kernel and tells the host scheduler it is about to block, and undoes both once the
//! call returns, on every path. The host injects that behavior as a [boundary::Scheduler].
//!
//! A loopback echo looks the way you would expect:
//!
//! ```no_run
//! use coopsock::boundary::NoopScheduler;
//! use coopsock::net::{accept, connect_to_host, listen_on, BindScope, Family};
//!
//! let listener = listen_on(BindScope::Local, 9091, 16, Family::V4).expect("failed to listen");
//!
//! let client = connect_to_host(&NoopScheduler, c"localhost", None, 9091, Family::V4)
//!     .expect("failed to connect");
//! let (conn, peer) = accept(&NoopScheduler, &listener, Family::V4).expect("failed to accept");
//! println!("Got connection from: {}", peer.ip());
//!
//! client.write(b"Hello from client!");
//!
//! let mut buf = vec![0u8; 1024];
//! let read = conn.read(&mut buf);
//! if read > 0 {
//!     println!("Client request: {}", String::from_utf8_lossy(&buf[..read as usize]));
//! }
//!
//! conn.close();
//! client.close();
//! ```
//!
//! Every operation returns a descriptor wrapped in a move only [net::Socket] or an operation
//! specific error, so a failed lookup, a refused bind and a refused connection can always be told
//! apart.

pub mod boundary;
pub mod context;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod net;

pub use boundary::{NoopScheduler, Scheduler};
pub use net::{Family, Socket};
