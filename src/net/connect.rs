use std::{ffi::CStr, net::SocketAddr, os::fd::AsRawFd};

use nix::sys::socket::{self, SockaddrStorage};

use crate::boundary::{blocking, retry_interrupted, Region, Scheduler};

use super::{resolve::AddrInfo, ConnectError, Family, ResolveError, Socket};

/// The two system calls a connect attempt is made of. [SystemDial] issues the real calls, tests
/// substitute their own. Each method makes exactly one attempt, [dial_candidates] owns the
/// suspension boundary and restarts interrupted connects.
pub(crate) trait Dial {
    fn open(&mut self, family: Family) -> nix::Result<Socket>;
    fn connect(&mut self, socket: &Socket, addr: &SocketAddr) -> nix::Result<()>;
}

pub(crate) struct SystemDial;

impl Dial for SystemDial {
    fn open(&mut self, family: Family) -> nix::Result<Socket> {
        Socket::stream(family)
    }

    fn connect(&mut self, socket: &Socket, addr: &SocketAddr) -> nix::Result<()> {
        socket::connect(socket.as_raw_fd(), &SockaddrStorage::from(*addr))
    }
}

/// Resolve `host` (and `service` if given) to stream socket addresses of `family` and connect to
/// the first one that accepts the connection.
///
/// When `port` is non-zero it overrides whatever port resolution produced, which is required when
/// `service` is `None`. Passing neither a service nor a port fails with
/// [ConnectError::MissingPort] before anything is resolved.
///
/// Both `host` and `service` are pinned with `scheduler` while the resolver runs, and every
/// `connect(2)` attempt runs inside its own [crate::boundary::BlockingRegion]. Candidates are tried
/// in resolver order, if all of them fail the error of the last one is returned.
///
/// # Examples
///
/// ```no_run
/// use coopsock::boundary::NoopScheduler;
/// use coopsock::net::{connect_to_host, Family};
///
/// let socket = connect_to_host(&NoopScheduler, c"example.org", Some(c"http"), 0, Family::V4)
///     .expect("failed to connect");
/// socket.write(b"GET / HTTP/1.0\r\n\r\n");
/// ```
pub fn connect_to_host<S>(
    scheduler: &S,
    host: &CStr,
    service: Option<&CStr>,
    port: u16,
    family: Family,
) -> Result<Socket, ConnectError>
where
    S: Scheduler + ?Sized,
{
    if service.is_none() && port == 0 {
        return Err(ConnectError::MissingPort);
    }

    let mut pinned = vec![Region::of(host)];
    pinned.extend(service.map(Region::of));

    let info = blocking(scheduler, &pinned, || {
        AddrInfo::lookup(host, service, family)
    })
    .map_err(|err| {
        tracing::warn!(host = ?host, service = ?service, error = %err, "address resolution failed");
        err
    })?;

    dial_candidates(scheduler, &mut SystemDial, info.iter(), port, family)
}

/// Try each candidate in turn until one connects, remembering only the most recent failure. Every
/// connect runs in its own region on `scheduler` and is restarted while interrupted.
pub(crate) fn dial_candidates<S, D, I>(
    scheduler: &S,
    dial: &mut D,
    candidates: I,
    port: u16,
    family: Family,
) -> Result<Socket, ConnectError>
where
    S: Scheduler + ?Sized,
    D: Dial,
    I: IntoIterator<Item = SocketAddr>,
{
    let mut last_error = None;

    for mut addr in candidates {
        let socket = match dial.open(family) {
            Ok(socket) => socket,
            Err(errno) => {
                tracing::debug!(%addr, %errno, "failed to create socket for candidate");
                last_error = Some(ConnectError::SocketCreationFailed(errno));
                continue;
            }
        };

        if port > 0 {
            addr.set_port(port);
        }

        let connected = blocking(scheduler, &[], || {
            retry_interrupted(|| dial.connect(&socket, &addr))
        });

        match connected {
            Ok(()) => {
                tracing::debug!(%addr, fd = socket.as_raw_fd(), "connected");
                return Ok(socket);
            }
            Err(source) => {
                tracing::debug!(%addr, errno = %source, "candidate refused connection");
                socket.close();
                last_error = Some(ConnectError::ConnectFailed { addr, source });
            }
        }
    }

    Err(last_error.unwrap_or(ConnectError::AddressResolutionFailed(ResolveError::Empty)))
}
