use std::{
    net::{IpAddr, SocketAddr},
    os::fd::AsRawFd,
};

use nix::sys::socket::{bind, listen, Backlog, SockaddrStorage};

use super::{Family, ListenError, Socket};

/// Which local address [listen_on] binds to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindScope {
    /// The loopback address of the family, `127.0.0.1` or `::1`.
    Local,
    /// The wildcard address of the family, `0.0.0.0` or `::`.
    Any,
    /// A specific interface address given as an IP literal of the family.
    Literal(String),
}

impl BindScope {
    fn address(&self, family: Family) -> Result<IpAddr, ListenError> {
        let literal = match self {
            BindScope::Local => return Ok(family.loopback()),
            BindScope::Any => return Ok(family.unspecified()),
            BindScope::Literal(literal) => literal,
        };

        let ip = literal
            .parse::<IpAddr>()
            .map_err(|err| ListenError::AddressConstructionFailed {
                literal: literal.clone(),
                reason: err.to_string(),
            })?;

        if !family.contains(&ip) {
            return Err(ListenError::AddressConstructionFailed {
                literal: literal.clone(),
                reason: format!("expected a {family:?} address"),
            });
        }
        Ok(ip)
    }
}

/// `listen(2)` silently caps the queue at `SOMAXCONN`, [Backlog::new] rejects anything from
/// `SOMAXCONN` up instead.
fn queue_len(backlog: i32) -> nix::Result<Backlog> {
    if backlog >= i32::from(Backlog::MAXCONN) {
        return Ok(Backlog::MAXCONN);
    }
    Backlog::new(backlog)
}

/// Create a stream socket of `family` bound to `port` on the address `scope` selects, and start
/// listening with room for `backlog` pending connections. A `port` of 0 lets the kernel pick an
/// ephemeral port, see [Socket::local_addr]. Backlogs above `SOMAXCONN` are capped to it, ones
/// below -1 fail with [ListenError::ListenFailed].
///
/// Neither `bind(2)` nor `listen(2)` block, so no suspension boundary is entered here. On failure
/// the socket is closed before returning.
///
/// # Examples
///
/// ```no_run
/// use coopsock::net::{listen_on, BindScope, Family};
///
/// let listener = listen_on(BindScope::Any, 9091, 1024, Family::V6).expect("failed to listen");
/// println!("Listening on: {}", listener.local_addr().unwrap());
/// ```
pub fn listen_on(
    scope: BindScope,
    port: u16,
    backlog: i32,
    family: Family,
) -> Result<Socket, ListenError> {
    let addr = SocketAddr::new(scope.address(family)?, port);

    let socket = Socket::stream(family).map_err(ListenError::SocketCreationFailed)?;

    bind(socket.as_raw_fd(), &SockaddrStorage::from(addr))
        .map_err(|source| ListenError::BindFailed { addr, source })?;

    queue_len(backlog)
        .and_then(|backlog| listen(&socket, backlog))
        .map_err(ListenError::ListenFailed)?;

    tracing::debug!(%addr, backlog, fd = socket.as_raw_fd(), "listening");
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use std::net::TcpStream;

    use super::*;

    #[test]
    fn test_listen_local_ephemeral() {
        let listener = listen_on(BindScope::Local, 0, 1, Family::V4).unwrap();
        let addr = listener.local_addr().unwrap();
        assert_eq!(addr.ip(), Family::V4.loopback());
        assert_ne!(addr.port(), 0);

        TcpStream::connect(addr).expect("listener is not accepting connections");
    }

    #[test]
    fn test_listen_any_v6() {
        let listener = listen_on(BindScope::Any, 0, 8, Family::V6).unwrap();
        assert_eq!(listener.local_addr().unwrap().ip(), Family::V6.unspecified());
    }

    #[test]
    fn test_literal_scope() {
        let listener =
            listen_on(BindScope::Literal("127.0.0.1".into()), 0, 1, Family::V4).unwrap();
        assert_eq!(listener.local_addr().unwrap().ip(), Family::V4.loopback());

        let err = listen_on(BindScope::Literal("localhost".into()), 0, 1, Family::V4).unwrap_err();
        assert!(matches!(err, ListenError::AddressConstructionFailed { .. }));

        let err = listen_on(BindScope::Literal("::1".into()), 0, 1, Family::V4).unwrap_err();
        assert!(matches!(err, ListenError::AddressConstructionFailed { .. }));
    }

    #[test]
    fn test_bind_in_use() {
        let first = listen_on(BindScope::Local, 0, 1, Family::V4).unwrap();
        let port = first.local_addr().unwrap().port();

        let err = listen_on(BindScope::Local, port, 1, Family::V4).unwrap_err();
        assert!(matches!(err, ListenError::BindFailed { .. }), "{err}");
    }

    #[test]
    fn test_backlog_above_somaxconn_is_capped() {
        assert_eq!(queue_len(i32::MAX), Ok(Backlog::MAXCONN));
        assert_eq!(queue_len(i32::from(Backlog::MAXCONN)), Ok(Backlog::MAXCONN));

        let listener = listen_on(BindScope::Local, 0, 8192, Family::V4).unwrap();
        TcpStream::connect(listener.local_addr().unwrap())
            .expect("listener is not accepting connections");
    }

    #[test]
    fn test_invalid_backlog() {
        let err = listen_on(BindScope::Local, 0, -5, Family::V4).unwrap_err();
        assert!(matches!(err, ListenError::ListenFailed(_)), "{err}");
    }
}
