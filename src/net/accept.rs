use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    os::fd::{AsRawFd, FromRawFd, RawFd},
};

use nix::{errno::Errno, libc};

use crate::boundary::{blocking, retry_interrupted, Region, Scheduler};

use super::{AcceptError, Family, Socket, SocketAddrC};

/// The raw network order address bytes of an accepted peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PeerAddr {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl PeerAddr {
    /// An all zero address of `family`, ready to be filled in by [accept_into].
    pub fn unspecified(family: Family) -> PeerAddr {
        match family {
            Family::V4 => PeerAddr::V4([0; 4]),
            Family::V6 => PeerAddr::V6([0; 16]),
        }
    }

    pub fn family(&self) -> Family {
        match self {
            PeerAddr::V4(..) => Family::V4,
            PeerAddr::V6(..) => Family::V6,
        }
    }

    /// The address bytes, 4 for IPv4 and 16 for IPv6.
    pub fn octets(&self) -> &[u8] {
        match self {
            PeerAddr::V4(octets) => octets,
            PeerAddr::V6(octets) => octets,
        }
    }

    pub fn ip(&self) -> IpAddr {
        match *self {
            PeerAddr::V4(octets) => IpAddr::V4(Ipv4Addr::from(octets)),
            PeerAddr::V6(octets) => IpAddr::V6(Ipv6Addr::from(octets)),
        }
    }

    /// Borrow the bytes as a [PeerBuf] for [accept_into].
    pub fn as_buf(&mut self) -> PeerBuf<'_> {
        match self {
            PeerAddr::V4(octets) => PeerBuf::V4(octets),
            PeerAddr::V6(octets) => PeerBuf::V6(octets),
        }
    }
}

/// A caller owned buffer the peer address of an accepted connection is written into. The variant
/// selects the address family, which makes a buffer of the wrong size unrepresentable.
#[derive(Debug)]
pub enum PeerBuf<'a> {
    V4(&'a mut [u8; 4]),
    V6(&'a mut [u8; 16]),
}

impl<'a> PeerBuf<'a> {
    pub fn family(&self) -> Family {
        match self {
            PeerBuf::V4(..) => Family::V4,
            PeerBuf::V6(..) => Family::V6,
        }
    }

    fn region(&self) -> Region {
        match self {
            PeerBuf::V4(octets) => Region::of(&**octets),
            PeerBuf::V6(octets) => Region::of(&**octets),
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            PeerBuf::V4(octets) => &mut octets[..],
            PeerBuf::V6(octets) => &mut octets[..],
        }
    }
}

/// Wait for a connection on `listener` and return it along with the peer's address bytes in the
/// listener's `family`.
///
/// See [accept_into] for the details, this only differs in owning the peer address buffer.
pub fn accept<S, L>(
    scheduler: &S,
    listener: &L,
    family: Family,
) -> Result<(Socket, PeerAddr), AcceptError>
where
    S: Scheduler + ?Sized,
    L: AsRawFd + ?Sized,
{
    let mut peer = PeerAddr::unspecified(family);
    let socket = accept_into(scheduler, listener, peer.as_buf())?;
    Ok((socket, peer))
}

/// Wait for a connection on `listener`, writing the raw network order address of the peer into
/// `peer`.
///
/// `peer` is pinned with `scheduler` for the whole call and `accept(2)` runs inside a
/// [crate::boundary::BlockingRegion], interrupted calls are restarted transparently. If the kernel
/// reports a peer address longer than the family's socket address structure the new connection is
/// closed and [AcceptError::InvalidAddressLength] is returned, `peer` is only written on success.
///
/// # Examples
///
/// ```no_run
/// use coopsock::boundary::NoopScheduler;
/// use coopsock::net::{accept_into, listen_on, BindScope, Family, PeerBuf};
///
/// let listener = listen_on(BindScope::Local, 9091, 16, Family::V4).unwrap();
/// let mut peer = [0u8; 4];
/// let conn = accept_into(&NoopScheduler, &listener, PeerBuf::V4(&mut peer)).unwrap();
/// println!("Got connection from: {:?}", peer);
/// conn.close();
/// ```
pub fn accept_into<S, L>(
    scheduler: &S,
    listener: &L,
    peer: PeerBuf<'_>,
) -> Result<Socket, AcceptError>
where
    S: Scheduler + ?Sized,
    L: AsRawFd + ?Sized,
{
    let fd = listener.as_raw_fd();
    accept_with(scheduler, peer, |addr, len| {
        // SAFETY: addr and len point at live storage sized for either family.
        Errno::result(unsafe { libc::accept(fd, addr.as_mut_ptr(), len) })
    })
}

pub(crate) fn accept_with<S, F>(
    scheduler: &S,
    mut peer: PeerBuf<'_>,
    mut sys: F,
) -> Result<Socket, AcceptError>
where
    S: Scheduler + ?Sized,
    F: FnMut(&mut SocketAddrC, &mut libc::socklen_t) -> nix::Result<RawFd>,
{
    let family = peer.family();
    let (mut addr, mut len) = SocketAddrC::new(family);

    let pinned = [peer.region()];
    let result = blocking(scheduler, &pinned, || {
        retry_interrupted(|| {
            len = family.sockaddr_len();
            sys(&mut addr, &mut len)
        })
    });

    let fd = result.map_err(AcceptError::AcceptFailed)?;
    // SAFETY: accept just handed us this descriptor and nothing else owns it.
    let socket = unsafe { Socket::from_raw_fd(fd) };

    let expected = family.sockaddr_len();
    if len > expected {
        tracing::warn!(reported = len, expected, "peer address too long, dropping connection");
        socket.close();
        return Err(AcceptError::InvalidAddressLength {
            reported: len,
            expected,
        });
    }

    addr.copy_octets(family, peer.bytes_mut());
    tracing::debug!(fd, ?family, "accepted connection");
    Ok(socket)
}
