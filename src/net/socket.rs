use std::{
    io,
    net::SocketAddr,
    os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd},
};

use nix::{
    sys::socket::{self, AddressFamily, SockFlag, SockType},
    unistd,
};

use super::{getpeername, getsockname, Family};

/// Which half of a connection [Socket::shutdown] closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shutdown {
    Read,
    Write,
    Both,
}

impl Shutdown {
    /// Map the integer direction codes of the C interface, 0 read, 1 write and 2 both.
    pub fn from_code(code: i32) -> Option<Shutdown> {
        match code {
            0 => Some(Shutdown::Read),
            1 => Some(Shutdown::Write),
            2 => Some(Shutdown::Both),
            _ => None,
        }
    }
}

impl From<Shutdown> for socket::Shutdown {
    fn from(how: Shutdown) -> socket::Shutdown {
        match how {
            Shutdown::Read => socket::Shutdown::Read,
            Shutdown::Write => socket::Shutdown::Write,
            Shutdown::Both => socket::Shutdown::Both,
        }
    }
}

/// A [Socket] is the single owner of a stream socket descriptor. It is created by
/// [super::connect_to_host], [super::listen_on] or [super::accept], can not be cloned, and releases
/// its descriptor exactly once: either through [Socket::close], when dropped, or by handing the
/// descriptor off with [Socket::into_raw_fd].
///
/// Reads and writes are thin pass-throughs to `read(2)` and `write(2)`, they keep the blocking
/// behavior of the descriptor and report errors as negative errno values.
#[derive(Debug)]
pub struct Socket {
    fd: OwnedFd,
}

impl Socket {
    pub(crate) fn stream(family: Family) -> nix::Result<Socket> {
        socket::socket(
            AddressFamily::from(family),
            SockType::Stream,
            SockFlag::empty(),
            None,
        )
        .map(Socket::from)
    }

    /// Close the read half, the write half or both halves of the connection, returning whether
    /// the kernel accepted the request.
    pub fn shutdown(&self, how: Shutdown) -> bool {
        shutdown(self.as_raw_fd(), how)
    }

    /// Release the descriptor, returning whether `close(2)` succeeded. The descriptor is gone
    /// either way.
    pub fn close(self) -> bool {
        close(self.into_raw_fd())
    }

    /// Read up to `buf.len()` bytes, returning the number read, 0 at end of stream, or a negative
    /// errno.
    pub fn read(&self, buf: &mut [u8]) -> isize {
        read(self.as_raw_fd(), buf)
    }

    /// Write up to `buf.len()` bytes, returning the number written or a negative errno.
    pub fn write(&self, buf: &[u8]) -> isize {
        write(self.as_raw_fd(), buf)
    }

    /// Retrieve this sockets local [SocketAddr].
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        getsockname(self.as_raw_fd())
    }

    /// Retrieve the [SocketAddr] of the remote end of a connected socket.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        getpeername(self.as_raw_fd())
    }
}

impl From<OwnedFd> for Socket {
    fn from(fd: OwnedFd) -> Self {
        Socket { fd }
    }
}

impl From<Socket> for OwnedFd {
    fn from(socket: Socket) -> Self {
        socket.fd
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for Socket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl IntoRawFd for Socket {
    fn into_raw_fd(self) -> RawFd {
        self.fd.into_raw_fd()
    }
}

impl FromRawFd for Socket {
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Socket {
            fd: OwnedFd::from_raw_fd(fd),
        }
    }
}

/// `shutdown(2)` on a raw descriptor, returning whether it succeeded.
pub fn shutdown(fd: RawFd, how: Shutdown) -> bool {
    socket::shutdown(fd, how.into()).is_ok()
}

/// `close(2)` on a raw descriptor, returning whether it succeeded.
pub fn close(fd: RawFd) -> bool {
    unistd::close(fd).is_ok()
}

/// `read(2)` on a raw descriptor, returning the byte count or a negative errno.
pub fn read(fd: RawFd, buf: &mut [u8]) -> isize {
    transferred(unistd::read(fd, buf))
}

/// `write(2)` on a raw descriptor, returning the byte count or a negative errno.
pub fn write(fd: RawFd, buf: &[u8]) -> isize {
    // SAFETY: the descriptor is only borrowed for the duration of the call, validity is on the
    // caller just like with `read`.
    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
    transferred(unistd::write(fd, buf))
}

fn transferred(result: nix::Result<usize>) -> isize {
    match result {
        Ok(n) => n as isize,
        Err(errno) => -(errno as i32) as isize,
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixStream;

    use nix::errno::Errno;

    use super::*;

    fn pair() -> (Socket, Socket) {
        let (a, b) = UnixStream::pair().unwrap();
        (Socket::from(OwnedFd::from(a)), Socket::from(OwnedFd::from(b)))
    }

    #[test]
    fn test_read_write_pass_through() {
        let (a, b) = pair();
        assert_eq!(a.write(b"hello"), 5);

        let mut buf = [0u8; 16];
        assert_eq!(b.read(&mut buf), 5);
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn test_shutdown_both_then_read_is_eof() {
        let (a, _b) = pair();
        assert!(a.shutdown(Shutdown::Both));

        let mut buf = [0u8; 8];
        let read = a.read(&mut buf);
        assert!(read <= 0, "read {read} bytes after shutdown");
    }

    #[test]
    fn test_write_after_shutdown_is_negative_errno() {
        let (a, b) = pair();
        assert!(a.shutdown(Shutdown::Write));
        assert!(b.close());

        let written = a.write(b"x");
        assert_eq!(written, -(Errno::EPIPE as i32) as isize);
    }

    #[test]
    fn test_raw_close_on_bad_descriptor() {
        assert!(!close(-1));
        assert!(!shutdown(-1, Shutdown::Both));
        assert_eq!(read(-1, &mut [0u8; 1]), -(Errno::EBADF as i32) as isize);
    }

    #[test]
    fn test_shutdown_codes() {
        assert_eq!(Shutdown::from_code(0), Some(Shutdown::Read));
        assert_eq!(Shutdown::from_code(1), Some(Shutdown::Write));
        assert_eq!(Shutdown::from_code(2), Some(Shutdown::Both));
        assert_eq!(Shutdown::from_code(3), None);
    }
}
