//! # `coopsock` C API
//!
//! These entry points keep the integer conventions host runtimes already bind against:
//!
//! | function                 | success        | failure                                         |
//! |--------------------------|----------------|-------------------------------------------------|
//! | `connect_to_ipv{4,6}_host` | descriptor   | -1 lookup, -2 socket, -3 connect, -4 no port    |
//! | `listen_on_ipv{4,6}_socket` | descriptor  | -1 address, -2 socket, -3 bind, -4 listen       |
//! | `accept_ipv{4,6}_connection` | descriptor | -1                                              |
//! | `shutdown_`, `close_fd`  | 1              | 0                                               |
//! | `c_read`, `c_write`      | byte count     | -1, with `errno` set                            |
//!
//! Blocking entry points consult the scheduler installed with [coopsock_install_host]. The host
//! strings and output arrays passed to them are pinned through that scheduler for as long as the
//! kernel may touch them.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::{
    ffi::{c_char, c_int, c_uint, c_ushort, c_void, CStr},
    os::fd::{BorrowedFd, IntoRawFd},
    sync::Arc,
};

use crate::{
    boundary::{Region, Scheduler},
    context,
    net::{self, BindScope, Family, PeerBuf, Shutdown},
};

/// A [Scheduler] backed by the four callbacks a host runtime exports.
#[derive(Clone, Copy, Debug)]
pub struct HostScheduler {
    pub activate: extern "C" fn() -> c_int,
    pub deactivate: extern "C" fn(),
    pub lock_object: extern "C" fn(*mut c_void),
    pub unlock_object: extern "C" fn(*mut c_void),
}

impl Scheduler for HostScheduler {
    fn begin_yield(&self) {
        (self.deactivate)()
    }

    fn end_yield(&self) {
        (self.activate)();
    }

    fn pin(&self, region: Region) {
        (self.lock_object)(region.addr() as *mut c_void)
    }

    fn unpin(&self, region: Region) {
        (self.unlock_object)(region.addr() as *mut c_void)
    }
}

/// Install the host runtime's thread activation and object locking callbacks. Until this is called
/// blocking entry points neither yield nor pin.
#[no_mangle]
pub extern "C" fn coopsock_install_host(
    activate: extern "C" fn() -> c_int,
    deactivate: extern "C" fn(),
    lock_object: extern "C" fn(*mut c_void),
    unlock_object: extern "C" fn(*mut c_void),
) {
    context::install(Arc::new(HostScheduler {
        activate,
        deactivate,
        lock_object,
        unlock_object,
    }));
}

unsafe fn connect(
    address: *const c_char,
    service: *const c_char,
    port: c_ushort,
    family: Family,
) -> c_int {
    if address.is_null() {
        return -1;
    }
    let address = CStr::from_ptr(address);
    let service = (!service.is_null()).then(|| CStr::from_ptr(service));

    match net::connect_to_host(&context::scheduler(), address, service, port, family) {
        Ok(socket) => socket.into_raw_fd(),
        Err(err) => err.code(),
    }
}

/// Connect to `address` over IPv4. `service` may be NULL, in which case `port` must be non-zero.
/// A non-zero `port` always overrides the port `service` resolves to.
#[no_mangle]
pub unsafe extern "C" fn connect_to_ipv4_host(
    address: *const c_char,
    service: *const c_char,
    port: c_ushort,
) -> c_int {
    connect(address, service, port, Family::V4)
}

/// Connect to `address` over IPv6, see [connect_to_ipv4_host].
#[no_mangle]
pub unsafe extern "C" fn connect_to_ipv6_host(
    address: *const c_char,
    service: *const c_char,
    port: c_ushort,
) -> c_int {
    connect(address, service, port, Family::V6)
}

fn listen(local: c_int, port: c_ushort, backlog: c_int, family: Family) -> c_int {
    let scope = if local != 0 {
        BindScope::Local
    } else {
        BindScope::Any
    };

    match net::listen_on(scope, port, backlog, family) {
        Ok(socket) => socket.into_raw_fd(),
        Err(err) => err.code(),
    }
}

/// Listen on `port` over IPv4, on localhost only when `local` is non-zero.
#[no_mangle]
pub extern "C" fn listen_on_ipv4_socket(local: c_int, port: c_ushort, backlog: c_int) -> c_int {
    listen(local, port, backlog, Family::V4)
}

/// Listen on `port` over IPv6, on localhost only when `local` is non-zero.
#[no_mangle]
pub extern "C" fn listen_on_ipv6_socket(local: c_int, port: c_ushort, backlog: c_int) -> c_int {
    listen(local, port, backlog, Family::V6)
}

fn accept(sock: c_int, peer: PeerBuf<'_>) -> c_int {
    // SAFETY: the host owns the listening descriptor for the duration of the call.
    let listener = unsafe { BorrowedFd::borrow_raw(sock) };
    match net::accept_into(&context::scheduler(), &listener, peer) {
        Ok(socket) => socket.into_raw_fd(),
        Err(err) => err.code(),
    }
}

/// Accept a connection on an IPv4 listener. `connection` must point at 4 bytes, which receive the
/// peer address in network order.
#[no_mangle]
pub unsafe extern "C" fn accept_ipv4_connection(sock: c_int, connection: *mut c_uint) -> c_int {
    match (connection as *mut [u8; 4]).as_mut() {
        Some(peer) => accept(sock, PeerBuf::V4(peer)),
        None => -1,
    }
}

/// Accept a connection on an IPv6 listener. `connection` must point at 16 bytes, which receive the
/// peer address in network order.
#[no_mangle]
pub unsafe extern "C" fn accept_ipv6_connection(sock: c_int, connection: *mut u8) -> c_int {
    match (connection as *mut [u8; 16]).as_mut() {
        Some(peer) => accept(sock, PeerBuf::V6(peer)),
        None => -1,
    }
}

/// Shut down the read (0), write (1) or both (2) halves of `fd`. Returns 1 on success.
#[no_mangle]
pub extern "C" fn shutdown_(fd: c_int, how: c_int) -> c_int {
    Shutdown::from_code(how).map_or(0, |how| net::shutdown(fd, how) as c_int)
}

/// Close `fd`. Returns 1 on success.
#[no_mangle]
pub extern "C" fn close_fd(fd: c_int) -> c_int {
    net::close(fd) as c_int
}

/// `read(2)` on `fd`.
#[no_mangle]
pub unsafe extern "C" fn c_read(fd: c_int, buf: *mut c_void, n: usize) -> c_int {
    nix::libc::read(fd, buf, n) as c_int
}

/// `write(2)` on `fd`.
#[no_mangle]
pub unsafe extern "C" fn c_write(fd: c_int, buf: *const c_void, n: usize) -> c_int {
    nix::libc::write(fd, buf, n) as c_int
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::{TcpListener, TcpStream},
    };

    use super::*;

    #[test]
    fn test_listen_accept_v4() {
        let listener = listen_on_ipv4_socket(1, 0, 1);
        assert!(listener >= 0);

        let addr = net::getsockname(listener).unwrap();
        let mut client = TcpStream::connect(addr).unwrap();

        let mut peer: c_uint = 0;
        let conn = unsafe { accept_ipv4_connection(listener, &mut peer) };
        assert!(conn >= 0);
        assert_eq!(peer.to_ne_bytes(), [127, 0, 0, 1]);

        client.write_all(b"hi").unwrap();
        let mut buf = [0u8; 2];
        let read = unsafe { c_read(conn, buf.as_mut_ptr() as *mut c_void, buf.len()) };
        assert_eq!(read, 2);
        assert_eq!(&buf, b"hi");

        let written = unsafe { c_write(conn, b"yo".as_ptr() as *const c_void, 2) };
        assert_eq!(written, 2);
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"yo");

        assert_eq!(shutdown_(conn, 2), 1);
        assert_eq!(shutdown_(conn, 7), 0);
        assert_eq!(close_fd(conn), 1);
        assert_eq!(close_fd(listener), 1);
    }

    #[test]
    fn test_listen_large_backlog() {
        let listener = listen_on_ipv6_socket(1, 0, 8192);
        assert!(listener >= 0, "listen failed with {listener}");
        assert_eq!(close_fd(listener), 1);
    }

    #[test]
    fn test_accept_null_buffer() {
        assert_eq!(unsafe { accept_ipv6_connection(-1, std::ptr::null_mut()) }, -1);
    }

    #[test]
    fn test_connect_codes() {
        let missing_port =
            unsafe { connect_to_ipv4_host(c"localhost".as_ptr(), std::ptr::null(), 0) };
        assert_eq!(missing_port, -4);

        let unresolvable =
            unsafe { connect_to_ipv4_host(c"nonexistent.invalid.".as_ptr(), std::ptr::null(), 80) };
        assert_eq!(unresolvable, -1);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let fd = unsafe { connect_to_ipv4_host(c"127.0.0.1".as_ptr(), std::ptr::null(), port) };
        assert!(fd >= 0);
        assert_eq!(close_fd(fd), 1);
        drop(listener);
    }
}
