use std::{
    io,
    mem::zeroed,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
    os::fd::RawFd,
};

use nix::{
    libc,
    sys::socket::{self, SockaddrLike, SockaddrStorage},
};

use super::Family;

/// The raw socket address storage handed to `accept(2)`, large enough for either family.
#[repr(C)]
pub(crate) union SocketAddrC {
    v4: libc::sockaddr_in,
    v6: libc::sockaddr_in6,
}

impl SocketAddrC {
    /// A zeroed address along with the length to report for `family`.
    pub(crate) fn new(family: Family) -> (SocketAddrC, libc::socklen_t) {
        // SAFETY: both members are plain C structs for which all zero bytes is a valid value.
        let addr = unsafe { zeroed::<SocketAddrC>() };
        (addr, family.sockaddr_len())
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut libc::sockaddr {
        self as *mut _ as *mut libc::sockaddr
    }

    /// Copy the raw network order address bytes for `family` into `out`.
    pub(crate) fn copy_octets(&self, family: Family, out: &mut [u8]) {
        // SAFETY: the union is always fully initialized, reading either member is sound.
        match family {
            Family::V4 => out.copy_from_slice(&unsafe { self.v4.sin_addr.s_addr }.to_ne_bytes()),
            Family::V6 => out.copy_from_slice(&unsafe { self.v6.sin6_addr.s6_addr }),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_ip(&mut self, addr: std::net::IpAddr) {
        use std::net::IpAddr;

        match addr {
            IpAddr::V4(ip) => {
                self.v4 = libc::sockaddr_in {
                    sin_family: libc::AF_INET as libc::sa_family_t,
                    sin_port: 0,
                    sin_addr: libc::in_addr {
                        s_addr: u32::from_ne_bytes(ip.octets()),
                    },
                    sin_zero: [0u8; 8],
                };
            }
            IpAddr::V6(ip) => {
                // SAFETY: all zero bytes is a valid sockaddr_in6.
                let mut v6: libc::sockaddr_in6 = unsafe { zeroed() };
                v6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                v6.sin6_addr.s6_addr = ip.octets();
                self.v6 = v6;
            }
        }
    }
}

/// Convert a raw `sockaddr` of either family into a [SocketAddr].
///
/// # Safety
///
/// `addr` must point at a valid `sockaddr_in` when its family is `AF_INET`, or at a valid
/// `sockaddr_in6` when its family is `AF_INET6`.
pub(crate) unsafe fn from_raw(addr: *const libc::sockaddr) -> Option<SocketAddr> {
    if addr.is_null() {
        return None;
    }

    match (*addr).sa_family as libc::c_int {
        libc::AF_INET => {
            let v4 = &*(addr as *const libc::sockaddr_in);
            let ip = Ipv4Addr::from(u32::from_be(v4.sin_addr.s_addr));
            Some(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(v4.sin_port))))
        }
        libc::AF_INET6 => {
            let v6 = &*(addr as *const libc::sockaddr_in6);
            Some(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(v6.sin6_addr.s6_addr),
                u16::from_be(v6.sin6_port),
                v6.sin6_flowinfo,
                v6.sin6_scope_id,
            )))
        }
        _ => None,
    }
}

fn storage_to_std(storage: SockaddrStorage) -> io::Result<SocketAddr> {
    // SAFETY: SockaddrStorage is large enough for, and tagged with, the family it holds.
    unsafe { from_raw(storage.as_ptr()) }
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "not an inet address"))
}

pub(crate) fn getsockname(fd: RawFd) -> io::Result<SocketAddr> {
    storage_to_std(socket::getsockname::<SockaddrStorage>(fd)?)
}

pub(crate) fn getpeername(fd: RawFd) -> io::Result<SocketAddr> {
    storage_to_std(socket::getpeername::<SockaddrStorage>(fd)?)
}
