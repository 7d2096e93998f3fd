use std::{
    ffi::CStr,
    marker::PhantomData,
    mem::zeroed,
    net::SocketAddr,
    ptr,
};

use nix::{errno::Errno, libc};

use super::{addr, Family, ResolveError};

/// The owner of a `getaddrinfo(3)` result list. Candidates are read through [AddrInfo::iter] in
/// resolver order, and the list is handed back to `freeaddrinfo(3)` exactly once when the
/// [AddrInfo] is dropped.
pub(crate) struct AddrInfo {
    head: *mut libc::addrinfo,
}

impl AddrInfo {
    /// Look up stream socket addresses of `family` for `host` and `service`. This is the blocking
    /// call, the caller is responsible for any suspension boundary around it.
    pub(crate) fn lookup(
        host: &CStr,
        service: Option<&CStr>,
        family: Family,
    ) -> Result<AddrInfo, ResolveError> {
        // SAFETY: all zero bytes is a valid addrinfo hints structure.
        let mut hints: libc::addrinfo = unsafe { zeroed() };
        hints.ai_family = family.raw();
        hints.ai_socktype = libc::SOCK_STREAM;

        let mut head = ptr::null_mut();
        // SAFETY: host and service are NUL terminated for the duration of the call, and head is
        // only read after a successful return.
        let code = unsafe {
            libc::getaddrinfo(
                host.as_ptr(),
                service.map_or(ptr::null(), CStr::as_ptr),
                &hints,
                &mut head,
            )
        };

        match code {
            0 if head.is_null() => Err(ResolveError::Empty),
            0 => Ok(AddrInfo { head }),
            libc::EAI_SYSTEM => Err(ResolveError::System(Errno::last())),
            code => Err(ResolveError::Lookup {
                code,
                message: gai_message(code),
            }),
        }
    }

    pub(crate) fn iter(&self) -> Candidates<'_> {
        Candidates {
            next: self.head,
            _list: PhantomData,
        }
    }
}

impl Drop for AddrInfo {
    fn drop(&mut self) {
        tracing::trace!("releasing resolved address list");
        // SAFETY: head came from a successful getaddrinfo call and is freed only here.
        unsafe { libc::freeaddrinfo(self.head) };
    }
}

/// A borrowing iterator over the addresses of an [AddrInfo], entries that are not IPv4 or IPv6
/// socket addresses are skipped.
pub(crate) struct Candidates<'a> {
    next: *const libc::addrinfo,
    _list: PhantomData<&'a AddrInfo>,
}

impl<'a> Iterator for Candidates<'a> {
    type Item = SocketAddr;

    fn next(&mut self) -> Option<SocketAddr> {
        while !self.next.is_null() {
            // SAFETY: the list stays alive for 'a and each node is a valid addrinfo.
            let info = unsafe { &*self.next };
            self.next = info.ai_next;

            // SAFETY: ai_addr points at a sockaddr of the family it is tagged with.
            if let Some(addr) = unsafe { addr::from_raw(info.ai_addr) } {
                return Some(addr);
            }
        }
        None
    }
}

fn gai_message(code: libc::c_int) -> String {
    // SAFETY: gai_strerror returns a pointer to a static NUL terminated string.
    let message = unsafe { libc::gai_strerror(code) };
    if message.is_null() {
        return String::from("unknown resolver error");
    }
    unsafe { CStr::from_ptr(message) }
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_lookup() {
        let info = AddrInfo::lookup(c"127.0.0.1", Some(c"8080"), Family::V4).unwrap();
        let addrs: Vec<_> = info.iter().collect();
        assert_eq!(addrs, vec!["127.0.0.1:8080".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn test_lookup_filters_family() {
        let info = AddrInfo::lookup(c"::1", None, Family::V6).unwrap();
        assert!(info.iter().all(|addr| addr.is_ipv6()));

        assert!(AddrInfo::lookup(c"::1", None, Family::V4).is_err());
    }

    #[test]
    fn test_invalid_name_fails() {
        let err = AddrInfo::lookup(c"nonexistent.invalid.", None, Family::V4)
            .err()
            .expect("lookup of an .invalid name succeeded");
        assert!(!matches!(err, ResolveError::Empty), "{err}");
    }
}
