use nix::errno::Errno;

/// Run `op` until it completes with anything other than [Errno::EINTR].
///
/// There is no bound on the number of attempts, an interrupted call has made no progress so
/// restarting it on the same descriptor is always safe.
pub fn retry_interrupted<T, F>(mut op: F) -> nix::Result<T>
where
    F: FnMut() -> nix::Result<T>,
{
    loop {
        match op() {
            Err(Errno::EINTR) => tracing::trace!("system call interrupted, retrying"),
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_only_interrupts() {
        let mut attempts = 0;
        let result = retry_interrupted(|| {
            attempts += 1;
            match attempts {
                1 | 2 => Err(Errno::EINTR),
                _ => Ok(attempts),
            }
        });
        assert_eq!(result, Ok(3));
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_surfaces_other_errors() {
        let mut attempts = 0;
        let result: nix::Result<()> = retry_interrupted(|| {
            attempts += 1;
            Err(Errno::ECONNREFUSED)
        });
        assert_eq!(result, Err(Errno::ECONNREFUSED));
        assert_eq!(attempts, 1);
    }
}
