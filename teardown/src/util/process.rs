//! Process signalling helpers.

use std::io;

/// Send `signal` to `pid`.
///
/// Fails with the OS error, e.g. `ESRCH` if the process is gone or `EPERM`
/// if it belongs to someone else.
pub fn send_signal(pid: u32, signal: i32) -> io::Result<()> {
    // pid 0 and anything above i32::MAX would address process groups.
    let Ok(raw) = i32::try_from(pid) else {
        return Err(io::Error::from_raw_os_error(libc::ESRCH));
    };
    if raw == 0 {
        return Err(io::Error::from_raw_os_error(libc::ESRCH));
    }

    if unsafe { libc::kill(raw, signal) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Check if a process with the given PID exists.
///
/// Uses `libc::kill(pid, 0)` which sends a null signal to check existence.
///
/// # Returns
/// * `true` - Process exists
/// * `false` - Process does not exist or permission denied
pub fn is_process_alive(pid: u32) -> bool {
    send_signal(pid, 0).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_process_alive_current() {
        let current_pid = std::process::id();
        assert!(is_process_alive(current_pid));
    }

    #[test]
    fn test_is_process_alive_invalid() {
        assert!(!is_process_alive(999999999));
        assert!(!is_process_alive(0));
        // Would be -1 as i32, which means "every process".
        assert!(!is_process_alive(u32::MAX));
    }

    #[test]
    fn test_send_signal_to_missing_process() {
        let err = send_signal(999999999, libc::SIGTERM).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
    }
}
