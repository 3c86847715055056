//! Process-wide signal setup performed on activation.
//!
//! SIGPIPE is ignored so that a lost connection to any downstream service
//! surfaces as an `EPIPE` write error instead of terminating the process.

use std::sync::Once;

static IGNORE_SIGPIPE: Once = Once::new();

/// Ignore SIGPIPE for the whole process. Only the first call has an effect.
pub fn ignore_broken_pipe() {
    IGNORE_SIGPIPE.call_once(|| {
        #[cfg(unix)]
        {
            // SAFETY: installing SIG_IGN has no handler code to race with and
            // is async-signal-safe.
            let previous = unsafe { libc::signal(libc::SIGPIPE, libc::SIG_IGN) };
            if previous == libc::SIG_ERR {
                tracing::warn!("Failed to ignore SIGPIPE");
            } else {
                tracing::debug!("SIGPIPE ignored");
            }
        }
    });
}

/// Whether [`ignore_broken_pipe`] has run in this process.
pub fn broken_pipe_ignored() -> bool {
    IGNORE_SIGPIPE.is_completed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_broken_pipe_is_idempotent() {
        ignore_broken_pipe();
        ignore_broken_pipe();
        assert!(broken_pipe_ignored());
    }

    #[cfg(unix)]
    #[test]
    fn test_sigpipe_disposition_is_ignore() {
        ignore_broken_pipe();
        // SAFETY: querying and restoring the same disposition.
        let current = unsafe { libc::signal(libc::SIGPIPE, libc::SIG_IGN) };
        assert_eq!(current, libc::SIG_IGN);
    }
}
