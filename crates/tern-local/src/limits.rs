//! POSIX rlimits for the launched master.
//!
//! Limits are installed in a `pre_exec` hook, so they apply in the child
//! after `fork()` and before `execve()`. The soft limit takes the requested
//! value; a higher or unlimited hard limit is kept. Non-Unix targets log a
//! warning and start the process unrestricted.
use serde::{Deserialize, Serialize};
use tokio::process::Command;

/// Limits applied to one launched process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessLimits {
    /// Address-space ceiling in bytes (`RLIMIT_AS`).
    pub max_memory_bytes: Option<u64>,
    /// `RLIMIT_NOFILE`.
    pub max_open_files: Option<u64>,
    /// Sets `RLIMIT_CORE` to zero.
    pub disable_core_dumps: bool,
}

impl ProcessLimits {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_memory_bytes.is_none() && self.max_open_files.is_none() && !self.disable_core_dumps
    }

    pub fn with_memory_mb(mut self, mb: u32) -> Self {
        self.max_memory_bytes = Some(u64::from(mb) * 1024 * 1024);
        self
    }
}

pub fn attach_limits(cmd: &mut Command, limits: &ProcessLimits) {
    if limits.is_empty() {
        return;
    }

    #[cfg(unix)]
    unix_impl::attach(cmd, limits);

    #[cfg(not(unix))]
    tracing::warn!(?limits, "process limits are not supported on this platform; ignoring");
}

#[cfg(unix)]
mod unix_impl {
    use std::io;

    use tokio::process::Command;

    use super::ProcessLimits;

    pub(super) fn attach(cmd: &mut Command, limits: &ProcessLimits) {
        let memory = limits.max_memory_bytes;
        let nofile = limits.max_open_files;
        let no_core = limits.disable_core_dumps;

        // SAFETY: the hook only calls async-signal-safe libc functions and
        // allocates nothing.
        unsafe {
            cmd.pre_exec(move || {
                if let Some(bytes) = memory {
                    apply(libc::RLIMIT_AS, bytes, b"tern-local: failed to set RLIMIT_AS: ")?;
                }
                if let Some(n) = nofile {
                    apply(libc::RLIMIT_NOFILE, n, b"tern-local: failed to set RLIMIT_NOFILE: ")?;
                }
                if no_core {
                    apply(libc::RLIMIT_CORE, 0, b"tern-local: failed to set RLIMIT_CORE: ")?;
                }
                Ok(())
            });
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    type Resource = libc::__rlimit_resource_t;

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    type Resource = libc::c_int;

    fn apply(resource: Resource, value: u64, context: &[u8]) -> io::Result<()> {
        set(resource, value).inspect_err(|e| {
            raw_log(context);
            raw_log_errno(e.raw_os_error().unwrap_or(0));
        })
    }

    fn set(resource: Resource, value: u64) -> io::Result<()> {
        if value > libc::rlim_t::MAX as u64 {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }

        let mut current = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        if unsafe { libc::getrlimit(resource, &mut current) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let soft = value as libc::rlim_t;
        let hard = if current.rlim_max == libc::RLIM_INFINITY || current.rlim_max > soft {
            current.rlim_max
        } else {
            soft
        };
        let next = libc::rlimit {
            rlim_cur: soft,
            rlim_max: hard,
        };
        if unsafe { libc::setrlimit(resource, &next) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Write to stderr without allocating; safe between fork and exec.
    fn raw_log(msg: &[u8]) {
        unsafe {
            libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
        }
    }

    fn raw_log_errno(errno: i32) {
        let mut buf = [0u8; 24];
        let mut idx = buf.len() - 1;
        buf[idx] = b'\n';
        let mut n = errno.unsigned_abs();
        loop {
            idx -= 1;
            buf[idx] = b'0' + (n % 10) as u8;
            n /= 10;
            if n == 0 {
                break;
            }
        }
        if errno < 0 {
            idx -= 1;
            buf[idx] = b'-';
        }
        raw_log(b"errno=");
        raw_log(&buf[idx..]);
    }
}
