// src/exec/signal.rs

//! Interrupting a running worker.

use std::io;

use tokio::process::Child;

/// How the interrupt was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// SIGINT was sent; the worker may still shut down on its own.
    Graceful,
    /// The platform has no graceful interrupt for a child; it was killed.
    Forced,
    /// The child had already been reaped.
    AlreadyExited,
}

/// Send SIGINT to the child.
#[cfg(unix)]
pub fn interrupt(child: &mut Child) -> io::Result<Interrupt> {
    let Some(pid) = child.id() else {
        return Ok(Interrupt::AlreadyExited);
    };
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    // SAFETY: `kill` has no memory-safety preconditions; `pid` belongs to a
    // child we have not reaped yet, so it cannot have been recycled.
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    if rc == 0 {
        Ok(Interrupt::Graceful)
    } else {
        Err(io::Error::last_os_error())
    }
}

/// No SIGINT for child processes here; kill instead.
#[cfg(not(unix))]
pub fn interrupt(child: &mut Child) -> io::Result<Interrupt> {
    if child.id().is_none() {
        return Ok(Interrupt::AlreadyExited);
    }
    child.start_kill()?;
    Ok(Interrupt::Forced)
}
