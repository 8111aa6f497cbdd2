//! Signal-driven control flags
//!
//! Four flags steer the ingest loop: exit, log reopen, reconfigure, and
//! state dump. Each is a single word written with relaxed ordering from the
//! signal tasks and observed-then-cleared by the loop at the top of every
//! iteration; no compound state is ever touched on the signal path. A
//! [`Notify`] wakes the loop so a flag raised while every socket is quiet
//! still takes effect immediately.
//!
//! | Signal | Flag |
//! |---|---|
//! | INT, TERM | exit (records the signal number; last one wins) |
//! | HUP | reconf, which implies reopen |
//! | USR1 | reopen |
//! | USR2, INFO where available | info |

use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;

/// Shared flag block between signal tasks and the ingest loop
#[derive(Debug, Default)]
pub struct ControlFlags {
    /// Signal number requesting exit, 0 when none
    exit: AtomicI32,
    reopen: AtomicBool,
    reconf: AtomicBool,
    info: AtomicBool,
    wakeup: Notify,
}

impl ControlFlags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_exit(&self, signo: i32) {
        self.exit.store(signo, Ordering::Relaxed);
        self.wakeup.notify_one();
    }

    pub fn set_reopen(&self) {
        self.reopen.store(true, Ordering::Relaxed);
        self.wakeup.notify_one();
    }

    /// Reconfiguration subsumes a log reopen
    pub fn set_reconf(&self) {
        self.reconf.store(true, Ordering::Relaxed);
        self.reopen.store(true, Ordering::Relaxed);
        self.wakeup.notify_one();
    }

    pub fn set_info(&self) {
        self.info.store(true, Ordering::Relaxed);
        self.wakeup.notify_one();
    }

    /// Take the pending exit request, if any
    pub fn take_exit(&self) -> Option<i32> {
        match self.exit.swap(0, Ordering::Relaxed) {
            0 => None,
            signo => Some(signo),
        }
    }

    pub fn take_reopen(&self) -> bool {
        self.reopen.swap(false, Ordering::Relaxed)
    }

    pub fn take_reconf(&self) -> bool {
        self.reconf.swap(false, Ordering::Relaxed)
    }

    pub fn take_info(&self) -> bool {
        self.info.swap(false, Ordering::Relaxed)
    }

    /// Wait until some flag changes
    pub async fn notified(&self) {
        self.wakeup.notified().await;
    }

    /// Install the signal handlers
    ///
    /// Each handler runs as a task that only stores into the flag block and
    /// notifies; re-installation is tokio's concern.
    pub fn install(flags: &Arc<Self>) -> io::Result<()> {
        hook(flags, SignalKind::interrupt(), |flags, signo| {
            flags.set_exit(signo)
        })?;
        hook(flags, SignalKind::terminate(), |flags, signo| {
            flags.set_exit(signo)
        })?;
        hook(flags, SignalKind::hangup(), |flags, _| flags.set_reconf())?;
        hook(flags, SignalKind::user_defined1(), |flags, _| {
            flags.set_reopen()
        })?;
        hook(flags, SignalKind::user_defined2(), |flags, _| flags.set_info())?;
        #[cfg(any(
            target_os = "macos",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        hook(flags, SignalKind::info(), |flags, _| flags.set_info())?;
        Ok(())
    }
}

/// Spawn one flag-setting task for a signal kind
fn hook(
    flags: &Arc<ControlFlags>,
    kind: SignalKind,
    action: fn(&ControlFlags, i32),
) -> io::Result<()> {
    let mut stream = signal(kind)?;
    let flags = Arc::clone(flags);
    let signo = kind.as_raw_value();
    tokio::spawn(async move {
        while stream.recv().await.is_some() {
            action(&flags, signo);
        }
    });
    Ok(())
}
