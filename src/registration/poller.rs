//! Background registration status checks
//!
//! Queries the host's module list on a fixed interval and pushes the result
//! to the control thread. The sleep is split into short slices so a stop or
//! forced check is noticed quickly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::constants::polling::{INTERVAL_MS, SLICE_MS};
use crate::logging::LogContext;
use crate::registration::{RegistrationEvent, SystemShell, query_state};

/// Shared flag asking the poller to check now instead of at the next interval
#[derive(Debug, Clone, Default)]
pub struct ForceCheck(Arc<AtomicBool>);

impl ForceCheck {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollerTiming {
    pub interval: Duration,
    pub slice: Duration,
}

impl Default for PollerTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(INTERVAL_MS),
            slice: Duration::from_millis(SLICE_MS),
        }
    }
}

pub struct StatusPoller {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    /// Start polling; the first check runs immediately
    pub fn spawn(
        shell: Arc<dyn SystemShell>,
        component_name: String,
        timing: PollerTiming,
        force_check: ForceCheck,
        events: Sender<RegistrationEvent>,
        log: LogContext,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("status-poller".to_string())
            .spawn(move || {
                log.in_scope(|| {
                    poll_loop(
                        shell.as_ref(),
                        &component_name,
                        timing,
                        &thread_running,
                        &force_check,
                        &events,
                    )
                })
            })?;

        info!(interval_ms = timing.interval.as_millis() as u64, "Status poller started");
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Signal the loop to exit and wait for it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Status poller thread panicked");
            } else {
                info!("Status poller stopped");
            }
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(
    shell: &dyn SystemShell,
    component_name: &str,
    timing: PollerTiming,
    running: &AtomicBool,
    force_check: &ForceCheck,
    events: &Sender<RegistrationEvent>,
) {
    while running.load(Ordering::SeqCst) {
        force_check.take();
        match query_state(shell, component_name) {
            Ok(state) => {
                debug!(?state, "Polled registration state");
                if events.send(RegistrationEvent::Status(state)).is_err() {
                    warn!("Control thread gone, stopping status poller");
                    break;
                }
            }
            Err(e) => error!(error = %e, "Registration status query failed"),
        }

        let started = Instant::now();
        while running.load(Ordering::SeqCst)
            && !force_check.is_requested()
            && started.elapsed() < timing.interval
        {
            thread::sleep(timing.slice);
        }
    }
    debug!("Status poll loop exited");
}
