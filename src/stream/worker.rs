//! Acquisition thread shared by every vendor stream
//!
//! Each stream owns one `Acquisition`. `start` runs the vendor's blocking
//! read on a dedicated thread; `stop` asks the vendor to cancel that read,
//! then joins the thread.
//!
//! Vendor reads only accept a cancel once they are active, so the read
//! reports that point through [`Delivery::arm`] and `stop` waits for it
//! before cancelling.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{SdrCallback, SdrTransfer};
use crate::error::{NativeResult, Result};
use crate::host::HostType;

/// Counters for one acquisition run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionStats {
    pub buffers: u64,
    pub samples: u64,
    pub dropped_samples: u64,
}

/// Statistics for the acquisition thread (atomic for thread-safe access)
#[derive(Debug, Default)]
struct TransferCounters {
    buffers: AtomicU64,
    samples: AtomicU64,
    dropped_samples: AtomicU64,
}

impl TransferCounters {
    fn record(&self, transfer: &SdrTransfer<'_>) {
        self.buffers.fetch_add(1, Ordering::Relaxed);
        self.samples
            .fetch_add(transfer.frame_size as u64, Ordering::Relaxed);
        self.dropped_samples
            .fetch_add(transfer.dropped_samples, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.buffers.store(0, Ordering::Relaxed);
        self.samples.store(0, Ordering::Relaxed);
        self.dropped_samples.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self) -> AcquisitionStats {
        AcquisitionStats {
            buffers: self.buffers.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            dropped_samples: self.dropped_samples.load(Ordering::Relaxed),
        }
    }
}

type CallbackSlot = Arc<Mutex<Option<SdrCallback>>>;

/// Cancel attempts made by [`Acquisition::shutdown`] before giving up
const SHUTDOWN_ATTEMPTS: u32 = 5;
const SHUTDOWN_RETRY: Duration = Duration::from_millis(10);

/// Handle given to the acquisition thread for forwarding buffers
#[derive(Clone)]
pub(crate) struct Delivery {
    callback: CallbackSlot,
    counters: Arc<TransferCounters>,
    armed: Sender<()>,
}

impl Delivery {
    /// Mark the vendor read as active and cancellable. Idempotent.
    pub fn arm(&self) {
        let _ = self.armed.try_send(());
    }

    /// Count the buffer and run the callback synchronously
    pub fn deliver(&self, transfer: &SdrTransfer<'_>) {
        self.counters.record(transfer);

        let mut slot = self
            .callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(callback) = slot.as_mut() {
            callback(transfer);
        }
    }
}

pub(crate) struct Acquisition {
    vendor: HostType,
    callback: CallbackSlot,
    counters: Arc<TransferCounters>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    /// Pending until the current read arms, or its thread ends unarmed
    armed: Option<Receiver<()>>,
}

impl Acquisition {
    pub fn new(vendor: HostType) -> Self {
        Self {
            vendor,
            callback: Arc::new(Mutex::new(None)),
            counters: Arc::new(TransferCounters::default()),
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            armed: None,
        }
    }

    pub fn set_callback(&self, callback: SdrCallback) {
        *self.callback_slot() = Some(callback);
    }

    fn callback_slot(&self) -> MutexGuard<'_, Option<SdrCallback>> {
        self.callback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Thread spawned and its read loop still running
    pub fn is_streaming(&self) -> bool {
        self.thread.is_some() && self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.counters.snapshot()
    }

    /// Spawn the acquisition thread running `read` until it returns.
    ///
    /// `read` wraps the vendor's blocking asynchronous read and must call
    /// [`Delivery::arm`] once that read can be cancelled. No-op if a read
    /// loop is already running; a thread whose loop already ended (native
    /// failure) is joined and replaced.
    pub fn start<F>(&mut self, read: F) -> Result<()>
    where
        F: FnOnce(Delivery) -> NativeResult<()> + Send + 'static,
    {
        if self.is_streaming() {
            debug!("{} acquisition already running", self.vendor);
            return Ok(());
        }
        self.join();

        self.counters.reset();
        self.running.store(true, Ordering::SeqCst);

        let (armed_tx, armed_rx) = bounded(1);
        let delivery = Delivery {
            callback: self.callback.clone(),
            counters: self.counters.clone(),
            armed: armed_tx,
        };
        let running = self.running.clone();
        let vendor = self.vendor;

        let spawned = thread::Builder::new()
            .name(format!("{}-rx", vendor).to_lowercase().replace(' ', "-"))
            .spawn(move || {
                if let Err(code) = read(delivery) {
                    error!("{} asynchronous read failed with code {}", vendor, code);
                }
                running.store(false, Ordering::SeqCst);
            });

        match spawned {
            Ok(handle) => {
                self.thread = Some(handle);
                self.armed = Some(armed_rx);
                info!("{} acquisition started", self.vendor);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Cancel the read loop with `cancel` and join the thread.
    ///
    /// Blocks until the read has armed (or ended without arming) so the
    /// cancel is never issued against a read that has not started. If
    /// `cancel` fails while the loop is still running, the thread is left
    /// running and the error returned.
    pub fn stop<C>(&mut self, cancel: C) -> Result<()>
    where
        C: FnOnce() -> Result<()>,
    {
        if self.thread.is_none() {
            return Ok(());
        }

        // Err means every sender is gone: the read ended before arming
        let armed = match self.armed.take() {
            Some(armed) => armed.recv().is_ok(),
            None => true,
        };

        if armed && self.running.load(Ordering::SeqCst) {
            if let Err(e) = cancel() {
                if self.running.load(Ordering::SeqCst) {
                    return Err(e);
                }
                debug!("{} read ended before cancel: {}", self.vendor, e);
            }
        }
        self.join();

        info!("{} acquisition stopped", self.vendor);
        Ok(())
    }

    /// Stop for teardown: retry a failing cancel a few times, then detach
    /// the thread with the callback removed so nothing is delivered after
    /// the owning stream is gone.
    pub fn shutdown<C>(&mut self, cancel: C)
    where
        C: Fn() -> Result<()>,
    {
        for attempt in 1..=SHUTDOWN_ATTEMPTS {
            match self.stop(&cancel) {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        "{} cancel failed (attempt {}/{}): {}",
                        self.vendor, attempt, SHUTDOWN_ATTEMPTS, e
                    );
                    thread::sleep(SHUTDOWN_RETRY);
                }
            }
        }

        *self.callback_slot() = None;
        if self.thread.take().is_some() {
            error!(
                "{} acquisition thread could not be cancelled, detaching it",
                self.vendor
            );
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("{} acquisition thread panicked", self.vendor);
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}
