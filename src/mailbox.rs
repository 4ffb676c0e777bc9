// Hands input and output snapshots between a training worker, which owns the Network, and a
// presentation surface running on another thread.
//
// Each direction is a single-slot Mailbox: posting replaces whatever has not been read yet,
// so neither side ever blocks on the other or sees a half-written vector. The surface only ever
// gets the most recently completed output.

use crate::network::Network;
use log::warn;
use ndarray::{Array1, ArrayView2};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Mailbox {
            slot: Mutex::new(None),
        }
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Mailbox<T> {
        Mailbox::default()
    }

    // A panic while holding the lock cannot leave the slot half-written, so a poisoned lock is
    // still safe to use.
    fn slot(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Stores `value`, returning the unread value it replaced, if any.
    pub fn post(&self, value: T) -> Option<T> {
        self.slot().replace(value)
    }

    pub fn take(&self) -> Option<T> {
        self.slot().take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot().is_none()
    }
}

impl<T: Clone> Mailbox<T> {
    // A copy of the stored value, leaving it in place.
    pub fn latest(&self) -> Option<T> {
        self.slot().clone()
    }
}

// Creates the two ends of a connection between a presentation surface and a training worker.
pub fn link() -> (SurfaceLink, WorkerLink) {
    let input = Arc::new(Mailbox::new());
    let output = Arc::new(Mailbox::new());
    (
        SurfaceLink {
            input: Arc::clone(&input),
            output: Arc::clone(&output),
        },
        WorkerLink { input, output },
    )
}

// The presentation surface's end: submits drawings, reads back the network's verdict.
#[derive(Debug, Clone)]
pub struct SurfaceLink {
    input: Arc<Mailbox<Array1<f64>>>,
    output: Arc<Mailbox<Array1<f64>>>,
}

impl SurfaceLink {
    pub fn submit(&self, input: Array1<f64>) {
        self.input.post(input);
    }

    // Submits a drawing canvas indexed as `canvas[[x, y]]`, flattened row by row so that pixel
    // (x, y) lands at `y * width + x`, the order the network was trained on.
    pub fn submit_canvas(&self, canvas: ArrayView2<f64>) {
        self.submit(canvas.t().iter().copied().collect());
    }

    pub fn latest_output(&self) -> Option<Array1<f64>> {
        self.output.latest()
    }
}

// The training worker's end.
#[derive(Debug)]
pub struct WorkerLink {
    input: Arc<Mailbox<Array1<f64>>>,
    output: Arc<Mailbox<Array1<f64>>>,
}

impl WorkerLink {
    // Runs the pending input snapshot, if there is one, through `network` and publishes the
    // output. Returns whether a new output was published. A snapshot that does not fit the input
    // layer is dropped.
    pub fn serve(&self, network: &mut Network) -> bool {
        let Some(input) = self.input.take() else {
            return false;
        };

        match network.infer(input.view()) {
            Ok(output) => {
                self.output.post(output.to_owned());
                true
            }
            Err(error) => {
                warn!("dropping input snapshot: {error}");
                false
            }
        }
    }
}
