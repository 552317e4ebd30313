//! Caller-facing handle for an in-flight batch.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread::JoinHandle;

use crate::runner::CancelToken;

use super::types::ItemReport;

/// Handle to a submitted batch.
///
/// Reports arrive in completion order, one per submitted item, as each item
/// finishes. Dropping the handle without calling [`wait`](Self::wait)
/// detaches the batch: processing continues in the background and outputs
/// are still written, but reports are discarded.
pub struct BatchHandle {
    receiver: Receiver<ItemReport>,
    cancel: CancelToken,
    driver: Option<JoinHandle<()>>,
}

impl BatchHandle {
    pub(crate) fn new(
        receiver: Receiver<ItemReport>,
        cancel: CancelToken,
        driver: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            cancel,
            driver: Some(driver),
        }
    }

    /// Request cancellation of the whole batch.
    ///
    /// Propagates to every in-flight job; items that have not reached a
    /// terminal phase resolve to a cancelled failure. Already-completed
    /// items keep their result.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the batch's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Block for the next report; `None` once every item has reported.
    pub fn next_report(&self) -> Option<ItemReport> {
        self.receiver.recv().ok()
    }

    /// Non-blocking poll for a report.
    pub fn try_next(&self) -> Option<ItemReport> {
        match self.receiver.try_recv() {
            Ok(report) => Some(report),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Lazy iterator over reports in completion order.
    pub fn iter(&self) -> impl Iterator<Item = ItemReport> + '_ {
        std::iter::from_fn(move || self.next_report())
    }

    /// Drain all remaining reports and join the batch driver.
    pub fn wait(mut self) -> Vec<ItemReport> {
        let mut reports: Vec<ItemReport> = self.iter().collect();
        if let Some(driver) = self.driver.take() {
            if driver.join().is_err() {
                tracing::error!("Batch driver thread panicked");
            }
        }
        // Late sends between channel close and join.
        while let Some(report) = self.try_next() {
            reports.push(report);
        }
        reports
    }
}
