//! Deferred work queues standing in for device streams.

use std::fmt;
use std::sync::{Mutex, PoisonError};

type Job = Box<dyn FnOnce() + Send>;

/// Ordered queue of enqueued kernels.
///
/// Work runs in submission order when the stream is drained by
/// `HostDevice::synchronize` or `HostDevice::join`. Streams drained together
/// by `join` run concurrently on the rayon pool.
pub struct HostStream {
    id: usize,
    queue: Mutex<Vec<Job>>,
    /// Held while drained jobs run, so a drain returns only after work
    /// taken by a concurrent drain has finished too.
    running: Mutex<()>,
}

impl HostStream {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            queue: Mutex::new(Vec::new()),
            running: Mutex::new(()),
        }
    }

    /// Stream number; `0` is the default stream.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of jobs not yet run.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn enqueue(&self, job: impl FnOnce() + Send + 'static) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(job));
    }

    /// Run everything queued so far, in order.
    pub(crate) fn drain(&self) {
        let _running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let jobs = std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner));
        for job in jobs {
            job();
        }
    }
}

impl fmt::Debug for HostStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostStream")
            .field("id", &self.id)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_jobs_run_in_order_on_drain() {
        let stream = HostStream::new(3);
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let log = Arc::clone(&log);
            stream.enqueue(move || log.lock().unwrap().push(i));
        }
        assert_eq!(stream.pending(), 4);
        assert!(log.lock().unwrap().is_empty());

        stream.drain();
        assert_eq!(stream.pending(), 0);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(stream.id(), 3);
    }
}
