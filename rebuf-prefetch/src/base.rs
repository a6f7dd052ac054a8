//! The prefetching wrapper.
use crate::{PrefetchStat, PrefetcherConfig};
use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TryRecvError};
use log::info;
use rebuf_core::{ExperienceBufferBase, ReplayBufferBase};
use std::{
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::Duration,
};

/// How long a blocked queue send waits before re-checking the stop flag.
const SEND_TIMEOUT: Duration = Duration::from_millis(100);

/// Back-off while the buffer has too little data to sample from.
const RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Wraps a replay buffer so that batch sampling overlaps with consumption.
///
/// A background thread samples batches ahead of time into a bounded queue
/// of depth `prefetch_depth`; the blocking send gives backpressure, so at
/// most that many batches are ever in flight. Batches are delivered in
/// FIFO order. `sample` drains the queue first and falls back to a
/// synchronous draw when the queue is empty, so sampling from an empty
/// buffer fails immediately instead of waiting for a producer.
///
/// All operations on the wrapped buffer run under one mutex, shared with
/// the background thread: a transition record and its priority become
/// visible to samplers atomically together, and an in-flight priority
/// update always runs to completion before teardown. Dropping the
/// prefetcher stops and joins the thread.
pub struct Prefetcher<R: ReplayBufferBase> {
    buffer: Arc<Mutex<R>>,
    batch_size: usize,
    receiver: Option<Receiver<R::Batch>>,
    stop: Arc<Mutex<bool>>,
    handle: Option<JoinHandle<()>>,
    stat: PrefetchStat,
}

impl<R> Prefetcher<R>
where
    R: ReplayBufferBase + Send + 'static,
    R::Batch: Send + 'static,
{
    /// Wraps `buffer` and, for a nonzero `prefetch_depth`, starts the
    /// background sampling thread.
    pub fn build(config: &PrefetcherConfig, buffer: R) -> Self {
        let buffer = Arc::new(Mutex::new(buffer));
        let stop = Arc::new(Mutex::new(false));
        let batch_size = config.batch_size;

        let (receiver, handle) = if config.prefetch_depth > 0 {
            let (s, r) = bounded(config.prefetch_depth);
            let thread_buffer = buffer.clone();
            let thread_stop = stop.clone();
            let handle = std::thread::spawn(move || {
                Self::run_sample_loop(thread_buffer, thread_stop, s, batch_size);
            });
            info!("Starts prefetch thread with depth {}", config.prefetch_depth);
            (Some(r), Some(handle))
        } else {
            (None, None)
        };

        Self {
            buffer,
            batch_size,
            receiver,
            stop,
            handle,
            stat: PrefetchStat::default(),
        }
    }

    /// Samples a batch, preferring a prefetched one.
    ///
    /// Falls back to a synchronous draw under the lock when the queue is
    /// empty or prefetching is disabled, so errors such as an empty buffer
    /// surface immediately.
    pub fn sample(&mut self) -> Result<R::Batch> {
        if let Some(receiver) = &self.receiver {
            match receiver.try_recv() {
                Ok(batch) => {
                    self.stat.from_queue += 1;
                    return Ok(batch);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
        }
        self.stat.synchronous += 1;
        let mut buffer = self.buffer.lock().unwrap();
        buffer.sample(self.batch_size)
    }

    /// Writes back new priorities for previously sampled transitions.
    ///
    /// Runs under the same critical section as the background sampling, so
    /// the update is atomic with respect to in-flight sample computation.
    pub fn update_priority(&mut self, ids: &[u64], priorities: &[f32]) -> Result<()> {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.update_priority(ids, priorities)
    }

    /// Counters of queue hits vs synchronous draws.
    pub fn stat(&self) -> &PrefetchStat {
        &self.stat
    }

    /// Signals the background thread to stop.
    pub fn stop(&self) {
        let mut stop = self.stop.lock().unwrap();
        *stop = true;
    }

    fn run_sample_loop(
        buffer: Arc<Mutex<R>>,
        stop: Arc<Mutex<bool>>,
        sender: Sender<R::Batch>,
        batch_size: usize,
    ) {
        'outer: loop {
            if *stop.lock().unwrap() {
                break;
            }

            let sampled = {
                let mut buffer = buffer.lock().unwrap();
                buffer.sample(batch_size)
            };

            match sampled {
                Ok(batch) => {
                    // blocking send with periodic stop checks
                    let mut pending = batch;
                    loop {
                        if *stop.lock().unwrap() {
                            break 'outer;
                        }
                        match sender.send_timeout(pending, SEND_TIMEOUT) {
                            Ok(()) => break,
                            Err(SendTimeoutError::Timeout(b)) => pending = b,
                            Err(SendTimeoutError::Disconnected(_)) => break 'outer,
                        }
                    }
                }
                // not enough data yet; try again shortly
                Err(_) => std::thread::sleep(RETRY_INTERVAL),
            }
        }
        info!("Stopped prefetch thread");
    }
}

impl<R> Prefetcher<R>
where
    R: ReplayBufferBase + ExperienceBufferBase,
{
    /// Appends a batch of transitions to the wrapped buffer.
    ///
    /// Never blocks on sampling: the lock is held only for the write
    /// itself, not for any queued sampling work.
    pub fn extend(&mut self, batch: <R as ExperienceBufferBase>::Item) -> Result<Vec<u64>> {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.extend(batch)
    }

    /// Current number of stored transitions.
    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    /// Returns `true` when no transitions are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: ReplayBufferBase> Drop for Prefetcher<R> {
    fn drop(&mut self) {
        {
            let mut stop = self.stop.lock().unwrap();
            *stop = true;
        }
        // disconnect the queue so a blocked send returns
        self.receiver.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
