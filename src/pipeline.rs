//! # Streaming Pipeline
//!
//! One producer maps the input in fixed strides and feeds a bounded queue;
//! `W` consumers scan chunk bodies into private shards. Lines that straddle
//! chunk boundaries are reassembled in file order in the producer's overflow
//! buffer, which the shutdown sentinel hands to exactly one consumer.
//!
//! The queue bound `M` adapts once per produced chunk: it grows while
//! consumers are observed waiting at the get side and shrinks otherwise,
//! clamped to the configured floor and ceiling. Memory in flight is bounded
//! by `M × stride` plus the overflow buffer and the shard tables.

use crate::config::PipelineTuning;
use crate::error::TallyError;
use crate::mapper::{page_size, ChunkedReader, MappedChunk};
use crate::shard::Shard;
use memchr::{memchr, memrchr};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Barrier;
use std::thread;
use tracing::{debug, info, trace};

/// Item handed from the producer to a consumer.
enum QueueItem {
    /// A raw mapped window whose body (the complete interior lines) is
    /// pending.
    Chunk(MappedChunk),
    /// Shutdown sentinel carrying the reassembled boundary lines.
    Drain(Vec<u8>),
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<QueueItem>,
    waiting: usize,
    stopped: bool,
}

/// Bounded FIFO between the producer and the consumers.
///
/// One lock guards the deque, the waiting counter, and the stop flag;
/// `can_put` and `can_get` are the only suspension points. The capacity
/// bound is owned by the producer and passed into `put`, which is what lets
/// it adapt without a second lock acquisition.
struct ChunkQueue {
    state: Mutex<QueueState>,
    can_put: Condvar,
    can_get: Condvar,
}

impl ChunkQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            can_put: Condvar::new(),
            can_get: Condvar::new(),
        }
    }

    /// Enqueue a chunk once there is room or a consumer is already waiting.
    ///
    /// Returns `Ok(consumer_waiting)` as observed at enqueue time (the
    /// signal the producer adapts its bound on), or `Err(())` once stopped.
    fn put(&self, chunk: MappedChunk, bound: usize) -> Result<bool, ()> {
        let mut state = self.state.lock();
        while state.items.len() >= bound && state.waiting == 0 && !state.stopped {
            self.can_put.wait(&mut state);
        }
        if state.stopped {
            return Err(());
        }
        state.items.push_back(QueueItem::Chunk(chunk));
        let waiting = state.waiting > 0;
        drop(state);
        self.can_get.notify_all();
        Ok(waiting)
    }

    /// Enqueue the shutdown sentinel. Ignores the capacity bound so the
    /// drain item always goes through.
    fn put_drain(&self, overflow: Vec<u8>) {
        let mut state = self.state.lock();
        state.items.push_back(QueueItem::Drain(overflow));
        drop(state);
        self.can_get.notify_all();
    }

    /// Dequeue the next item, or `None` once stopped with an empty queue.
    fn get(&self) -> Option<QueueItem> {
        let mut state = self.state.lock();
        state.waiting += 1;
        while state.items.is_empty() && !state.stopped {
            self.can_get.wait(&mut state);
        }
        let item = state.items.pop_front();
        state.waiting -= 1;
        drop(state);
        self.can_put.notify_one();
        item
    }

    /// Raise the stop flag and wake every blocked thread.
    fn stop(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        drop(state);
        self.can_get.notify_all();
        self.can_put.notify_all();
    }
}

/// First-error slot shared by the workers; the main thread re-raises it.
#[derive(Default)]
struct ErrorSlot(Mutex<Option<TallyError>>);

impl ErrorSlot {
    fn record(&self, err: TallyError) {
        let mut slot = self.0.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take(&self) -> Option<TallyError> {
        self.0.lock().take()
    }
}

/// Run the bounded producer/consumer pipeline over `reader` and return one
/// shard per consumer.
pub fn run(reader: &ChunkedReader, tuning: &PipelineTuning) -> Result<Vec<Shard>, TallyError> {
    let workers = tuning.resolved_workers();
    let stride = tuning.resolved_stride(page_size());
    let (floor, start, ceil) = tuning.queue_bounds(workers);

    info!(workers, stride, input_len = reader.len(), "starting streaming ingest");

    let queue = ChunkQueue::new();
    let errors = ErrorSlot::default();
    let barrier = Barrier::new(workers + 2);

    let shards = thread::scope(|scope| -> Result<Vec<Shard>, TallyError> {
        let queue = &queue;
        let errors = &errors;
        let barrier = &barrier;

        let producer = scope.spawn(move || {
            produce(reader, queue, errors, stride, floor, start, ceil);
            barrier.wait();
        });

        let consumers: Vec<_> = (0..workers)
            .map(|worker| {
                let capacity = tuning.shard_capacity;
                scope.spawn(move || {
                    let shard = consume(worker, queue, errors, capacity);
                    barrier.wait();
                    shard
                })
            })
            .collect();

        barrier.wait();

        // Every worker has arrived at the barrier; joins cannot block.
        producer.join().map_err(|_| {
            TallyError::InternalInvariantViolated("producer thread panicked".into())
        })?;
        let mut shards = Vec::with_capacity(workers);
        for handle in consumers {
            shards.push(handle.join().map_err(|_| {
                TallyError::InternalInvariantViolated("consumer thread panicked".into())
            })?);
        }
        Ok(shards)
    })?;

    if let Some(err) = errors.take() {
        return Err(err);
    }
    info!(shards = shards.len(), "streaming ingest complete");
    Ok(shards)
}

/// Producer loop: map chunks in file order, siphon each chunk's head and
/// tail into the overflow buffer, enqueue bodies under the adaptive bound,
/// and finish with the drain sentinel.
fn produce(
    reader: &ChunkedReader,
    queue: &ChunkQueue,
    errors: &ErrorSlot,
    stride: usize,
    floor: usize,
    start: usize,
    ceil: usize,
) {
    let mut bound = start;
    let mut overflow: Vec<u8> = Vec::new();
    if overflow.try_reserve(stride).is_err() {
        errors.record(TallyError::OutOfMemory {
            context: "reserving the overflow buffer",
        });
        queue.stop();
        queue.put_drain(overflow);
        return;
    }

    for chunk in reader.chunks(stride) {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                errors.record(err);
                queue.stop();
                break;
            }
        };

        let Some(first) = memchr(b'\n', &chunk) else {
            // No line break at all: the entire window is boundary bytes.
            overflow.extend_from_slice(&chunk);
            continue;
        };
        let last = memrchr(b'\n', &chunk).unwrap_or(first);
        overflow.extend_from_slice(&chunk[..=first]);
        overflow.extend_from_slice(&chunk[last + 1..]);
        if last == first {
            continue;
        }

        match queue.put(chunk, bound) {
            Ok(waiting) => {
                bound = if waiting {
                    (bound + 1).min(ceil)
                } else {
                    bound.saturating_sub(1).max(floor)
                };
                trace!(bound, "adapted queue bound");
            }
            Err(()) => break,
        }
    }

    queue.put_drain(overflow);
}

/// Consumer loop: scan the body of each dequeued chunk into the private
/// shard. The consumer that dequeues the sentinel also scans the overflow
/// buffer, raises stop, and wakes everyone else.
fn consume(worker: usize, queue: &ChunkQueue, errors: &ErrorSlot, capacity: usize) -> Shard {
    let mut shard = match Shard::with_capacity(capacity) {
        Ok(shard) => shard,
        Err(err) => {
            errors.record(err);
            queue.stop();
            return Shard::default();
        }
    };

    while let Some(item) = queue.get() {
        match item {
            QueueItem::Chunk(chunk) => {
                let Some(first) = memchr(b'\n', &chunk) else {
                    continue;
                };
                let last = memrchr(b'\n', &chunk).unwrap_or(first);
                if last == first {
                    continue;
                }
                if let Err(err) = shard.consume_lines(&chunk[first + 1..last]) {
                    errors.record(err);
                    queue.stop();
                    break;
                }
            }
            QueueItem::Drain(overflow) => {
                if let Err(err) = shard.consume_lines(&overflow) {
                    errors.record(err);
                }
                queue.stop();
                break;
            }
        }
    }

    debug!(worker, names = shard.len(), "consumer drained");
    shard
}
