use std::mem;

use parking_lot::Mutex;

use crate::models::error::{BufferError, BufferStatus};

/// Result of a [`RingBuffer::write`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Elements copied into the buffer (always the full input).
    pub written: usize,
    /// Unread elements evicted to make room.
    pub dropped: usize,
}

impl WriteOutcome {
    pub fn overflowed(&self) -> bool {
        self.dropped > 0
    }

    pub fn status(&self) -> BufferStatus {
        if self.overflowed() {
            BufferStatus::WriteOverflow
        } else {
            BufferStatus::Success
        }
    }
}

/// Result of a [`RingBuffer::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Elements copied into the output slice.
    pub copied: usize,
    /// Elements the caller asked for.
    pub requested: usize,
}

impl ReadOutcome {
    pub fn is_complete(&self) -> bool {
        self.copied == self.requested
    }

    pub fn status(&self) -> BufferStatus {
        if self.is_complete() {
            BufferStatus::Success
        } else if self.copied == 0 {
            BufferStatus::ReadEmpty
        } else {
            BufferStatus::ReadIncomplete
        }
    }
}

#[derive(Debug)]
struct RingState<T> {
    storage: Vec<T>,
    write_index: usize,
    read_index: usize,
    count: usize,
}

/// Thread-safe circular buffer with a fixed capacity and element stride.
///
/// One producer writes, readers drain. All index arithmetic and copies run
/// under a single lock, and neither `write` nor `read` ever sleeps: a read
/// returns whatever is available right now (snapshot read). Retrying until
/// enough data arrives is left to the caller.
///
/// Overflow behavior: drops the oldest unread elements, one for each new
/// element that does not fit.
#[derive(Debug)]
pub struct RingBuffer<T> {
    state: Mutex<RingState<T>>,
    capacity: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidArgument("capacity must be positive"));
        }
        if mem::size_of::<T>() == 0 {
            return Err(BufferError::InvalidArgument("element size must be positive"));
        }

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| BufferError::OutOfMemory)?;
        storage.resize(capacity, T::default());

        Ok(Self {
            state: Mutex::new(RingState {
                storage,
                write_index: 0,
                read_index: 0,
                count: 0,
            }),
            capacity,
        })
    }

    /// Copy all of `samples` into the buffer.
    ///
    /// When the buffer fills up mid-copy, each further element evicts the
    /// oldest unread one. Input longer than the capacity is accepted and
    /// leaves only its last `capacity` elements readable.
    pub fn write(&self, samples: &[T]) -> Result<WriteOutcome, BufferError> {
        if samples.is_empty() {
            return Err(BufferError::InvalidArgument("write of zero elements"));
        }

        let mut s = self.state.lock();
        let mut dropped = 0;
        for &sample in samples {
            if s.count == self.capacity {
                s.read_index = (s.read_index + 1) % self.capacity;
                s.count -= 1;
                dropped += 1;
            }
            let index = s.write_index;
            s.storage[index] = sample;
            s.write_index = (index + 1) % self.capacity;
            s.count += 1;
        }

        Ok(WriteOutcome {
            written: samples.len(),
            dropped,
        })
    }

    /// Move up to `out.len()` elements into `out`, oldest first.
    ///
    /// Never waits for data; the outcome says how many were copied.
    pub fn read(&self, out: &mut [T]) -> Result<ReadOutcome, BufferError> {
        if out.is_empty() {
            return Err(BufferError::InvalidArgument("read of zero elements"));
        }

        let mut s = self.state.lock();
        let to_read = out.len().min(s.count);
        if to_read > 0 {
            let start = s.read_index;
            let head = to_read.min(self.capacity - start);
            out[..head].copy_from_slice(&s.storage[start..start + head]);
            out[head..to_read].copy_from_slice(&s.storage[..to_read - head]);
            s.read_index = (start + to_read) % self.capacity;
            s.count -= to_read;
        }

        Ok(ReadOutcome {
            copied: to_read,
            requested: out.len(),
        })
    }

    /// Discard all unread elements.
    ///
    /// Storage contents are left as they are; they are simply no longer
    /// readable.
    pub fn reset(&self) {
        let mut s = self.state.lock();
        s.write_index = 0;
        s.read_index = 0;
        s.count = 0;
    }

    /// Number of elements currently available for reading.
    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per element.
    pub fn element_size(&self) -> usize {
        mem::size_of::<T>()
    }
}
