//! Message queue implementation
//!
//! Bounded FIFO of fixed-size elements copied into a byte buffer owned by
//! the queue. Like the semaphore it tracks a single waiting receiver and
//! wakes it through the tick.

use crate::config::CFG_QUEUE_SIZE_BYTES;
use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel::{check_may_block, Kernel, KERNEL};
use crate::port;
use crate::types::{OsTick, TaskRef};

/// Queue state
#[derive(Debug)]
pub struct OsQueue {
    buf: [u8; CFG_QUEUE_SIZE_BYTES],
    elem_size: usize,
    capacity: usize,
    /// Byte offset of the oldest element
    head: usize,
    /// Byte offset where the next element goes
    tail: usize,
    count: usize,
    waiter: Option<TaskRef>,
}

impl OsQueue {
    pub const fn new() -> Self {
        OsQueue {
            buf: [0; CFG_QUEUE_SIZE_BYTES],
            elem_size: 0,
            capacity: 0,
            head: 0,
            tail: 0,
            count: 0,
            waiter: None,
        }
    }

    /// Size the queue for elements of `elem_size` bytes
    ///
    /// # Returns
    /// * `Err(OsError::InvalidArgument)` - Zero or larger than the buffer
    pub fn init(&mut self, elem_size: usize) -> OsResult<()> {
        if elem_size == 0 || elem_size > CFG_QUEUE_SIZE_BYTES {
            return Err(OsError::InvalidArgument);
        }

        self.elem_size = elem_size;
        self.capacity = CFG_QUEUE_SIZE_BYTES / elem_size;
        self.head = 0;
        self.tail = 0;
        self.count = 0;
        self.waiter = None;
        Ok(())
    }

    /// Bytes in use by the ring
    #[inline]
    fn ring_len(&self) -> usize {
        self.capacity * self.elem_size
    }

    /// Append one element and wake the waiting receiver
    ///
    /// # Returns
    /// * `Err(OsError::InvalidArgument)` - `data` is not one element long
    /// * `Err(OsError::OperationFailed)` - Queue full, the buffer is unchanged
    pub fn send(&mut self, k: &mut Kernel, data: &[u8]) -> OsResult<()> {
        if data.len() != self.elem_size {
            return Err(OsError::InvalidArgument);
        }

        if let Some(waiter) = self.waiter.take() {
            k.wake(waiter);
        }

        if self.count >= self.capacity {
            crate::trace!("queue full");
            return Err(OsError::OperationFailed);
        }

        self.buf[self.tail..self.tail + self.elem_size].copy_from_slice(data);
        self.tail = (self.tail + self.elem_size) % self.ring_len();
        self.count += 1;
        Ok(())
    }

    /// First half of a receive, run by the caller's task
    ///
    /// Records the current task as waiter. When the queue is empty and
    /// `ticks > 0` the task blocks for up to `ticks`.
    ///
    /// # Returns
    /// * `Ok(true)` - The caller blocked and must request a switch
    /// * `Ok(false)` - Finish right away
    /// * `Err(OsError::InvalidArgument)` - `out_len` is not one element long
    pub fn begin_receive(&mut self, k: &mut Kernel, out_len: usize, ticks: OsTick) -> OsResult<bool> {
        if out_len != self.elem_size {
            return Err(OsError::InvalidArgument);
        }

        self.waiter = k.current();

        if self.count > 0 || ticks == 0 {
            return Ok(false);
        }

        if let Err(err) = k.block_current(ticks) {
            self.waiter = None;
            return Err(err);
        }
        k.decide();
        Ok(true)
    }

    /// Second half of a receive: copy the oldest element into `out`
    ///
    /// `waited` tells whether the caller blocked in between.
    ///
    /// # Returns
    /// * `Err(OsError::Timeout)` - Woke up and the queue is still empty
    /// * `Err(OsError::QueueEmpty)` - Did not wait and the queue is empty
    pub fn finish_receive(&mut self, out: &mut [u8], waited: bool) -> OsResult<()> {
        self.waiter = None;

        if self.count == 0 {
            return Err(if waited { OsError::Timeout } else { OsError::QueueEmpty });
        }
        if out.len() != self.elem_size {
            return Err(OsError::InvalidArgument);
        }

        out.copy_from_slice(&self.buf[self.head..self.head + self.elem_size]);
        self.head = (self.head + self.elem_size) % self.ring_len();
        self.count -= 1;

        if self.count == 0 {
            self.head = 0;
            self.tail = 0;
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    /// Number of elements the queue holds
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    #[inline]
    pub fn waiter(&self) -> Option<TaskRef> {
        self.waiter
    }
}

impl Default for OsQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Safe Wrapper ============

/// Queue usable from a `static`
pub struct Queue {
    inner: CsCell<OsQueue>,
}

impl Queue {
    pub const fn new() -> Self {
        Queue { inner: CsCell::new(OsQueue::new()) }
    }

    pub fn init(&self, elem_size: usize) -> OsResult<()> {
        self.inner.with(|q| q.init(elem_size))
    }

    /// Copy one element in; never blocks, callable from interrupts
    pub fn send(&self, data: &[u8]) -> OsResult<()> {
        critical_section(|cs| self.inner.get(cs).send(KERNEL.get(cs), data))
    }

    /// Copy the oldest element into `out`, waiting up to `ticks` when empty
    ///
    /// `ticks == 0` never blocks; `OS_TICK_INFINITE` waits for a send.
    ///
    /// # Returns
    /// * `Err(OsError::QueueEmpty)` - Empty and `ticks == 0`
    /// * `Err(OsError::Timeout)` - Still empty after waiting
    /// * `Err(OsError::NotRunning)` - Waiting requested before the scheduler started
    /// * `Err(OsError::OperationFailed)` - Waiting requested from an interrupt,
    ///   inside a critical section or from the idle task
    pub fn receive(&self, out: &mut [u8], ticks: OsTick) -> OsResult<()> {
        if ticks > 0 {
            check_may_block()?;
        }

        let waited = critical_section(|cs| {
            let k = KERNEL.get(cs);
            if ticks > 0 && !k.is_running() {
                return Err(OsError::NotRunning);
            }
            self.inner.get(cs).begin_receive(k, out.len(), ticks)
        })?;

        if waited {
            port::request_context_switch();
        }

        self.inner.with(|q| q.finish_receive(out, waited))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.with(|q| q.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.with(|q| q.is_empty())
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.with(|q| q.is_full())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.with(|q| q.capacity())
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}
