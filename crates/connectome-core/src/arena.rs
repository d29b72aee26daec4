// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Scratch Arena
// ─────────────────────────────────────────────────────────────────────
//! Per-worker bump allocator over one pre-reserved `f64` region.
//!
//! Scratch buffers are carved from a [`Frame`]. Allocation splits the
//! remaining region, so every buffer is an ordinary `&mut [f64]` and any
//! number of them can be live at once. Dropping a frame rewinds every
//! allocation made through it; [`Frame::scope`] opens a nested frame whose
//! allocations are released when the closure returns, leaving the
//! parent's buffers untouched.
//!
//! Arenas are never shared: each outer grid worker owns one.

use std::cell::Cell;

use connectome_types::{ConnectomeError, ConnectomeResult};

/// Owned scratch region.
pub struct Arena {
    buf: Vec<f64>,
    peak: Cell<usize>,
}

impl Arena {
    /// Reserve `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        #[cfg(test)]
        census::created();
        Self {
            buf: vec![0.0; capacity],
            peak: Cell::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Largest number of values simultaneously in use so far.
    pub fn peak(&self) -> usize {
        self.peak.get()
    }

    /// Open the outermost frame. Everything it hands out is released when
    /// the frame is dropped.
    pub fn frame(&mut self) -> Frame<'_> {
        let capacity = self.buf.len();
        Frame {
            rest: &mut self.buf[..],
            offset: 0,
            capacity,
            peak: &self.peak,
        }
    }
}

/// Allocation window over the unused tail of an [`Arena`].
pub struct Frame<'a> {
    rest: &'a mut [f64],
    offset: usize,
    capacity: usize,
    peak: &'a Cell<usize>,
}

impl<'a> Frame<'a> {
    /// Carve `len` values. Contents are whatever the previous user left.
    pub fn alloc(&mut self, len: usize) -> ConnectomeResult<&'a mut [f64]> {
        if len > self.rest.len() {
            log::error!(
                "scratch arena overflow: {len} values requested, {} free",
                self.rest.len()
            );
            return Err(ConnectomeError::ArenaExhausted {
                requested: len,
                available: self.rest.len(),
                capacity: self.capacity,
            });
        }
        let rest = std::mem::take(&mut self.rest);
        let (head, tail) = rest.split_at_mut(len);
        self.rest = tail;
        self.offset += len;
        if self.offset > self.peak.get() {
            self.peak.set(self.offset);
        }
        Ok(head)
    }

    /// Carve `len` values set to `value`.
    pub fn alloc_filled(&mut self, len: usize, value: f64) -> ConnectomeResult<&'a mut [f64]> {
        let buf = self.alloc(len)?;
        buf.fill(value);
        Ok(buf)
    }

    /// Carve a copy of `src`.
    pub fn alloc_copy(&mut self, src: &[f64]) -> ConnectomeResult<&'a mut [f64]> {
        let buf = self.alloc(src.len())?;
        buf.copy_from_slice(src);
        Ok(buf)
    }

    /// Values still free in this frame.
    pub fn available(&self) -> usize {
        self.rest.len()
    }

    /// Nested frame over the remaining space; its allocations are rewound
    /// when the returned frame is dropped.
    pub fn sub(&mut self) -> Frame<'_> {
        Frame {
            rest: &mut self.rest[..],
            offset: self.offset,
            capacity: self.capacity,
            peak: self.peak,
        }
    }

    /// Run `f` in a nested frame and rewind afterwards.
    pub fn scope<R>(&mut self, f: impl FnOnce(&mut Frame<'_>) -> R) -> R {
        let mut sub = self.sub();
        f(&mut sub)
    }
}


#[cfg(test)]
impl Drop for Arena {
    fn drop(&mut self) {
        census::dropped();
    }
}
