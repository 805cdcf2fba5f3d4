// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring buffer for tracing DDR bring-up and test events
//!
//! This is a fixed-size record of the most recent events a driver has seen,
//! designed to be inspected from a debugger (or from a test) after the fact.
//! It is not a text logger: payloads are small `Copy` values, usually an
//! `enum`, and every entry remembers the source line that produced it.
//!
//! ## Constraints
//!
//! The type in the ring buffer must implement both `Copy` and `PartialEq`.
//!
//! ## Ownership
//!
//! Ring buffers here are plain values, owned by whatever context records
//! into them (a shell, a test runner). There is no global instance, so two
//! contexts never contend for the same buffer.
//!
//! ```
//! # use ringbuf::*;
//! #[derive(Copy, Clone, Debug, PartialEq)]
//! enum Trace {
//!     None,
//!     Wrote(u32),
//! }
//!
//! let mut trace = Ringbuf::<Trace, 8>::new(Trace::None);
//! ringbuf_entry!(trace, Trace::Wrote(0xc000_0000));
//! assert_eq!(trace.last().map(|e| e.payload), Some(Trace::Wrote(0xc000_0000)));
//! ```
//!
//! ## Inspecting a ring buffer via GDB
//!
//! Assuming symbols are loaded, print the field that owns the buffer:
//!
//! ```console
//! (gdb) set print pretty on
//! (gdb) print shell.trace
//! $1 = ringbuf::Ringbuf<drv_stm32mp_ddr_tool::Trace, 32> {
//!  last: core::option::Option<usize>::Some(3),
//!  buffer: [
//!    ringbuf::RingbufEntry<drv_stm32mp_ddr_tool::Trace> {
//!      line: 212,
//!      generation: 1,
//!      count: 1,
//!      payload: drv_stm32mp_ddr_tool::Trace::Step(DdrReady)
//!    },...
//! ```

#![cfg_attr(not(test), no_std)]

/// Inserts data into a ring buffer.
///
/// `ringbuf_entry!(buf, expr)` will insert `expr` into `buf`, tagged with the
/// line number of the macro invocation. `buf` is any place expression naming
/// a [`Ringbuf`], e.g. `self.trace`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate the payload before borrowing the buffer, so the payload
        // expression may read the same context that owns the buffer.
        let p = $payload;
        $crate::Ringbuf::entry(&mut $buf, line!() as u16, p);
    }};
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$buf;
        let _ = &$payload;
    }};
}

///
/// The structure of a single [`Ringbuf`] entry, carrying a payload of arbitrary
/// type.  When a ring buffer entry is generated with an identical payload to
/// the most recent entry (in terms of both `line` and `payload`), `count` will
/// be incremented rather than generating a new entry.
///
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

///
/// A ring buffer of parametrized type and size.
///
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    pub last: Option<usize>,
    pub buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, { N }> {
    /// Creates an empty ring buffer whose slots all hold `init`.
    pub const fn new(init: T) -> Self {
        Self {
            last: None,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: init,
            }; N],
        }
    }

    #[cfg(not(feature = "disabled"))]
    pub fn entry(&mut self, line: u16, payload: T) {
        // On first insertion last is None, which we treat as an out-of-range
        // index so that the first entry lands in slot 0 and nothing gets
        // counted against a never-written slot.
        let last = self.last.unwrap_or(usize::MAX);

        if let Some(ent) = self.buffer.get_mut(last) {
            if ent.line == line && ent.payload == payload {
                // Only reuse this entry if we don't overflow the count.
                if let Some(new_count) = ent.count.checked_add(1) {
                    ent.count = new_count;
                    return;
                }
            }
        }

        // wrapping_add turns the usize::MAX starting condition into 0 without
        // a checked arithmetic panic.
        let ndx = {
            let last_plus_1 = last.wrapping_add(1);
            if last_plus_1 >= self.buffer.len() {
                0
            } else {
                last_plus_1
            }
        };

        let Some(ent) = self.buffer.get_mut(ndx) else {
            // Only reachable for a zero-sized buffer.
            return;
        };
        *ent = RingbufEntry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };

        self.last = Some(ndx);
    }

    #[cfg(feature = "disabled")]
    pub fn entry(&mut self, _line: u16, _payload: T) {}

    /// Returns the most recently recorded entry, if any.
    pub fn last(&self) -> Option<&RingbufEntry<T>> {
        self.last.and_then(|ndx| self.buffer.get(ndx))
    }

    /// Iterates over recorded entries from oldest to newest. Slots that have
    /// never been written are skipped.
    pub fn iter(&self) -> impl Iterator<Item = &RingbufEntry<T>> + '_ {
        let start = match self.last {
            Some(last) => last + 1,
            None => N,
        };
        self.buffer[start.min(N)..]
            .iter()
            .chain(self.buffer[..start.min(N)].iter())
            .filter(|ent| ent.generation != 0)
    }
}
