// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parameter defaults and validation, shared by every test.

use crate::bus::{DdrBus, Word};
use crate::{DdrConfig, Failure, Trace, TRACE_DEPTH};
use core::fmt::{self, Write};
use ringbuf::{ringbuf_entry, Ringbuf};

/// What the caller asked for. Zero in any field means "use the test's
/// default".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TestParams {
    pub loop_count: u64,
    pub size: u64,
    pub addr: u64,
}

impl TestParams {
    pub fn new(loop_count: u64, size: u64, addr: u64) -> Self {
        Self {
            loop_count,
            size,
            addr,
        }
    }
}

/// How many rounds a looping test runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Loops {
    Finite(u32),
    Infinite,
}

impl Loops {
    /// Loop count that explicitly asks for a test that never ends.
    pub const INFINITE: u64 = 0xffff_ffff;

    /// Resolves a requested count: `0` gives `default`, anything at or
    /// beyond [`Loops::INFINITE`] runs forever.
    pub fn resolve(requested: u64, default: u32) -> Self {
        match requested {
            0 => Loops::Finite(default),
            n if n >= Self::INFINITE => Loops::Infinite,
            n => Loops::Finite(n as u32),
        }
    }

    /// Whether `done` completed rounds are enough.
    pub fn finished(self, done: u64) -> bool {
        match self {
            Loops::Finite(n) => done >= u64::from(n),
            Loops::Infinite => false,
        }
    }
}

impl fmt::Display for Loops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loops::Finite(n) => write!(f, "{n}"),
            Loops::Infinite => write!(f, "infinite"),
        }
    }
}

/// Size constraints of one test, in bytes.
#[derive(Copy, Clone, Debug)]
pub(crate) struct SizeRule {
    pub default: usize,
    pub min: usize,
    pub align: usize,
}

impl SizeRule {
    /// The common case: 4 KiB by default, any whole number of `align`-byte
    /// units.
    pub fn kib4(align: usize) -> Self {
        Self {
            default: 4 * 1024,
            min: align,
            align,
        }
    }
}

/// One test invocation's view of the world.
pub(crate) struct Run<'a, B: DdrBus> {
    pub bus: &'a mut B,
    pub config: &'a DdrConfig,
    pub out: &'a mut dyn Write,
    pub trace: &'a mut Ringbuf<Trace, TRACE_DEPTH>,
}

pub(crate) type WordOf<B> = <B as DdrBus>::Word;

impl<B: DdrBus> Run<'_, B> {
    /// Resolves and validates a region size. Nothing is touched on failure.
    pub fn size(
        &mut self,
        requested: u64,
        rule: SizeRule,
    ) -> Result<usize, Failure> {
        let max = self.config.size as u64;
        let size = if requested == 0 {
            rule.default.min(self.config.size) as u64
        } else {
            requested
        };

        if size < rule.min as u64
            || size > max
            || size % rule.align as u64 != 0
        {
            let _ = writeln!(
                self.out,
                "invalid size 0x{size:x}: expecting 0x{:x}..=0x{max:x}, \
                 multiple of 0x{:x}",
                rule.min, rule.align,
            );
            return Err(Failure::BadSize);
        }
        Ok(size as usize)
    }

    /// Resolves and validates a start address for a region of `span` bytes.
    /// The region has to lie within DDR and start on a word boundary.
    pub fn addr(
        &mut self,
        requested: u64,
        span: usize,
        code: u8,
    ) -> Result<usize, Failure> {
        let base = self.config.base as u64;
        let size = self.config.size as u64;
        let addr = if requested == 0 { base } else { requested };
        let align = WordOf::<B>::BYTES as u64;

        // Offsets into DDR; the region may end at the top of the address
        // space.
        let fits = addr.checked_sub(base).is_some_and(|offset| {
            offset < size && span as u64 <= size - offset
        });
        if addr % align != 0 || !fits {
            let _ = writeln!(
                self.out,
                "invalid address 0x{addr:x}: expecting 0x{align:x}-aligned \
                 region of 0x{span:x} bytes in 0x{size:x} bytes at 0x{base:x}",
            );
            return Err(Failure::BadAddress(code));
        }

        ringbuf_entry!(
            *self.trace,
            Trace::Resolved {
                size: span,
                addr: addr as usize,
            }
        );
        Ok(addr as usize)
    }

    /// Resolves a loop count, warning when it will never end.
    pub fn loops(&mut self, requested: u64, default: u32) -> Loops {
        let loops = Loops::resolve(requested, default);
        if loops == Loops::Infinite {
            ringbuf_entry!(*self.trace, Trace::InfiniteLoop);
            let _ = writeln!(self.out, "infinite loop requested");
        }
        loops
    }

    /// Reads `addr` and compares against `expected`.
    pub fn check(
        &mut self,
        addr: usize,
        expected: WordOf<B>,
        code: u8,
    ) -> Result<(), Failure> {
        let actual = self.bus.read(addr);
        if actual != expected {
            return Err(self.mismatch(addr, expected, actual, code));
        }
        Ok(())
    }

    /// Reports a data fault at `addr`.
    pub fn mismatch(
        &mut self,
        addr: usize,
        expected: WordOf<B>,
        actual: WordOf<B>,
        code: u8,
    ) -> Failure {
        ringbuf_entry!(*self.trace, Trace::Mismatch { addr });
        let digits = WordOf::<B>::BYTES * 2;
        let _ = writeln!(
            self.out,
            "error at 0x{addr:08x}: read 0x{actual:0digits$x} \
             expected 0x{expected:0digits$x}",
        );
        Failure::Mismatch(code)
    }

    /// Writes `value(i)` to each of the `words` words starting at `addr`.
    pub fn fill(
        &mut self,
        addr: usize,
        words: usize,
        mut value: impl FnMut(usize) -> WordOf<B>,
    ) {
        let step = WordOf::<B>::BYTES;
        for i in 0..words {
            self.bus.write(addr + i * step, value(i));
        }
    }

    /// Checks each of the `words` words starting at `addr` against
    /// `value(i)`, stopping at the first difference.
    pub fn verify(
        &mut self,
        addr: usize,
        words: usize,
        mut value: impl FnMut(usize) -> WordOf<B>,
        code: u8,
    ) -> Result<(), Failure> {
        let step = WordOf::<B>::BYTES;
        for i in 0..words {
            self.check(addr + i * step, value(i), code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDdr;
    use alloc::string::String;
    use proptest::prelude::*;

    const BASE: usize = 0xc000_0000;
    const SIZE: usize = 0x1_0000;

    fn with_run<T>(
        f: impl FnOnce(&mut Run<'_, MockDdr<u32>>) -> T,
    ) -> (T, String, MockDdr<u32>) {
        let mut bus = MockDdr::new(BASE, SIZE);
        let config = DdrConfig {
            base: BASE,
            size: SIZE,
        };
        let mut out = String::new();
        let mut trace = Ringbuf::new(Trace::None);
        let mut run = Run {
            bus: &mut bus,
            config: &config,
            out: &mut out,
            trace: &mut trace,
        };
        let r = f(&mut run);
        (r, out, bus)
    }

    #[test]
    fn zero_size_takes_default() {
        let (r, _, _) = with_run(|run| run.size(0, SizeRule::kib4(4)));
        assert_eq!(r, Ok(4096));
    }

    #[test]
    fn default_is_clamped_to_ddr() {
        let rule = SizeRule {
            default: 0x10_0000,
            min: 4,
            align: 4,
        };
        let (r, _, _) = with_run(|run| run.size(0, rule));
        assert_eq!(r, Ok(SIZE));
    }

    #[test]
    fn bad_sizes_are_code_1() {
        let rule = SizeRule {
            default: 4096,
            min: 32,
            align: 32,
        };
        for size in [16, 33, SIZE as u64 + 32] {
            let (r, out, bus) = with_run(|run| run.size(size, rule));
            assert_eq!(r, Err(Failure::BadSize));
            assert_eq!(r.unwrap_err().code(), 1);
            assert!(out.contains("invalid size"));
            assert_eq!(bus.accesses(), 0);
        }
    }

    #[test]
    fn zero_addr_is_ddr_base() {
        let (r, _, _) = with_run(|run| run.addr(0, 64, 2));
        assert_eq!(r, Ok(BASE));
    }

    #[test]
    fn bad_addresses() {
        let below = BASE as u64 - 4;
        let unaligned = BASE as u64 + 2;
        let past_end = (BASE + SIZE) as u64 - 4;
        for addr in [below, unaligned, past_end] {
            let (r, out, _) = with_run(|run| run.addr(addr, 8, 7));
            assert_eq!(r, Err(Failure::BadAddress(7)));
            assert!(out.contains("invalid address"));
        }
    }

    #[test]
    fn region_may_end_at_top_of_address_space() {
        let base = 0usize.wrapping_sub(SIZE);
        let mut bus = MockDdr::<u32>::new(base, SIZE);
        let config = DdrConfig { base, size: SIZE };
        let mut out = String::new();
        let mut trace = Ringbuf::new(Trace::None);
        let mut run = Run {
            bus: &mut bus,
            config: &config,
            out: &mut out,
            trace: &mut trace,
        };
        assert_eq!(run.addr(0, SIZE, 2), Ok(base));
        let last = base + (SIZE - 4);
        assert_eq!(run.addr(last as u64, 4, 2), Ok(last));
        assert_eq!(
            run.addr(last as u64, 8, 2),
            Err(Failure::BadAddress(2))
        );
    }

    #[test]
    fn infinite_loops_warn() {
        let (l, out, _) = with_run(|run| run.loops(0xffff_ffff, 1));
        assert_eq!(l, Loops::Infinite);
        assert!(out.contains("infinite loop requested"));

        let (l, out, _) = with_run(|run| run.loops(0, 7));
        assert_eq!(l, Loops::Finite(7));
        assert!(out.is_empty());
    }

    #[test]
    fn mismatch_prints_address_and_values() {
        let (r, out, _) = with_run(|run| {
            run.bus.write(BASE + 8, 0x1234);
            run.check(BASE + 8, 0x4321, 3)
        });
        assert_eq!(r, Err(Failure::Mismatch(3)));
        assert!(out.contains("0xc0000008"));
        assert!(out.contains("read 0x00001234"));
        assert!(out.contains("expected 0x00004321"));
    }

    proptest! {
        #[test]
        fn loop_resolution(n in any::<u64>(), default in 1u32..1000) {
            let l = Loops::resolve(n, default);
            if n == 0 {
                prop_assert_eq!(l, Loops::Finite(default));
            } else if n >= Loops::INFINITE {
                prop_assert_eq!(l, Loops::Infinite);
            } else {
                prop_assert_eq!(l, Loops::Finite(n as u32));
                prop_assert!(!l.finished(n - 1));
                prop_assert!(l.finished(n));
            }
        }

        #[test]
        fn accepted_addresses_fit(addr in any::<u64>(), span in 0usize..0x2_0000) {
            let (r, _, _) = with_run(|run| run.addr(addr, span, 2));
            if let Ok(a) = r {
                prop_assert!(a >= BASE);
                prop_assert_eq!(a % 4, 0);
                prop_assert!(a as u64 + span as u64 <= (BASE + SIZE) as u64);
            }
        }
    }
}
