// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests aimed at the memory device and its signal integrity.

use crate::bus::{DdrBus, Word};
use crate::params::{Run, SizeRule, WordOf};
use crate::patterns::{FreqPattern, FREQ_BLOCK_WORDS};
use crate::{TestParams, TestResult};
use num_traits::{Bounded, Zero};

/// Bytes per burst in the NoiseBurst test: one 32-word load/store-multiple
/// on the 32-bit parts.
const NOISE_BURST_BYTES: usize = 128;

/// Widest burst we ever need, in words.
const MAX_BURST_WORDS: usize = NOISE_BURST_BYTES / 4;

/// Every cell holds a different value: a running counter, then its
/// complement.
///
/// Codes: 1 bad size, 2 bad address, 3 counter mismatch, 4 complement
/// mismatch.
pub(crate) fn mem_device<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let step = WordOf::<B>::BYTES;
    let size = run.size(p.size, SizeRule::kib4(step))?;
    let addr = run.addr(p.addr, size, 2)?;
    let words = size / step;

    // The counter starts at 1 and is allowed to wrap.
    let counter = |i: usize| WordOf::<B>::truncate(i as u64 + 1);

    run.fill(addr, words, counter);
    for i in 0..words {
        run.check(addr + i * step, counter(i), 3)?;
        run.bus.write(addr + i * step, !counter(i));
    }
    run.verify(addr, words, |i| !counter(i), 4)
}

/// Hammers each word with every data line switching at once: for every bit,
/// `bit`, all ones, `bit`, `!bit`, all zeros, `!bit`, each read back
/// immediately.
///
/// Codes: 1 bad size, 2 bad address, 3 mismatch.
pub(crate) fn sso<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let step = WordOf::<B>::BYTES;
    let size = run.size(p.size, SizeRule::kib4(step))?;
    let addr = run.addr(p.addr, size, 2)?;

    let ones = WordOf::<B>::max_value();
    let zeros = WordOf::<B>::zero();

    let mut offset = 0;
    let mut remaining = size;
    while remaining > 0 {
        let at = addr + offset;
        for k in 0..WordOf::<B>::WIDTH {
            let bit = WordOf::<B>::bit(k);
            for value in [bit, ones, bit, !bit, zeros, !bit] {
                run.bus.write(at, value);
                run.check(at, value, 3)?;
            }
        }
        offset += step;
        remaining -= step;
    }
    Ok(())
}

/// Alternating all-ones and all-zeros words, as a `W`.
fn alternating<W: Word>(i: usize) -> W {
    if i % 2 == 0 {
        W::max_value()
    } else {
        W::zero()
    }
}

/// One burst of pattern and antipattern writes and reads at `at`, checked
/// word by word once the bus has gone quiet.
fn burst_pair<B: DdrBus>(
    run: &mut Run<'_, B>,
    at: usize,
    words: usize,
    code: u8,
) -> TestResult {
    let step = WordOf::<B>::BYTES;
    let mut pattern = [WordOf::<B>::zero(); MAX_BURST_WORDS];
    let mut first = [WordOf::<B>::zero(); MAX_BURST_WORDS];
    let mut second = [WordOf::<B>::zero(); MAX_BURST_WORDS];
    let (pattern, first, second) =
        (&mut pattern[..words], &mut first[..words], &mut second[..words]);

    for (i, w) in pattern.iter_mut().enumerate() {
        *w = alternating(i);
    }
    run.bus.write_burst(at, pattern);
    run.bus.read_burst(at, first);
    for w in pattern.iter_mut() {
        *w = !*w;
    }
    run.bus.write_burst(at, pattern);
    run.bus.read_burst(at, second);

    for i in 0..words {
        let expected = alternating::<WordOf<B>>(i);
        if first[i] != expected {
            return Err(run.mismatch(at + i * step, expected, first[i], code));
        }
        if second[i] != !expected {
            return Err(run.mismatch(at + i * step, !expected, second[i], code));
        }
    }
    Ok(())
}

/// One eight-word burst of all-ones/all-zeros words and its inverse, back
/// to back.
///
/// Codes: 1 bad address, 2 mismatch.
pub(crate) fn noise<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    const WORDS: usize = 8;

    let addr = run.addr(p.addr, WORDS * WordOf::<B>::BYTES, 1)?;
    burst_pair(run, addr, WORDS, 2)
}

/// [`noise`] across a whole region, 128 bytes per burst.
///
/// Codes: 1 bad size, 2 bad address, 3 mismatch.
pub(crate) fn noise_burst<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let rule = SizeRule::kib4(NOISE_BURST_BYTES);
    let size = run.size(p.size, rule)?;
    let addr = run.addr(p.addr, size, 2)?;
    let words = NOISE_BURST_BYTES / WordOf::<B>::BYTES;

    for offset in (0..size).step_by(NOISE_BURST_BYTES) {
        burst_pair(run, addr + offset, words, 3)?;
    }
    Ok(())
}

/// Fills the region with each [`FreqPattern`] block in turn, laid out for
/// the data bus width the controller reports, and verifies it.
///
/// Codes: 1 bad size, 2 bad address, 3 mismatch.
pub(crate) fn freq_pattern<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let block_bytes = FREQ_BLOCK_WORDS * WordOf::<B>::BYTES;
    let size = run.size(p.size, SizeRule::kib4(block_bytes))?;
    let addr = run.addr(p.addr, size, 2)?;
    let width = run.bus.data_bus_width();

    for pattern in FreqPattern::ALL {
        let block = pattern.block::<WordOf<B>>(width);
        for offset in (0..size).step_by(block_bytes) {
            run.bus.write_burst(addr + offset, &block);
        }

        let mut read = [WordOf::<B>::zero(); FREQ_BLOCK_WORDS];
        for offset in (0..size).step_by(block_bytes) {
            let at = addr + offset;
            run.bus.read_burst(at, &mut read);
            let bad = read.iter().zip(&block).position(|(r, b)| r != b);
            if let Some(i) = bad {
                let failure = run.mismatch(
                    at + i * WordOf::<B>::BYTES,
                    block[i],
                    read[i],
                    3,
                );
                let _ = writeln!(
                    run.out,
                    "pattern {} ({} bit bus)",
                    pattern.description(),
                    width.bits(),
                );
                return Err(failure);
            }
        }
    }
    Ok(())
}
