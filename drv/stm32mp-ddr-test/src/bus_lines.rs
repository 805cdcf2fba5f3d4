// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data and address bus line tests.
//!
//! These use as little memory as possible, so that a fault points at a
//! wire rather than at a cell.

use crate::bus::{DdrBus, Word};
use crate::params::{Run, SizeRule, WordOf};
use crate::{Failure, TestParams, TestResult};
use num_traits::{Bounded, Zero};

/// Walks a single one across every data line of one word.
///
/// Codes: 1 bad address, 2 mismatch.
pub(crate) fn databus<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let addr = run.addr(p.addr, WordOf::<B>::BYTES, 1)?;

    for k in 0..WordOf::<B>::WIDTH {
        let pattern = WordOf::<B>::bit(k);
        run.bus.write(addr, pattern);
        run.check(addr, pattern, 2)?;
    }
    Ok(())
}

/// Writes one word per data line, each with only that line set (`ones`) or
/// cleared, and checks all of them together, for `loop` rounds.
///
/// Codes: 1 bad address, 2 mismatch.
pub(crate) fn databus_walk<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
    ones: bool,
) -> TestResult {
    const DEFAULT_LOOPS: u32 = 100;

    let width = WordOf::<B>::WIDTH;
    let step = WordOf::<B>::BYTES;
    let addr = run.addr(p.addr, width as usize * step, 1)?;
    let loops = run.loops(p.loop_count, DEFAULT_LOOPS);

    let pattern = |i: usize| {
        let bit = WordOf::<B>::bit(i as u32);
        if ones {
            bit
        } else {
            !bit
        }
    };
    let background = if ones {
        WordOf::<B>::zero()
    } else {
        WordOf::<B>::max_value()
    };

    let mut round = 0u64;
    while !loops.finished(round) {
        run.fill(addr, width as usize, pattern);

        let mut errors = WordOf::<B>::zero();
        let mut first = None;
        for i in 0..width as usize {
            let expected = pattern(i);
            let actual = run.bus.read(addr + i * step);
            if actual != expected {
                errors = errors | (actual ^ expected);
                first.get_or_insert((addr + i * step, expected, actual));
            }
        }

        if let Some((at, expected, actual)) = first {
            let failure = run.mismatch(at, expected, actual, 2);
            let _ = writeln!(
                run.out,
                "loop {round}: error for bits 0x{errors:x}"
            );
            return Err(failure);
        }

        run.fill(addr, width as usize, |_| background);
        round += 1;
    }
    Ok(())
}

/// Largest power of two that fits in `size`.
fn prev_power_of_two(size: usize) -> usize {
    match size {
        0 => 0,
        n => 1 << (usize::BITS - 1 - n.leading_zeros()),
    }
}

/// Finds stuck and shorted address lines by aliasing: a pattern at every
/// power-of-two offset, then one offset at a time is overwritten and every
/// other one must be unaffected.
///
/// Codes: 1 bad size (also when not a power of two), 2 bad address,
/// 3 line stuck high, 4 line stuck low, 5 lines shorted.
pub(crate) fn address_bus<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let step = WordOf::<B>::BYTES;
    let rule = SizeRule {
        default: prev_power_of_two(run.config.size),
        min: 2 * step,
        align: step,
    };
    let size = run.size(p.size, rule)?;
    if !size.is_power_of_two() {
        let _ = writeln!(run.out, "invalid size 0x{size:x}: not a power of 2");
        return Err(Failure::BadSize);
    }
    let addr = run.addr(p.addr, size, 2)?;

    let pattern = WordOf::<B>::replicate(0xaa);
    let antipattern = !pattern;
    // Byte offsets of every address line above the word lanes.
    let offsets = || {
        core::iter::successors(Some(step), |&o| o.checked_mul(2))
            .take_while(move |&o| o < size)
    };

    for o in offsets() {
        run.bus.write(addr + o, pattern);
    }

    run.bus.write(addr, antipattern);
    for o in offsets() {
        run.check(addr + o, pattern, 3)?;
    }
    run.bus.write(addr, pattern);

    for tested in offsets() {
        run.bus.write(addr + tested, antipattern);
        run.check(addr, pattern, 4)?;
        for o in offsets().filter(|&o| o != tested) {
            run.check(addr + o, pattern, 5)?;
        }
        run.bus.write(addr + tested, pattern);
    }
    Ok(())
}
