// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pattern sweeps: fill a whole region, then verify it.
//!
//! All of these default to a 4 KiB region and a single loop, and share
//! their codes: 1 bad size, 2 bad address, 3 mismatch.

use crate::bus::{DdrBus, Word};
use crate::params::{Loops, Run, SizeRule, WordOf};
use crate::patterns;
use crate::rng::Lcg;
use crate::{Failure, TestParams, TestResult};
use rand_core::{RngCore, SeedableRng};

/// Seed of the generator that picks each round's seed in the Random test.
const RANDOM_SEED: u64 = 0x5eed_dd12_0000_0001;

struct Region {
    addr: usize,
    words: usize,
    loops: Loops,
}

fn region<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
    rule: SizeRule,
) -> Result<Region, Failure> {
    let size = run.size(p.size, rule)?;
    let addr = run.addr(p.addr, size, 2)?;
    let loops = run.loops(p.loop_count, 1);
    Ok(Region {
        addr,
        words: size / WordOf::<B>::BYTES,
        loops,
    })
}

/// Runs `round` for each requested loop.
fn repeat(
    loops: Loops,
    mut round: impl FnMut(u64) -> TestResult,
) -> TestResult {
    let mut n = 0;
    while !loops.finished(n) {
        round(n)?;
        n += 1;
    }
    Ok(())
}

/// Fills one half of the region from a seeded generator, copies it to the
/// other half, then replays the seed to check both. Each round draws a new
/// seed. Stops at the first mismatch.
///
/// Codes: 1 bad size, 2 bad address, 3 first half, 4 second half.
pub(crate) fn random<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let step = WordOf::<B>::BYTES;
    let r = region(run, p, SizeRule::kib4(2 * step))?;
    let half = r.words / 2;
    let second = r.addr + half * step;
    let mut seeds = Lcg::seed_from_u64(RANDOM_SEED);

    repeat(r.loops, |_| {
        let seed = seeds.next_u64();

        let mut rng = Lcg::seed_from_u64(seed);
        run.fill(r.addr, half, |_| WordOf::<B>::random(&mut rng));
        run.bus.copy(second, r.addr, half * step);

        let mut rng = Lcg::seed_from_u64(seed);
        run.verify(r.addr, half, |_| WordOf::<B>::random(&mut rng), 3)?;
        let mut rng = Lcg::seed_from_u64(seed);
        run.verify(second, half, |_| WordOf::<B>::random(&mut rng), 4)
    })
}

/// Every byte value 0 to 255, replicated across the word, one value at a
/// time.
pub(crate) fn block_sequential<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let r = region(run, p, SizeRule::kib4(WordOf::<B>::BYTES))?;

    repeat(r.loops, |_| {
        for byte in 0..=u8::MAX {
            let value = WordOf::<B>::replicate(byte);
            run.fill(r.addr, r.words, |_| value);
            run.verify(r.addr, r.words, |_| value, 3)?;
        }
        Ok(())
    })
}

/// Alternating `0x55…`/`0xAA…` words, then the same with the pair swapped.
pub(crate) fn checkerboard<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let r = region(run, p, SizeRule::kib4(WordOf::<B>::BYTES))?;

    repeat(r.loops, |_| {
        let mut pair = patterns::checkerboard::<WordOf<B>>();
        for _ in 0..2 {
            run.fill(r.addr, r.words, |i| pair[i % 2]);
            run.verify(r.addr, r.words, |i| pair[i % 2], 3)?;
            pair = [!pair[0], !pair[1]];
        }
        Ok(())
    })
}

/// Every pair of data bits, set together against their complement.
pub(crate) fn bit_spread<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let width = WordOf::<B>::WIDTH;
    let r = region(run, p, SizeRule::kib4(WordOf::<B>::BYTES))?;

    repeat(r.loops, |_| {
        for i in 0..width {
            for j in i + 1..width {
                let pattern = patterns::bitspread::<WordOf<B>>(i, j);
                run.fill(r.addr, r.words, |k| pattern[k % 4]);
                run.verify(r.addr, r.words, |k| pattern[k % 4], 3)?;
            }
        }
        Ok(())
    })
}

/// Every data bit, alone and cleared alone.
pub(crate) fn bit_flip<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let r = region(run, p, SizeRule::kib4(WordOf::<B>::BYTES))?;

    repeat(r.loops, |_| {
        for n in 0..WordOf::<B>::WIDTH {
            let pattern = patterns::bitflip::<WordOf<B>>(n);
            run.fill(r.addr, r.words, |k| pattern[k % 4]);
            run.verify(r.addr, r.words, |k| pattern[k % 4], 3)?;
        }
        Ok(())
    })
}

/// A single one (or zero) walking up the word and back down, shifted by one
/// position per pass until every word has seen every step.
pub(crate) fn walking<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
    ones: bool,
) -> TestResult {
    let steps = 2 * WordOf::<B>::WIDTH as usize;
    let r = region(run, p, SizeRule::kib4(WordOf::<B>::BYTES))?;

    let value = move |i: usize| {
        let i = (i % steps) as u32;
        if ones {
            patterns::walking_one::<WordOf<B>>(i)
        } else {
            patterns::walking_zero::<WordOf<B>>(i)
        }
    };

    repeat(r.loops, |_| {
        for shift in 0..steps {
            run.fill(r.addr, r.words, |k| value(k + shift));
            run.verify(r.addr, r.words, |k| value(k + shift), 3)?;
        }
        Ok(())
    })
}
