// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Long-running read and write loops for soak testing.
//!
//! Each round sweeps the region in order and then visits as many words
//! again at offsets drawn from a generator. Asked for `0xffff_ffff` loops
//! they never return.
//!
//! Codes: 1 bad size, 2 bad address, 3 mismatch.

use crate::bus::{DdrBus, Word};
use crate::params::{Loops, Run, SizeRule, WordOf};
use crate::rng::Lcg;
use crate::{Failure, TestParams, TestResult};
use rand_core::{RngCore, SeedableRng};

const SOAK_SEED: u64 = 0x50a1_c0de;

/// A region being soaked, and where the next round's accesses go.
struct Soak {
    addr: usize,
    words: usize,
    loops: Loops,
    rng: Lcg,
}

impl Soak {
    fn new<B: DdrBus>(
        run: &mut Run<'_, B>,
        p: &TestParams,
    ) -> Result<Self, Failure> {
        let size = run.size(p.size, SizeRule::kib4(WordOf::<B>::BYTES))?;
        let addr = run.addr(p.addr, size, 2)?;
        let loops = run.loops(p.loop_count, 1);
        Ok(Self {
            addr,
            words: size / WordOf::<B>::BYTES,
            loops,
            rng: Lcg::seed_from_u64(SOAK_SEED),
        })
    }

    /// Word index of access `i` of a round: in order for the first sweep,
    /// then random.
    fn word(&mut self, i: usize) -> usize {
        if i < self.words {
            i
        } else {
            (self.rng.next_u64() % self.words as u64) as usize
        }
    }

    /// Accesses in one round.
    fn accesses(&self) -> usize {
        2 * self.words
    }
}

/// What word `i` holds: distinct per word, so a misdirected access shows.
fn value<W: Word>(i: usize) -> W {
    W::replicate(0xa5) ^ W::truncate(i as u64)
}

/// Fills the region once, then reads it back round after round.
pub(crate) fn read<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let step = WordOf::<B>::BYTES;
    let mut soak = Soak::new(run, p)?;
    run.fill(soak.addr, soak.words, value);

    let mut round = 0;
    while !soak.loops.finished(round) {
        for i in 0..soak.accesses() {
            let w = soak.word(i);
            run.check(soak.addr + w * step, value(w), 3)?;
        }
        round += 1;
    }
    Ok(())
}

/// Writes the region round after round, checking it at the end of each.
pub(crate) fn write<B: DdrBus>(
    run: &mut Run<'_, B>,
    p: &TestParams,
) -> TestResult {
    let step = WordOf::<B>::BYTES;
    let mut soak = Soak::new(run, p)?;

    let mut round = 0;
    while !soak.loops.finished(round) {
        for i in 0..soak.accesses() {
            let w = soak.word(i);
            run.bus.write(soak.addr + w * step, value(w));
        }
        run.verify(soak.addr, soak.words, value, 3)?;
        round += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use crate::TestId;

    #[test]
    fn soak_rounds() {
        let mut t = tester();
        let (r, _) = run(&mut t, TestId::InfiniteRead, TestParams::new(3, 64, 0));
        assert_eq!(r, Ok(()));
        assert_eq!(t.bus().writes(), 16);
        assert_eq!(t.bus().reads(), 3 * 32);

        let mut t = tester64();
        let (r, _) =
            run(&mut t, TestId::InfiniteWrite, TestParams::new(2, 64, 0));
        assert_eq!(r, Ok(()));
        assert_eq!(t.bus().writes(), 2 * 16);
        assert_eq!(t.bus().word(0x8000_0000 + 8), value::<u64>(1));
    }

    #[test]
    fn soak_catches_faults() {
        let mut t = tester();
        t.bus_mut().read_flip(BASE + 12, 0x1);
        let (r, _) = run(&mut t, TestId::InfiniteRead, TestParams::default());
        assert_eq!(r, Err(Failure::Mismatch(3)));

        let mut t = tester();
        let params = TestParams::new(0, 0, BASE as u64 + 2);
        let (r, _) = run(&mut t, TestId::InfiniteWrite, params);
        assert_eq!(r, Err(Failure::BadAddress(2)));
    }

    #[test]
    fn soak_tests_are_flagged() {
        for id in TestId::SOAK {
            assert!(id.is_soak());
        }
    }
}
