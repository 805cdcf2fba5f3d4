// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data patterns used to stress the DDR data lines.
//!
//! Patterns are generated for the native [`Word`] rather than stored as
//! tables, so the same code serves the 32- and 64-bit platforms.

use crate::bus::{BusWidth, Word};
use static_assertions::const_assert;

/// Number of words in one frequency-selective pattern block.
pub const FREQ_BLOCK_WORDS: usize = 8;

const_assert!(FREQ_BLOCK_WORDS.is_power_of_two());

/// Alternating-bit words, `0x55…` then `0xAA…`.
pub fn checkerboard<W: Word>() -> [W; 2] {
    let a = W::replicate(0x55);
    [a, !a]
}

/// Four words isolating the coupling between bits `i` and `j`: both bits
/// set, then the complement, twice.
pub fn bitspread<W: Word>(i: u32, j: u32) -> [W; 4] {
    let p = W::bit(i) | W::bit(j);
    [p, !p, p, !p]
}

/// Four words toggling bit `n` against its complement.
pub fn bitflip<W: Word>(n: u32) -> [W; 4] {
    let p = W::bit(n);
    [p, p, !p, !p]
}

/// Maps step `i` of a walk over `2 * depth` steps to a bit position: up
/// through the word, then back down.
pub fn walk_index(i: u32, depth: u32) -> u32 {
    if i < depth {
        i
    } else {
        2 * depth - 1 - i
    }
}

/// A single set bit walking across the word and back.
pub fn walking_one<W: Word>(i: u32) -> W {
    W::bit(walk_index(i, W::WIDTH))
}

/// A single cleared bit walking across the word and back.
pub fn walking_zero<W: Word>(i: u32) -> W {
    !walking_one::<W>(i)
}

/// The frequency-selective patterns, named after how often each data line
/// toggles relative to the DDR clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FreqPattern {
    /// Every line toggles on every beat.
    Div1,
    /// Lines toggle every second beat.
    Div2,
    /// Lines toggle every fourth beat.
    Div4,
    /// One line high for one beat in the block, everything else low.
    MostlyZero,
    /// One line low for one beat in the block, everything else high.
    MostlyOne,
}

impl FreqPattern {
    pub const ALL: [FreqPattern; 5] = [
        FreqPattern::Div1,
        FreqPattern::Div2,
        FreqPattern::Div4,
        FreqPattern::MostlyZero,
        FreqPattern::MostlyOne,
    ];

    pub fn description(self) -> &'static str {
        match self {
            FreqPattern::Div1 => "toggle on every beat (f/1)",
            FreqPattern::Div2 => "toggle every 2 beats (f/2)",
            FreqPattern::Div4 => "toggle every 4 beats (f/4)",
            FreqPattern::MostlyZero => "mostly zero",
            FreqPattern::MostlyOne => "mostly one",
        }
    }

    /// Builds the block of words for a bus of `width` lines.
    ///
    /// Each word carries `W::WIDTH / width` consecutive beats, lowest lanes
    /// first. With a 32-bit word on a 16-bit bus, `Div1` comes out as
    /// `0x0000ffff` and `MostlyZero` sets bit 16 of the second word.
    pub fn block<W: Word>(self, width: BusWidth) -> [W; FREQ_BLOCK_WORDS] {
        let beat_bits = width.bits().min(W::WIDTH);
        let beats_per_word = (W::WIDTH / beat_bits) as usize;
        let lane = W::max_value() >> (W::WIDTH - beat_bits) as usize;

        core::array::from_fn(|w| {
            (0..beats_per_word).fold(W::zero(), |word, k| {
                let beat = w * beats_per_word + k;
                let marked = w == 1 && k == beats_per_word - 1;
                let value = match self {
                    FreqPattern::Div1 => on_if(beat % 2 == 0, lane),
                    FreqPattern::Div2 => on_if((beat / 2) % 2 == 0, lane),
                    FreqPattern::Div4 => on_if((beat / 4) % 2 == 0, lane),
                    FreqPattern::MostlyZero => on_if(marked, W::one()),
                    FreqPattern::MostlyOne => {
                        if marked {
                            lane & !W::one()
                        } else {
                            lane
                        }
                    }
                };
                word | (value << (k * beat_bits as usize))
            })
        })
    }
}

fn on_if<W: Word>(on: bool, value: W) -> W {
    if on {
        value
    } else {
        W::zero()
    }
}
