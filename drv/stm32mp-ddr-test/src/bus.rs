// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw access to the memory under test.

use core::fmt;
use core::marker::PhantomData;
use num_traits::{PrimInt, WrappingAdd};
use rand_core::RngCore;

/// A native memory word: the unit every test reads and writes.
///
/// This is `u32` on the STM32MP1 family and `u64` on STM32MP2. Every
/// algorithm is written once against this trait.
pub trait Word:
    PrimInt + WrappingAdd + fmt::LowerHex + fmt::Debug + Send + 'static
{
    /// Width of the word in bits.
    const WIDTH: u32;
    /// Width of the word in bytes, which is also its required alignment.
    const BYTES: usize;

    /// Keeps the low `WIDTH` bits of `value`.
    fn truncate(value: u64) -> Self;

    /// The word with only bit `n` set.
    fn bit(n: u32) -> Self {
        Self::one() << n as usize
    }

    /// The word with `byte` copied into every byte lane.
    fn replicate(byte: u8) -> Self {
        let lane = Self::truncate(u64::from(byte));
        (0..Self::BYTES).fold(Self::zero(), |w, i| w | (lane << (8 * i)))
    }

    /// Draws a full-width word from `rng`.
    fn random(rng: &mut impl RngCore) -> Self {
        Self::truncate(rng.next_u64())
    }
}

impl Word for u32 {
    const WIDTH: u32 = 32;
    const BYTES: usize = 4;

    fn truncate(value: u64) -> Self {
        value as u32
    }
}

impl Word for u64 {
    const WIDTH: u32 = 64;
    const BYTES: usize = 8;

    fn truncate(value: u64) -> Self {
        value
    }
}

/// Width of the external DDR data bus, as programmed in the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusWidth {
    X16,
    X32,
}

impl BusWidth {
    /// `MSTR.DATA_BUS_WIDTH` field (bits 13:12) of the DDRCTRL.
    const MSTR_DATA_BUS_WIDTH_SHIFT: u32 = 12;
    const MSTR_DATA_BUS_WIDTH_MASK: u32 = 0b11;

    /// Decodes the DDRCTRL `MSTR` register. Full width is 32 bits; half (and
    /// the unsupported quarter) width is treated as a 16-bit bus.
    pub fn from_mstr(mstr: u32) -> Self {
        match (mstr >> Self::MSTR_DATA_BUS_WIDTH_SHIFT)
            & Self::MSTR_DATA_BUS_WIDTH_MASK
        {
            0 => BusWidth::X32,
            _ => BusWidth::X16,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            BusWidth::X16 => 16,
            BusWidth::X32 => 32,
        }
    }
}

/// Word-granular access to DDR.
///
/// Every call must be a real bus transaction, performed in program order.
/// The burst operations exist so that an implementation can use
/// load/store-multiple sequences; the default implementations are plain
/// loops, which preserve what the tests check (every location, in order).
pub trait DdrBus {
    type Word: Word;

    fn read(&mut self, addr: usize) -> Self::Word;

    fn write(&mut self, addr: usize, value: Self::Word);

    /// Writes `words` back-to-back starting at `addr`.
    fn write_burst(&mut self, addr: usize, words: &[Self::Word]) {
        for (i, &w) in words.iter().enumerate() {
            self.write(addr + i * Self::Word::BYTES, w);
        }
    }

    /// Reads `words.len()` words back-to-back starting at `addr`.
    fn read_burst(&mut self, addr: usize, words: &mut [Self::Word]) {
        for (i, w) in words.iter_mut().enumerate() {
            *w = self.read(addr + i * Self::Word::BYTES);
        }
    }

    /// Copies `bytes` bytes from `src` to `dst`, one word at a time.
    fn copy(&mut self, dst: usize, src: usize, bytes: usize) {
        for offset in (0..bytes).step_by(Self::Word::BYTES) {
            let w = self.read(src + offset);
            self.write(dst + offset, w);
        }
    }

    /// Reports the configured external data bus width.
    fn data_bus_width(&mut self) -> BusWidth {
        BusWidth::X32
    }
}

/// The hardware bus: volatile accesses through raw pointers.
pub struct Mmio<W> {
    mstr: Option<usize>,
    _word: PhantomData<W>,
}

impl<W: Word> Mmio<W> {
    /// Creates a bus that reads the data bus width from the DDRCTRL `MSTR`
    /// register at `mstr`, if given.
    ///
    /// # Safety
    ///
    /// Every address later passed to this bus must be mapped, and nothing
    /// else may access the tested range while a test runs. The DDR must be
    /// initialized (step `DDR_READY`) before any access.
    pub const unsafe fn new(mstr: Option<usize>) -> Self {
        Self {
            mstr,
            _word: PhantomData,
        }
    }
}

impl<W: Word> DdrBus for Mmio<W> {
    type Word = W;

    fn read(&mut self, addr: usize) -> W {
        // Safety: the contract on `Mmio::new` makes `addr` valid.
        unsafe { core::ptr::read_volatile(addr as *const W) }
    }

    fn write(&mut self, addr: usize, value: W) {
        // Safety: the contract on `Mmio::new` makes `addr` valid.
        unsafe { core::ptr::write_volatile(addr as *mut W, value) }
    }

    fn data_bus_width(&mut self) -> BusWidth {
        match self.mstr {
            // Safety: `mstr` points at the DDRCTRL, per `Mmio::new`.
            Some(reg) => BusWidth::from_mstr(unsafe {
                core::ptr::read_volatile(reg as *const u32)
            }),
            None => BusWidth::X32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicate_fills_every_lane() {
        assert_eq!(u32::replicate(0xa5), 0xa5a5_a5a5);
        assert_eq!(u64::replicate(0x01), 0x0101_0101_0101_0101);
        assert_eq!(u32::replicate(0), 0);
    }

    #[test]
    fn bit_covers_full_width() {
        assert_eq!(u32::bit(31), 0x8000_0000);
        assert_eq!(u64::bit(63), 0x8000_0000_0000_0000);
    }

    #[test]
    fn mstr_decoding() {
        assert_eq!(BusWidth::from_mstr(0x0004_0001), BusWidth::X32);
        assert_eq!(BusWidth::from_mstr(1 << 12), BusWidth::X16);
        assert_eq!(BusWidth::from_mstr(2 << 12), BusWidth::X16);
        assert_eq!(BusWidth::X16.bits(), 16);
    }
}
