// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A [`DdrBus`] backed by host memory, with injectable faults.
//!
//! Data faults apply to what is read back; address faults remap where an
//! access lands. Any access outside the configured window panics, which is
//! what a test wants to hear about.

use crate::bus::{BusWidth, DdrBus, Word};
use alloc::vec;
use alloc::vec::Vec;

pub struct MockDdr<W> {
    base: usize,
    mem: Vec<W>,
    width: BusWidth,
    stuck_low: W,
    stuck_high: W,
    addr_stuck_low: usize,
    addr_stuck_high: usize,
    shorts: Vec<(u32, u32)>,
    flips: Vec<(usize, W)>,
    reads: usize,
    writes: usize,
}

impl<W: Word> MockDdr<W> {
    /// `size` bytes of zeroed memory at `base`.
    pub fn new(base: usize, size: usize) -> Self {
        Self {
            base,
            mem: vec![W::zero(); size / W::BYTES],
            width: BusWidth::X32,
            stuck_low: W::zero(),
            stuck_high: W::zero(),
            addr_stuck_low: 0,
            addr_stuck_high: 0,
            shorts: Vec::new(),
            flips: Vec::new(),
            reads: 0,
            writes: 0,
        }
    }

    /// Data bits in `mask` always read as 0.
    pub fn stuck_low(&mut self, mask: W) {
        self.stuck_low = self.stuck_low | mask;
    }

    /// Data bits in `mask` always read as 1.
    pub fn stuck_high(&mut self, mask: W) {
        self.stuck_high = self.stuck_high | mask;
    }

    /// Address bits (of the byte offset into DDR) in `mask` are ignored as
    /// if tied low.
    pub fn addr_stuck_low(&mut self, mask: usize) {
        self.addr_stuck_low |= mask;
    }

    /// Address bits in `mask` are always driven high.
    pub fn addr_stuck_high(&mut self, mask: usize) {
        self.addr_stuck_high |= mask;
    }

    /// Address bits `a` and `b` are shorted: either one set drives both.
    pub fn addr_short(&mut self, a: u32, b: u32) {
        self.shorts.push((a, b));
    }

    /// Every read of `addr` comes back with `mask` flipped.
    pub fn read_flip(&mut self, addr: usize, mask: W) {
        self.flips.push((addr, mask));
    }

    pub fn set_bus_width(&mut self, width: BusWidth) {
        self.width = width;
    }

    /// What is stored at `addr`, without counting an access or applying
    /// read faults.
    pub fn word(&self, addr: usize) -> W {
        self.mem[self.index(addr)]
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn accesses(&self) -> usize {
        self.reads + self.writes
    }

    fn index(&self, addr: usize) -> usize {
        assert!(
            addr >= self.base && addr % W::BYTES == 0,
            "bad access at {addr:#x}"
        );
        let mut offset = addr - self.base;
        offset = (offset | self.addr_stuck_high) & !self.addr_stuck_low;
        for &(a, b) in &self.shorts {
            if offset & ((1 << a) | (1 << b)) != 0 {
                offset |= (1 << a) | (1 << b);
            }
        }
        let index = offset / W::BYTES;
        assert!(index < self.mem.len(), "access past end at {addr:#x}");
        index
    }
}

impl<W: Word> DdrBus for MockDdr<W> {
    type Word = W;

    fn read(&mut self, addr: usize) -> W {
        self.reads += 1;
        let mut value = self.mem[self.index(addr)];
        for &(a, mask) in &self.flips {
            if a == addr {
                value = value ^ mask;
            }
        }
        (value | self.stuck_high) & !self.stuck_low
    }

    fn write(&mut self, addr: usize, value: W) {
        self.writes += 1;
        let i = self.index(addr);
        self.mem[i] = value;
    }

    fn data_bus_width(&mut self) -> BusWidth {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: usize = 0xc000_0000;

    #[test]
    fn clean_memory_reads_back() {
        let mut m = MockDdr::<u32>::new(BASE, 64);
        m.write(BASE + 4, 0xdead_beef);
        assert_eq!(m.read(BASE + 4), 0xdead_beef);
        assert_eq!(m.read(BASE), 0);
        assert_eq!((m.reads(), m.writes()), (2, 1));
    }

    #[test]
    fn data_faults() {
        let mut m = MockDdr::<u32>::new(BASE, 64);
        m.stuck_low(0x1);
        m.stuck_high(0x8000_0000);
        m.write(BASE, 0x0000_000f);
        assert_eq!(m.read(BASE), 0x8000_000e);
        assert_eq!(m.word(BASE), 0x0000_000f);
    }

    #[test]
    fn flips_hit_one_address() {
        let mut m = MockDdr::<u64>::new(0x8000_0000, 64);
        m.read_flip(0x8000_0008, 0xff);
        assert_eq!(m.read(0x8000_0008), 0xff);
        assert_eq!(m.read(0x8000_0010), 0);
    }

    #[test]
    fn address_faults_alias() {
        let mut m = MockDdr::<u32>::new(BASE, 256);
        m.addr_stuck_low(0x10);
        m.write(BASE + 0x10, 7);
        assert_eq!(m.read(BASE), 7);

        let mut m = MockDdr::<u32>::new(BASE, 256);
        m.addr_short(3, 5);
        m.write(BASE + 0x8, 9);
        assert_eq!(m.word(BASE + 0x28), 9);
    }

    #[test]
    #[should_panic]
    fn past_end_panics() {
        let mut m = MockDdr::<u32>::new(BASE, 64);
        m.read(BASE + 64);
    }
}
