// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DDR memory tests for the STM32MP1 and STM32MP2 families.
//!
//! Each test takes a loop count, a region size and a start address, any of
//! which may be zero to mean "use the default", and runs one stress
//! algorithm over that region through a [`DdrBus`]. Tests are destructive:
//! the region's previous contents are lost.
//!
//! A test stops at the first fault it sees, prints one diagnostic line with
//! the address and the expected and actual values, and returns a
//! [`Failure`] whose [`code`](Failure::code) identifies the step that
//! failed. Codes are only meaningful together with the test that produced
//! them; size errors are always `1`.
//!
//! This crate works on both the target and the host, so it can be used in
//! host-side tests; see the `mock` feature.

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "mock"))]
extern crate alloc;

use core::fmt::{self, Write};
use num_derive::FromPrimitive;
use ringbuf::{ringbuf_entry, Ringbuf};

mod bus;
mod bus_lines;
mod device;
mod params;
pub mod patterns;
mod rng;
mod sweep;

#[cfg(feature = "infinite-tests")]
mod soak;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(
    feature = "stm32mp13",
    feature = "stm32mp15",
    feature = "stm32mp25"
))]
pub mod platform;

pub use bus::{BusWidth, DdrBus, Mmio, Word};
pub use params::{Loops, TestParams};
pub use rng::Lcg;

use params::Run;

/// The DDR window tests are allowed to touch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DdrConfig {
    pub base: usize,
    pub size: usize,
}

/// Why a test did not pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// The size is out of range or misaligned. Always code 1.
    BadSize,
    /// The address is outside DDR or misaligned.
    BadAddress(u8),
    /// Memory did not read back what was written.
    Mismatch(u8),
}

impl Failure {
    /// The nonzero code reported for this failure.
    pub fn code(self) -> u32 {
        match self {
            Failure::BadSize => 1,
            Failure::BadAddress(c) | Failure::Mismatch(c) => u32::from(c),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::BadSize => write!(f, "invalid size"),
            Failure::BadAddress(_) => write!(f, "invalid address"),
            Failure::Mismatch(c) => write!(f, "data mismatch ({c})"),
        }
    }
}

pub type TestResult = Result<(), Failure>;

/// The tests this crate implements.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum TestId {
    Databus = 1,
    DatabusWalk0,
    DatabusWalk1,
    AddressBus,
    MemDevice,
    SimultaneousSwitchingOutput,
    Noise,
    NoiseBurst,
    Random,
    FrequencySelectivePattern,
    BlockSequential,
    Checkerboard,
    BitSpread,
    BitFlip,
    WalkingZeroes,
    WalkingOnes,
    #[cfg(feature = "infinite-tests")]
    InfiniteRead,
    #[cfg(feature = "infinite-tests")]
    InfiniteWrite,
}

impl TestId {
    /// Every test that terminates on its own, in table order.
    pub const FINITE: [TestId; 16] = [
        TestId::Databus,
        TestId::DatabusWalk0,
        TestId::DatabusWalk1,
        TestId::AddressBus,
        TestId::MemDevice,
        TestId::SimultaneousSwitchingOutput,
        TestId::Noise,
        TestId::NoiseBurst,
        TestId::Random,
        TestId::FrequencySelectivePattern,
        TestId::BlockSequential,
        TestId::Checkerboard,
        TestId::BitSpread,
        TestId::BitFlip,
        TestId::WalkingZeroes,
        TestId::WalkingOnes,
    ];

    /// The soak tests, which can be asked to run forever.
    #[cfg(feature = "infinite-tests")]
    pub const SOAK: [TestId; 2] = [TestId::InfiniteRead, TestId::InfiniteWrite];

    pub fn name(self) -> &'static str {
        match self {
            TestId::Databus => "Test Simple DataBus",
            TestId::DatabusWalk0 => "Test DataBusWalking0",
            TestId::DatabusWalk1 => "Test DataBusWalking1",
            TestId::AddressBus => "Test AddressBus",
            TestId::MemDevice => "Test MemDevice",
            TestId::SimultaneousSwitchingOutput => {
                "Test SimultaneousSwitchingOutput"
            }
            TestId::Noise => "Test Noise",
            TestId::NoiseBurst => "Test NoiseBurst",
            TestId::Random => "Test Random",
            TestId::FrequencySelectivePattern => {
                "Test FrequencySelectivePattern"
            }
            TestId::BlockSequential => "Test BlockSequential",
            TestId::Checkerboard => "Test Checkerboard",
            TestId::BitSpread => "Test BitSpread",
            TestId::BitFlip => "Test BitFlip",
            TestId::WalkingZeroes => "Test WalkingZeroes",
            TestId::WalkingOnes => "Test WalkingOnes",
            #[cfg(feature = "infinite-tests")]
            TestId::InfiniteRead => "Test Read",
            #[cfg(feature = "infinite-tests")]
            TestId::InfiniteWrite => "Test Write",
        }
    }

    /// Soak tests are never part of "run all".
    pub fn is_soak(self) -> bool {
        #[cfg(feature = "infinite-tests")]
        if matches!(self, TestId::InfiniteRead | TestId::InfiniteWrite) {
            return true;
        }
        false
    }
}

/// Entries recorded in [`Tester::trace`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Trace {
    None,
    Start(TestId),
    Resolved { size: usize, addr: usize },
    InfiniteLoop,
    Mismatch { addr: usize },
    Done(TestId, u32),
}

pub const TRACE_DEPTH: usize = 16;

/// Runs tests against one DDR bus.
pub struct Tester<B: DdrBus> {
    bus: B,
    config: DdrConfig,
    pub trace: Ringbuf<Trace, TRACE_DEPTH>,
}

impl<B: DdrBus> Tester<B> {
    pub fn new(bus: B, config: DdrConfig) -> Self {
        Self {
            bus,
            config,
            trace: Ringbuf::new(Trace::None),
        }
    }

    pub fn config(&self) -> &DdrConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Runs `test` with `params`, writing progress and diagnostics to `out`.
    ///
    /// The memory tests assume DDR is initialized; checking that is the
    /// caller's job.
    pub fn run(
        &mut self,
        test: TestId,
        params: &TestParams,
        out: &mut dyn Write,
    ) -> TestResult {
        ringbuf_entry!(self.trace, Trace::Start(test));

        let mut run = Run {
            bus: &mut self.bus,
            config: &self.config,
            out,
            trace: &mut self.trace,
        };

        let result = match test {
            TestId::Databus => bus_lines::databus(&mut run, params),
            TestId::DatabusWalk0 => {
                bus_lines::databus_walk(&mut run, params, false)
            }
            TestId::DatabusWalk1 => {
                bus_lines::databus_walk(&mut run, params, true)
            }
            TestId::AddressBus => bus_lines::address_bus(&mut run, params),
            TestId::MemDevice => device::mem_device(&mut run, params),
            TestId::SimultaneousSwitchingOutput => {
                device::sso(&mut run, params)
            }
            TestId::Noise => device::noise(&mut run, params),
            TestId::NoiseBurst => device::noise_burst(&mut run, params),
            TestId::Random => sweep::random(&mut run, params),
            TestId::FrequencySelectivePattern => {
                device::freq_pattern(&mut run, params)
            }
            TestId::BlockSequential => sweep::block_sequential(&mut run, params),
            TestId::Checkerboard => sweep::checkerboard(&mut run, params),
            TestId::BitSpread => sweep::bit_spread(&mut run, params),
            TestId::BitFlip => sweep::bit_flip(&mut run, params),
            TestId::WalkingZeroes => sweep::walking(&mut run, params, false),
            TestId::WalkingOnes => sweep::walking(&mut run, params, true),
            #[cfg(feature = "infinite-tests")]
            TestId::InfiniteRead => soak::read(&mut run, params),
            #[cfg(feature = "infinite-tests")]
            TestId::InfiniteWrite => soak::write(&mut run, params),
        };

        let code = result.err().map_or(0, Failure::code);
        ringbuf_entry!(self.trace, Trace::Done(test, code));
        result
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn failure_codes() {
        assert_eq!(Failure::BadSize.code(), 1);
        assert_eq!(Failure::BadAddress(2).code(), 2);
        assert_eq!(Failure::Mismatch(5).code(), 5);
    }

    #[test]
    fn ids_round_trip_through_numbers() {
        for (i, &id) in TestId::FINITE.iter().enumerate() {
            assert_eq!(TestId::from_usize(i + 1), Some(id));
            assert!(!id.is_soak());
        }
        assert_eq!(TestId::from_u8(0), None);
    }

    #[test]
    fn every_test_passes_on_clean_memory() {
        let mut t = tester();
        for &id in TestId::FINITE.iter() {
            let (r, out) = run(&mut t, id, TestParams::default());
            assert_eq!(r, Ok(()), "{}: {out}", id.name());
        }
    }

    #[test]
    fn every_test_passes_on_clean_64bit_memory() {
        let mut t = tester64();
        for &id in TestId::FINITE.iter() {
            let (r, out) = run(&mut t, id, TestParams::default());
            assert_eq!(r, Ok(()), "{}: {out}", id.name());
        }
    }

    #[test]
    fn trace_records_start_and_result() {
        let mut t = tester();
        t.bus_mut().stuck_low(1 << 3);
        let (r, _) = run(&mut t, TestId::Databus, TestParams::default());
        assert_eq!(r, Err(Failure::Mismatch(2)));

        let entries: alloc::vec::Vec<_> =
            t.trace.iter().map(|e| e.payload).collect();
        assert_eq!(entries.first(), Some(&Trace::Start(TestId::Databus)));
        assert_eq!(entries.last(), Some(&Trace::Done(TestId::Databus, 2)));
        assert!(entries.contains(&Trace::Mismatch { addr: BASE }));
    }
}
