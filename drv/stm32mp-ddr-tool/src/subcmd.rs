// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `test` sub-commands: one per memory test, plus "run all" at
//! index 0.

use crate::cmd::{parse_number, CommandError};
use core::fmt::Write;
use drv_stm32mp_ddr_test::{DdrBus, Failure, TestId, TestParams, Tester};

/// How a sub-command's arguments become [`TestParams`]. Each variant takes
/// exactly that many numbers, in the order its usage string shows.
#[derive(Copy, Clone)]
pub enum Args {
    One(fn(u64) -> TestParams),
    Two(fn(u64, u64) -> TestParams),
    Three(fn(u64, u64, u64) -> TestParams),
}

impl Args {
    pub fn count(self) -> usize {
        match self {
            Args::One(_) => 1,
            Args::Two(_) => 2,
            Args::Three(_) => 3,
        }
    }

    fn apply(self, n: &[u64; 3]) -> TestParams {
        match self {
            Args::One(f) => f(n[0]),
            Args::Two(f) => f(n[0], n[1]),
            Args::Three(f) => f(n[0], n[1], n[2]),
        }
    }
}

fn addr(addr: u64) -> TestParams {
    TestParams::new(0, 0, addr)
}

fn loop_addr(loop_count: u64, addr: u64) -> TestParams {
    TestParams::new(loop_count, 0, addr)
}

fn size_addr(size: u64, addr: u64) -> TestParams {
    TestParams::new(0, size, addr)
}

fn loop_size_addr(loop_count: u64, size: u64, addr: u64) -> TestParams {
    TestParams::new(loop_count, size, addr)
}

fn size_loop_addr(size: u64, loop_count: u64, addr: u64) -> TestParams {
    TestParams::new(loop_count, size, addr)
}

pub struct SubCommand {
    /// `None` for "run all".
    pub test: Option<TestId>,
    pub args: Args,
    pub usage: &'static str,
    pub help: &'static str,
}

impl SubCommand {
    pub fn name(&self) -> &'static str {
        self.test.map_or("Test All", TestId::name)
    }

    /// Checks and converts the arguments after the index. "Run all" takes
    /// up to its full count and treats missing ones as 0; everything else
    /// wants exactly its count.
    pub fn bind<'a>(
        &self,
        index: u64,
        args: &[&'a str],
    ) -> Result<TestParams, CommandError<'a>> {
        let count = self.args.count();
        let ok = if self.test.is_none() {
            args.len() <= count
        } else {
            args.len() == count
        };
        if !ok {
            return Err(CommandError::SubCommandArgs {
                index,
                given: args.len(),
                usage: self.usage,
            });
        }

        let mut n = [0u64; 3];
        for (i, &text) in args.iter().enumerate() {
            n[i] = parse_number(text).ok_or(CommandError::InvalidArgument {
                position: i + 2,
                text,
            })?;
        }
        Ok(self.args.apply(&n))
    }
}

pub const SUBCOMMANDS: &[SubCommand] = &[
    SubCommand {
        test: None,
        args: Args::Three(loop_size_addr),
        usage: "[loop] [size] [addr]",
        help: "run every test in turn, stopping at the first failure",
    },
    SubCommand {
        test: Some(TestId::Databus),
        args: Args::One(addr),
        usage: "<addr>",
        help: "walking one on a single word: data lines stuck or shorted",
    },
    SubCommand {
        test: Some(TestId::DatabusWalk0),
        args: Args::Two(loop_addr),
        usage: "<loop> <addr>",
        help: "one word per data line, each with that line low",
    },
    SubCommand {
        test: Some(TestId::DatabusWalk1),
        args: Args::Two(loop_addr),
        usage: "<loop> <addr>",
        help: "one word per data line, each with that line high",
    },
    SubCommand {
        test: Some(TestId::AddressBus),
        args: Args::Two(size_addr),
        usage: "<size> <addr>",
        help: "address lines stuck or shorted; size is a power of 2",
    },
    SubCommand {
        test: Some(TestId::MemDevice),
        args: Args::Two(size_addr),
        usage: "<size> <addr>",
        help: "every cell: counter, then its complement",
    },
    SubCommand {
        test: Some(TestId::SimultaneousSwitchingOutput),
        args: Args::Two(size_addr),
        usage: "<size> <addr>",
        help: "all data lines switching at once, read after each write",
    },
    SubCommand {
        test: Some(TestId::Noise),
        args: Args::One(addr),
        usage: "<addr>",
        help: "back to back pattern and antipattern bursts",
    },
    SubCommand {
        test: Some(TestId::NoiseBurst),
        args: Args::Two(size_addr),
        usage: "<size> <addr>",
        help: "noise bursts over a region, size a multiple of 128",
    },
    SubCommand {
        test: Some(TestId::Random),
        args: Args::Three(size_loop_addr),
        usage: "<size> <loop> <addr>",
        help: "random data in one half, copied to the other",
    },
    SubCommand {
        test: Some(TestId::FrequencySelectivePattern),
        args: Args::Two(size_addr),
        usage: "<size> <addr>",
        help: "patterns toggling at f, f/2 and f/4",
    },
    SubCommand {
        test: Some(TestId::BlockSequential),
        args: Args::Three(size_loop_addr),
        usage: "<size> <loop> <addr>",
        help: "each byte value in every lane",
    },
    SubCommand {
        test: Some(TestId::Checkerboard),
        args: Args::Three(size_loop_addr),
        usage: "<size> <loop> <addr>",
        help: "0x55 and 0xAA, then swapped",
    },
    SubCommand {
        test: Some(TestId::BitSpread),
        args: Args::Three(size_loop_addr),
        usage: "<size> <loop> <addr>",
        help: "every pair of data bits",
    },
    SubCommand {
        test: Some(TestId::BitFlip),
        args: Args::Three(size_loop_addr),
        usage: "<size> <loop> <addr>",
        help: "every data bit and its complement",
    },
    SubCommand {
        test: Some(TestId::WalkingZeroes),
        args: Args::Three(size_loop_addr),
        usage: "<size> <loop> <addr>",
        help: "a zero walking across the word",
    },
    SubCommand {
        test: Some(TestId::WalkingOnes),
        args: Args::Three(size_loop_addr),
        usage: "<size> <loop> <addr>",
        help: "a one walking across the word",
    },
    #[cfg(feature = "infinite-tests")]
    SubCommand {
        test: Some(TestId::InfiniteRead),
        args: Args::Three(size_loop_addr),
        usage: "<size> <loop> <addr>",
        help: "keep reading; loop 0xffffffff never ends",
    },
    #[cfg(feature = "infinite-tests")]
    SubCommand {
        test: Some(TestId::InfiniteWrite),
        args: Args::Three(size_loop_addr),
        usage: "<size> <loop> <addr>",
        help: "keep writing; loop 0xffffffff never ends",
    },
];

/// Prints the table: a count line, then one line per sub-command.
pub fn list(out: &mut dyn Write, with_help: bool) {
    let _ = writeln!(out, "test:{}", SUBCOMMANDS.len());
    for (i, sub) in SUBCOMMANDS.iter().enumerate() {
        let _ = write!(out, "{i}:{}:{}", sub.name(), sub.usage);
        if with_help {
            let _ = write!(out, ":{}", sub.help);
        }
        let _ = writeln!(out);
    }
}

/// Runs every finite test in table order with the same parameters,
/// printing a line per result. Stops at the first failure, returning its
/// table index and the failure.
pub fn run_all<B: DdrBus>(
    tester: &mut Tester<B>,
    params: &TestParams,
    out: &mut dyn Write,
) -> Result<(), (usize, Failure)> {
    for (i, sub) in SUBCOMMANDS.iter().enumerate() {
        let Some(test) = sub.test.filter(|t| !t.is_soak()) else {
            continue;
        };
        if let Err(failure) = tester.run(test, params, &mut *out) {
            let _ = writeln!(
                out,
                "Result: Failed [Test All] {i}:{} = {}",
                test.name(),
                failure.code(),
            );
            return Err((i, failure));
        }
        let _ = writeln!(out, "Result: Pass [{}]", test.name());
    }
    Ok(())
}
