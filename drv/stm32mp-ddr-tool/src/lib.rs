// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interactive DDR tool.
//!
//! A line-oriented shell on the serial console that walks the DDR
//! subsystem through bring-up one [`BootStep`] at a time and, once DDR is
//! ready, runs the memory tests from `drv-stm32mp-ddr-test` on request.
//!
//! ```text
//! step to 0:DDR_RESET
//! DDR>step 3
//! step to 3:DDR_READY
//! DDR>test 1 0xC0000000
//! Result: Pass [Test Simple DataBus]
//! DDR>go
//! step to 4:RUN
//! DDR tool done: reset the board to restart
//! ```
//!
//! Every problem with a command line is reported on the console and the
//! shell carries on with the next line. The shell returns only when the
//! `RUN` step is reached.

#![cfg_attr(not(test), no_std)]

use drv_stm32mp_ddr_test::{DdrBus, Tester};
use ringbuf::{ringbuf_entry, Ringbuf};

mod cmd;
mod console;
mod platform;
mod step;
mod subcmd;

pub use cmd::{parse_number, CommandError, CommandKind, COMMANDS};
pub use console::{read_line, Console, Line, LINE_MAX};
pub use platform::{DdrPlatform, PlatformError};
pub use step::BootStep;
pub use subcmd::{SubCommand, SUBCOMMANDS};

use cmd::Tokens;

/// Entries recorded in [`Shell::trace`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Trace {
    None,
    Command(CommandKind),
    /// A line that was refused; `None` if the command was not recognized.
    Rejected(Option<CommandKind>),
    Step(BootStep),
    Dispatch(u8),
    Result(u8, u32),
}

pub const TRACE_DEPTH: usize = 32;

/// What a successfully executed line did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to execute.
    Empty,
    Done,
    /// A `test` sub-command ran; `code` is 0 for a pass.
    Test { index: u8, code: u32 },
}

pub struct Shell<B: DdrBus, C: Console, P: DdrPlatform> {
    console: C,
    platform: P,
    tester: Tester<B>,
    step: BootStep,
    pub trace: Ringbuf<Trace, TRACE_DEPTH>,
}

impl<B: DdrBus, C: Console, P: DdrPlatform> Shell<B, C, P> {
    /// A shell at `DDR_RESET`. Nothing is printed until [`Shell::run`].
    pub fn new(console: C, platform: P, tester: Tester<B>) -> Self {
        Self {
            console,
            platform,
            tester,
            step: BootStep::DdrReset,
            trace: Ringbuf::new(Trace::None),
        }
    }

    pub fn step(&self) -> BootStep {
        self.step
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn tester(&self) -> &Tester<B> {
        &self.tester
    }

    pub fn tester_mut(&mut self) -> &mut Tester<B> {
        &mut self.tester
    }

    /// Reads and executes lines until the `RUN` step is reached.
    pub fn run(&mut self) {
        let _ = writeln!(self.console, "step to {}", self.step);
        while self.step != BootStep::Run {
            let _ = write!(self.console, "DDR>");
            let line = console::read_line(&mut self.console);
            if let Err(e) = self.execute(&line) {
                let _ = writeln!(self.console, "{e}");
            }
        }
    }

    /// Executes one command line.
    pub fn execute<'l>(
        &mut self,
        line: &'l str,
    ) -> Result<Outcome, CommandError<'l>> {
        let r = self.dispatch(line);
        if let Err(e) = r {
            let kind = match e {
                CommandError::Unknown(_) => None,
                _ => cmd::tokenize(line)
                    .ok()
                    .flatten()
                    .and_then(|t| cmd::lookup(t.name))
                    .map(|c| c.kind),
            };
            ringbuf_entry!(self.trace, Trace::Rejected(kind));
        }
        r
    }

    fn dispatch<'l>(
        &mut self,
        line: &'l str,
    ) -> Result<Outcome, CommandError<'l>> {
        let Some(Tokens { name, args }) = cmd::tokenize(line)? else {
            return Ok(Outcome::Empty);
        };
        let command = cmd::lookup(name).ok_or(CommandError::Unknown(name))?;
        if args.len() < command.min {
            return Err(CommandError::NotEnoughParams(command.name));
        }
        if args.len() > command.max {
            return Err(CommandError::TooManyParams(command.name));
        }
        ringbuf_entry!(self.trace, Trace::Command(command.kind));

        let out = &mut self.console;
        match (command.kind, &args[..]) {
            (CommandKind::Help, _) => {
                for c in COMMANDS.iter() {
                    let _ =
                        writeln!(out, "{:<6}{:<24}{}", c.name, c.usage, c.help);
                }
            }
            (CommandKind::Info, &[]) => self.platform.info(out)?,
            (CommandKind::Info, &[param, value]) => {
                let value = number(value, 2)?;
                self.platform.set_info(param, value)?;
            }
            (CommandKind::Freq, &[]) => {
                let khz = self.platform.frequency_khz()?;
                let _ = writeln!(out, "DDR frequency: {khz} kHz");
            }
            (CommandKind::Freq, &[khz]) => {
                let khz = u32::try_from(number(khz, 1)?).map_err(|_| {
                    CommandError::InvalidArgument {
                        position: 1,
                        text: khz,
                    }
                })?;
                self.platform.set_frequency_khz(khz)?;
            }
            (CommandKind::Param, &[name, value]) => {
                if self.step != BootStep::DdrReset {
                    return Err(CommandError::InvalidStep {
                        current: self.step,
                        expected: BootStep::DdrReset,
                    });
                }
                let value = number(value, 2)?;
                self.platform.edit_param(name, value)?;
            }
            (CommandKind::Param, filter) => {
                self.platform.dump_param(filter.first().copied(), out)?
            }
            (CommandKind::Print, filter) => {
                self.platform.dump_reg(filter.first().copied(), out)?
            }
            (CommandKind::Edit, &[name, value]) => {
                let value = number(value, 2)?;
                self.platform.edit_reg(name, value)?;
            }
            (CommandKind::Save, _) => self.platform.save(out)?,
            (CommandKind::Step, &[]) => {
                for s in BootStep::ALL {
                    let _ = writeln!(out, "{s}");
                }
                let _ = writeln!(out, "current step is {}", self.step);
            }
            (CommandKind::Step, &[target]) => {
                let n = number(target, 1)?;
                let to = BootStep::from_index(n)
                    .filter(|&to| self.step.can_jump_to(to))
                    .ok_or(CommandError::InvalidTarget {
                        target: n,
                        current: self.step,
                    })?;
                self.set_step(to)?;
            }
            (CommandKind::Next, _) => self.set_step(self.step.next())?,
            (CommandKind::Go, _) => self.set_step(BootStep::Run)?,
            (CommandKind::Reset, _) => {
                self.platform.reset()?;
                self.set_step(BootStep::DdrReset)?;
            }
            (CommandKind::Test, args) => return self.test(args),
            // Within the table's bounds, but not a shape the command takes.
            (
                CommandKind::Info
                | CommandKind::Freq
                | CommandKind::Step
                | CommandKind::Edit,
                _,
            ) => return Err(CommandError::Usage(command.name, command.usage)),
        }
        Ok(Outcome::Done)
    }

    /// Moves to `to`, letting the platform do the work first. On failure
    /// the step is unchanged and not announced.
    fn set_step(&mut self, to: BootStep) -> Result<(), PlatformError> {
        self.platform.enter_step(self.step, to, &mut self.console)?;
        self.step = to;
        let _ = writeln!(self.console, "step to {to}");
        ringbuf_entry!(self.trace, Trace::Step(to));
        if to == BootStep::Run {
            let _ = writeln!(
                self.console,
                "DDR tool done: reset the board to restart"
            );
        }
        Ok(())
    }

    fn test<'l>(
        &mut self,
        args: &[&'l str],
    ) -> Result<Outcome, CommandError<'l>> {
        if self.step != BootStep::DdrReady {
            return Err(CommandError::InvalidStep {
                current: self.step,
                expected: BootStep::DdrReady,
            });
        }

        let (index_text, rest) = match args {
            [] => {
                subcmd::list(&mut self.console, false);
                return Ok(Outcome::Done);
            }
            ["help", ..] => {
                subcmd::list(&mut self.console, true);
                return Ok(Outcome::Done);
            }
            [first, rest @ ..] => (*first, rest),
        };

        let index = number(index_text, 1)?;
        let sub = usize::try_from(index)
            .ok()
            .and_then(|i| SUBCOMMANDS.get(i))
            .ok_or(CommandError::UnknownSubCommand(index))?;
        let params = sub.bind(index, rest)?;

        // The table is small enough that every index fits.
        let index = index as u8;
        ringbuf_entry!(self.trace, Trace::Dispatch(index));

        let out = &mut self.console;
        let code = match sub.test {
            None => match subcmd::run_all(&mut self.tester, &params, out) {
                Ok(()) => {
                    let _ = writeln!(out, "Result: Pass [{}]", sub.name());
                    0
                }
                Err((_, failure)) => failure.code(),
            },
            Some(test) => match self.tester.run(test, &params, out) {
                Ok(()) => {
                    let _ = writeln!(out, "Result: Pass [{}]", sub.name());
                    0
                }
                Err(failure) => {
                    let _ = writeln!(
                        out,
                        "Result: Failed [{}] = {}",
                        sub.name(),
                        failure.code()
                    );
                    failure.code()
                }
            },
        };

        ringbuf_entry!(self.trace, Trace::Result(index, code));
        Ok(Outcome::Test { index, code })
    }
}

/// Parses argument `position` of a command line.
fn number(text: &str, position: usize) -> Result<u64, CommandError<'_>> {
    parse_number(text).ok_or(CommandError::InvalidArgument { position, text })
}

#[cfg(test)]
mod tests;
