// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command table, tokenizing, and the errors a command line can produce.

use crate::platform::PlatformError;
use crate::step::BootStep;
use core::fmt;

/// Most arguments any command takes.
pub const MAX_ARGS: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Info,
    Freq,
    Param,
    Print,
    Edit,
    Save,
    Step,
    Next,
    Go,
    Reset,
    Test,
}

pub struct Command {
    pub name: &'static str,
    pub kind: CommandKind,
    pub min: usize,
    pub max: usize,
    pub usage: &'static str,
    pub help: &'static str,
}

pub const COMMANDS: [Command; 12] = [
    Command {
        name: "help",
        kind: CommandKind::Help,
        min: 0,
        max: 0,
        usage: "",
        help: "this list",
    },
    Command {
        name: "info",
        kind: CommandKind::Info,
        min: 0,
        max: 2,
        usage: "[<param> <val>]",
        help: "show or change the DDR description",
    },
    Command {
        name: "freq",
        kind: CommandKind::Freq,
        min: 0,
        max: 1,
        usage: "[<khz>]",
        help: "show or change the DDR clock",
    },
    Command {
        name: "param",
        kind: CommandKind::Param,
        min: 0,
        max: 2,
        usage: "[<type|reg>] [<val>]",
        help: "show settings, or change one (step 0 only)",
    },
    Command {
        name: "print",
        kind: CommandKind::Print,
        min: 0,
        max: 1,
        usage: "[<type|reg>]",
        help: "show register values",
    },
    Command {
        name: "edit",
        kind: CommandKind::Edit,
        min: 2,
        max: 2,
        usage: "<reg> <val>",
        help: "change a register",
    },
    Command {
        name: "save",
        kind: CommandKind::Save,
        min: 0,
        max: 0,
        usage: "",
        help: "print the current settings",
    },
    Command {
        name: "step",
        kind: CommandKind::Step,
        min: 0,
        max: 1,
        usage: "[<n>]",
        help: "list steps, or go to step n",
    },
    Command {
        name: "next",
        kind: CommandKind::Next,
        min: 0,
        max: 0,
        usage: "",
        help: "go to the next step",
    },
    Command {
        name: "go",
        kind: CommandKind::Go,
        min: 0,
        max: 0,
        usage: "",
        help: "go to the last step and leave",
    },
    Command {
        name: "reset",
        kind: CommandKind::Reset,
        min: 0,
        max: 0,
        usage: "",
        help: "reset the DDR and go back to step 0",
    },
    Command {
        name: "test",
        kind: CommandKind::Test,
        min: 0,
        max: MAX_ARGS,
        usage: "[help] | <n> [<args>]",
        help: "list or run tests (step 3 only)",
    },
];

pub fn lookup(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// A command line split into its command word and arguments.
pub struct Tokens<'a> {
    pub name: &'a str,
    pub args: heapless::Vec<&'a str, MAX_ARGS>,
}

/// Splits `line` on whitespace. Returns `None` for a blank line.
pub fn tokenize(line: &str) -> Result<Option<Tokens<'_>>, CommandError<'_>> {
    let mut words = line.split_ascii_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let mut args = heapless::Vec::new();
    for w in words {
        if args.push(w).is_err() {
            return Err(CommandError::TooManyParams(name));
        }
    }
    Ok(Some(Tokens { name, args }))
}

/// Parses a non-negative number: `0x`/`0X` followed by hex digits, or
/// decimal. Parsing stops at the first character that is not a digit; it
/// fails if there are no digits at all or the value overflows.
pub fn parse_number(text: &str) -> Option<u64> {
    let (digits, radix) = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };

    let mut value: Option<u64> = None;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        value = Some(
            value
                .unwrap_or(0)
                .checked_mul(u64::from(radix))?
                .checked_add(u64::from(d))?,
        );
    }
    value
}

/// Everything that can be wrong with a command line. None of these are
/// fatal; the shell prints them and reads the next line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandError<'a> {
    Unknown(&'a str),
    NotEnoughParams(&'a str),
    TooManyParams(&'a str),
    /// Argument `position` (counting from 1) is not a number.
    InvalidArgument {
        position: usize,
        text: &'a str,
    },
    /// The command needs a different boot step.
    InvalidStep {
        current: BootStep,
        expected: BootStep,
    },
    /// `step` to somewhere it cannot go from here.
    InvalidTarget {
        target: u64,
        current: BootStep,
    },
    UnknownSubCommand(u64),
    SubCommandArgs {
        index: u64,
        given: usize,
        usage: &'static str,
    },
    /// Right count but wrong shape, e.g. one of two paired arguments.
    Usage(&'static str, &'static str),
    Platform(PlatformError),
}

impl From<PlatformError> for CommandError<'_> {
    fn from(e: PlatformError) -> Self {
        CommandError::Platform(e)
    }
}

impl fmt::Display for CommandError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(name) => write!(f, "{name}: unknown command"),
            CommandError::NotEnoughParams(name) => {
                write!(f, "{name}: not enough parameters")
            }
            CommandError::TooManyParams(name) => {
                write!(f, "{name}: too many parameters")
            }
            CommandError::InvalidArgument { position, text } => {
                write!(f, "invalid argument {position}: '{text}'")
            }
            CommandError::InvalidStep { current, expected } => {
                write!(f, "invalid step {current} expecting {expected}")
            }
            CommandError::InvalidTarget { target, current } => {
                write!(f, "invalid target step {target} from step {current}")
            }
            CommandError::UnknownSubCommand(index) => {
                write!(f, "test {index}: unknown sub command")
            }
            CommandError::SubCommandArgs {
                index,
                given,
                usage,
            } => {
                write!(
                    f,
                    "test {index}: wrong number of arguments ({given}), \
                     usage: test {index} {usage}"
                )
            }
            CommandError::Usage(name, usage) => {
                write!(f, "usage: {name} {usage}")
            }
            CommandError::Platform(e) => write!(f, "{e}"),
        }
    }
}
