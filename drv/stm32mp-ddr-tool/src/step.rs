// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::fmt;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// How far DDR bring-up has got. Steps only move forward, except for a
/// jump back to [`BootStep::DdrReset`].
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, FromPrimitive,
)]
pub enum BootStep {
    DdrReset = 0,
    CtrlInit = 1,
    PhyInit = 2,
    DdrReady = 3,
    Run = 4,
}

impl BootStep {
    pub const ALL: [BootStep; 5] = [
        BootStep::DdrReset,
        BootStep::CtrlInit,
        BootStep::PhyInit,
        BootStep::DdrReady,
        BootStep::Run,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BootStep::DdrReset => "DDR_RESET",
            BootStep::CtrlInit => "CTRL_INIT",
            BootStep::PhyInit => "PHY_INIT",
            BootStep::DdrReady => "DDR_READY",
            BootStep::Run => "RUN",
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(n: u64) -> Option<Self> {
        Self::from_u64(n)
    }

    /// The step after this one; `Run` is terminal.
    pub fn next(self) -> Self {
        Self::from_u8(self as u8 + 1).unwrap_or(BootStep::Run)
    }

    /// Whether `target` can be reached from here with `step`.
    pub fn can_jump_to(self, target: BootStep) -> bool {
        target == BootStep::DdrReset || target > self
    }
}

/// Prints as `<index>:<NAME>`, the way the shell shows steps.
impl fmt::Display for BootStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_advance_to_run() {
        let mut step = BootStep::DdrReset;
        for expected in &BootStep::ALL[1..] {
            step = step.next();
            assert_eq!(step, *expected);
        }
        assert_eq!(step.next(), BootStep::Run);
    }

    #[test]
    fn only_forward_or_reset() {
        for from in BootStep::ALL {
            for to in BootStep::ALL {
                let ok = from.can_jump_to(to);
                assert_eq!(ok, to == BootStep::DdrReset || to > from);
            }
        }
        assert!(BootStep::DdrReset.can_jump_to(BootStep::DdrReset));
        assert!(!BootStep::PhyInit.can_jump_to(BootStep::PhyInit));
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", BootStep::DdrReady), "3:DDR_READY");
        assert_eq!(BootStep::from_index(4), Some(BootStep::Run));
        assert_eq!(BootStep::from_index(5), None);
    }
}
