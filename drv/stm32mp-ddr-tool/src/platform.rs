// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The DDR controller and PHY driver, as seen from the shell.

use crate::step::BootStep;
use core::fmt::{self, Write};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlatformError {
    /// This platform does not implement the operation.
    Unsupported,
    /// No parameter or register by that name.
    BadParam,
    /// The value is out of range for the parameter.
    BadValue,
    /// The hardware did not do what was asked.
    Failed,
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlatformError::Unsupported => "not supported",
            PlatformError::BadParam => "unknown parameter",
            PlatformError::BadValue => "invalid value",
            PlatformError::Failed => "failed",
        })
    }
}

/// Bring-up and configuration operations behind the non-test commands.
///
/// Only [`enter_step`](DdrPlatform::enter_step) is required; the rest
/// default to [`PlatformError::Unsupported`].
pub trait DdrPlatform {
    /// Does the work for moving from `from` to `to`: controller and PHY
    /// init, training, or a DDR reset when going back to `DDR_RESET`.
    fn enter_step(
        &mut self,
        from: BootStep,
        to: BootStep,
        out: &mut dyn Write,
    ) -> Result<(), PlatformError>;

    /// Prints the DDR description: name, size, type, speed.
    fn info(&mut self, _out: &mut dyn Write) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn set_info(
        &mut self,
        _name: &str,
        _value: u64,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn frequency_khz(&mut self) -> Result<u32, PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn set_frequency_khz(&mut self, _khz: u32) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    /// Prints the settings that will be programmed, optionally only those
    /// matching `filter` (a register group or a register name).
    fn dump_param(
        &mut self,
        _filter: Option<&str>,
        _out: &mut dyn Write,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn edit_param(
        &mut self,
        _name: &str,
        _value: u64,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    /// Prints the live register values, optionally filtered.
    fn dump_reg(
        &mut self,
        _filter: Option<&str>,
        _out: &mut dyn Write,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    fn edit_reg(
        &mut self,
        _name: &str,
        _value: u64,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    /// Prints the current settings in a form that can be pasted into a
    /// device tree.
    fn save(&mut self, _out: &mut dyn Write) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }

    /// Resets the DDR subsystem.
    fn reset(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }
}
