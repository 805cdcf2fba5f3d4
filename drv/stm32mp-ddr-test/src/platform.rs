// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Where DDR lives on each supported SoC. Exactly one of the `stm32mp13`,
//! `stm32mp15` or `stm32mp25` features selects the constants here.

use crate::{DdrConfig, Mmio};

cfg_if::cfg_if! {
    if #[cfg(feature = "stm32mp25")] {
        pub const DDR_BASE: usize = 0x8000_0000;
        pub const DDR_MEM_SIZE: usize = 0x8000_0000;
        pub const DDRCTRL_BASE: usize = 0x4804_0000;
        pub type NativeWord = u64;
    } else if #[cfg(feature = "stm32mp15")] {
        pub const DDR_BASE: usize = 0xc000_0000;
        pub const DDR_MEM_SIZE: usize = 0x4000_0000;
        pub const DDRCTRL_BASE: usize = 0x5a00_3000;
        pub type NativeWord = u32;
    } else if #[cfg(feature = "stm32mp13")] {
        pub const DDR_BASE: usize = 0xc000_0000;
        pub const DDR_MEM_SIZE: usize = 0x2000_0000;
        pub const DDRCTRL_BASE: usize = 0x5a00_3000;
        pub type NativeWord = u32;
    }
}

/// `MSTR` is the first DDRCTRL register.
pub const DDRCTRL_MSTR: usize = DDRCTRL_BASE;

pub const CONFIG: DdrConfig = DdrConfig {
    base: DDR_BASE,
    size: DDR_MEM_SIZE,
};

/// The bus to hand to a [`Tester`](crate::Tester) on target.
///
/// # Safety
///
/// As for [`Mmio::new`]: DDR must be initialized and the tested range must
/// not be in use by anything else.
pub unsafe fn bus() -> Mmio<NativeWord> {
    // Safety: passed on to our caller.
    unsafe { Mmio::new(Some(DDRCTRL_MSTR)) }
}
