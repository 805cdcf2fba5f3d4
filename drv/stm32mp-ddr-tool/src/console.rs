// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line input on a character console.

use core::fmt::Write;

/// Longest command line we keep; further characters are dropped.
pub const LINE_MAX: usize = 1024;

const BACKSPACE: u8 = 0x18;
const BS: u8 = 0x08;
const DEL: u8 = 0x7f;
const CR: u8 = b'\r';
const LF: u8 = b'\n';

pub type Line = heapless::String<LINE_MAX>;

/// The serial console the shell talks through.
pub trait Console: Write {
    /// Blocks until a byte arrives.
    fn getc(&mut self) -> u8;
}

/// Reads one line, echoing what is kept, until carriage return.
///
/// Only printable ASCII goes into the line. Backspace erases the last
/// character on screen and in the buffer; line feed is ignored so that
/// terminals sending CR LF work.
pub fn read_line(console: &mut impl Console) -> Line {
    let mut line = Line::new();
    loop {
        match console.getc() {
            CR => {
                let _ = console.write_str("\r\n");
                return line;
            }
            LF => {}
            BACKSPACE | BS | DEL => {
                if line.pop().is_some() {
                    let _ = console.write_str("\x08 \x08");
                }
            }
            c @ 0x20..=0x7e => {
                if line.push(c as char).is_ok() {
                    let _ = console.write_char(c as char);
                }
            }
            _ => {}
        }
    }
}
