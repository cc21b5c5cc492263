//! Operator console over defmt
//!
//! Session diagnostics are written with `core::fmt`; each completed line
//! becomes one `defmt::info!` record.

use core::fmt;

const LINE_LEN: usize = 128;

#[derive(Default)]
pub struct DefmtConsole {
    line: heapless::String<LINE_LEN>,
}

impl DefmtConsole {
    pub const fn new() -> Self {
        Self {
            line: heapless::String::new(),
        }
    }

    fn flush(&mut self) {
        defmt::info!("{=str}", self.line.as_str());
        self.line.clear();
    }
}

impl fmt::Write for DefmtConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if c == '\n' {
                self.flush();
                continue;
            }
            if self.line.push(c).is_err() {
                // Overlong line: emit what we have and continue on a new record
                self.flush();
                let _ = self.line.push(c);
            }
        }
        Ok(())
    }
}
