//! Host port assignment.
//!
//! Ports are picked purely from bookkeeping: a port is "free" when no record
//! holds it. The OS is never probed, so a returned port may still be bound by
//! an unrelated process.

use crate::error::{Error, Result};
use std::collections::HashSet;

/// Highest assignable TCP port.
pub const MAX_PORT: u32 = 65535;

/// Smallest port `>= start` not in `used`.
///
/// Port 0 is never returned.
pub fn next_free_port(start: u16, used: &HashSet<u16>) -> Result<u16> {
    let mut candidate = u32::from(start.max(1));
    while candidate <= MAX_PORT {
        let port = candidate as u16;
        if !used.contains(&port) {
            return Ok(port);
        }
        candidate += 1;
    }
    Err(Error::RangeExhausted { start })
}

/// Sequential assignment for one pass over a record set.
///
/// Each call to [`PortAssigner::assign`] returns the lowest port at or above
/// the cursor that has not been handed out or claimed in this pass.
#[derive(Debug, Clone)]
pub struct PortAssigner {
    start: u16,
    cursor: u32,
    used: HashSet<u16>,
}

impl PortAssigner {
    pub fn new(start: u16) -> Self {
        Self {
            start,
            cursor: u32::from(start.max(1)),
            used: HashSet::new(),
        }
    }

    /// Mark a port as taken without moving the cursor.
    pub fn claim(&mut self, port: u16) {
        self.used.insert(port);
    }

    pub fn assign(&mut self) -> Result<u16> {
        while self.cursor <= MAX_PORT && self.used.contains(&(self.cursor as u16)) {
            self.cursor += 1;
        }
        if self.cursor > MAX_PORT {
            return Err(Error::RangeExhausted { start: self.start });
        }
        let port = self.cursor as u16;
        self.used.insert(port);
        self.cursor += 1;
        Ok(port)
    }

    pub fn assigned(&self) -> &HashSet<u16> {
        &self.used
    }
}
