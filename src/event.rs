use std::fmt;

bitflags! {
    /// The set of readiness events a handle can be watched for.
    pub struct EventSet: usize {
        const READABLE = 0b0001;
        const WRITABLE = 0b0010;
    }
}

impl EventSet {
    pub fn readable() -> EventSet {
        EventSet::READABLE
    }

    pub fn is_readable(&self) -> bool {
        self.contains(EventSet::READABLE)
    }

    pub fn writable() -> EventSet {
        EventSet::WRITABLE
    }

    pub fn is_writable(&self) -> bool {
        self.contains(EventSet::WRITABLE)
    }
}

impl fmt::Display for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.is_readable(), self.is_writable()) {
            (true, true) => f.write_str("rw"),
            (true, false) => f.write_str("r"),
            (false, true) => f.write_str("w"),
            (false, false) => f.write_str("-"),
        }
    }
}
