use std::alloc::Layout;
use std::fmt::Display;

/// Reason a capacity change could not be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveError {
    /// The requested capacity does not fit in the address space.
    CapacityOverflow,
    /// The allocator refused the request.
    AllocFailed { layout: Layout },
}

impl Display for ReserveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReserveError::CapacityOverflow => Display::fmt("Requested capacity exceeds the maximum allocation size", f),
            ReserveError::AllocFailed { layout } => write!(f, "Memory allocation of {} bytes (align {}) failed", layout.size(), layout.align()),
        }
    }
}

impl std::error::Error for ReserveError {}

#[cfg(test)]
mod error_tests {
    use super::ReserveError;
    use std::alloc::Layout;

    #[test]
    fn messages() {
        assert_eq!(
            "Requested capacity exceeds the maximum allocation size",
            ReserveError::CapacityOverflow.to_string()
        );
        let layout = Layout::array::<u32>(4).unwrap();
        assert_eq!(
            "Memory allocation of 16 bytes (align 4) failed",
            ReserveError::AllocFailed { layout }.to_string()
        );
    }
}
