//! Error types for the kernel
//!
//! Uses Rust's Result pattern instead of C-style status codes.

/// Kernel error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ Task table errors ============
    /// Task table is full
    CapacityExceeded = 10001,
    /// Operation exists in the API but has no implementation
    NotImplemented = 10002,

    // ============ Generic failure ============
    /// Queue full, copy failure, duplicate or missing IRQ handler
    OperationFailed = 20001,
    /// Argument out of range (IRQ number, element size, buffer length)
    InvalidArgument = 20002,

    // ============ OS state errors ============
    /// Scheduler has not been started
    NotRunning = 30001,
    /// Scheduler is already running
    AlreadyRunning = 30002,
    /// Kernel was not initialized
    NotInitialized = 30003,

    // ============ Queue errors ============
    /// Non-waiting receive found the queue empty
    QueueEmpty = 40001,
    /// Waiting receive resumed and the queue was still empty
    Timeout = 40002,
}

/// Result type alias for kernel operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Stable numeric code
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(OsError::CapacityExceeded.code(), 10001);
        assert_eq!(OsError::OperationFailed.code(), 20001);
        assert_eq!(OsError::Timeout.code(), 40002);
    }

    #[test]
    fn test_variants_distinct() {
        assert_ne!(OsError::QueueEmpty, OsError::Timeout);
        assert_ne!(OsError::CapacityExceeded.code(), OsError::NotImplemented.code());
    }
}
