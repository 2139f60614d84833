use crate::error::{Result, SaraError};

/// Source of the transient command and response buffers.
///
/// Operations go through this instead of allocating directly so that an
/// allocation failure is reported as [`SaraError::OutOfMemory`] rather than
/// aborting the process.
pub trait Allocator {
    /// Returns an empty buffer with room for at least `capacity` bytes.
    fn allocate(&self, capacity: usize) -> Result<Vec<u8>>;
}

/// Allocates from the global heap, reporting failure instead of aborting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Heap;

impl Allocator for Heap {
    fn allocate(&self, capacity: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| SaraError::OutOfMemory)?;
        Ok(buf)
    }
}

impl<A: Allocator + ?Sized> Allocator for &A {
    fn allocate(&self, capacity: usize) -> Result<Vec<u8>> {
        (**self).allocate(capacity)
    }
}

/// A zero-filled buffer of exactly `len` bytes, used as a response buffer.
pub fn zeroed<A: Allocator + ?Sized>(alloc: &A, len: usize) -> Result<Vec<u8>> {
    let mut buf = alloc.allocate(len)?;
    buf.resize(len, 0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_reserves_requested_capacity() {
        let buf = Heap.allocate(128).unwrap();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 128);
    }

    #[test]
    fn heap_reports_impossible_allocation() {
        let err = Heap.allocate(usize::MAX).unwrap_err();
        assert!(matches!(err, SaraError::OutOfMemory));
    }

    #[test]
    fn zeroed_has_exact_length() {
        let buf = zeroed(&Heap, 64).unwrap();
        assert_eq!(buf.len(), 64);
        assert!(buf.iter().all(|&b| b == 0));
    }
}
