//! Receive buffer for one packed frame

use alloc::vec::Vec;
use inkwire_protocol::FRAME_SIZE;

/// The frame buffer could not be reserved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AllocationError {
    /// Bytes requested
    pub requested: usize,
}

/// Source of frame buffer memory
///
/// Allocation is fallible so an exhausted heap is reported as `ERR_MEM`
/// instead of aborting the firmware.
pub trait FrameAllocator {
    /// Reserve `len` zeroed bytes
    fn allocate(&mut self, len: usize) -> Result<Vec<u8>, AllocationError>;
}

/// Allocates from the global heap
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl FrameAllocator for HeapAllocator {
    fn allocate(&mut self, len: usize) -> Result<Vec<u8>, AllocationError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| AllocationError { requested: len })?;
        bytes.resize(len, 0);
        Ok(bytes)
    }
}

/// Fixed-capacity buffer holding exactly one frame
#[derive(Debug, Clone)]
pub struct Framebuffer {
    bytes: Vec<u8>,
}

impl Framebuffer {
    /// Reserve a [`FRAME_SIZE`] buffer
    pub fn allocate<A: FrameAllocator>(allocator: &mut A) -> Result<Self, AllocationError> {
        let bytes = allocator.allocate(FRAME_SIZE)?;
        if bytes.len() != FRAME_SIZE {
            return Err(AllocationError {
                requested: FRAME_SIZE,
            });
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
