//! Plugin memory allocation with host accounting
//!
//! Effects allocate scratch memory through the host so the application can
//! account for it globally. Requests may come from render worker threads,
//! so the bookkeeping is atomic. Freeing happens on drop.

use std::sync::atomic::{AtomicUsize, Ordering};

static TOTAL_IN_USE: AtomicUsize = AtomicUsize::new(0);

/// A block of host-accounted memory owned by an effect
#[derive(Debug)]
pub struct EffectMemory {
    data: Vec<u8>,
    label: String,
}

impl EffectMemory {
    /// Allocate `bytes` zeroed bytes on behalf of the effect labelled
    /// `label`. Returns `None` when the allocation cannot be satisfied.
    pub fn allocate(label: &str, bytes: usize) -> Option<Self> {
        let mut data = Vec::new();
        if data.try_reserve_exact(bytes).is_err() {
            return None;
        }
        data.resize(bytes, 0);
        TOTAL_IN_USE.fetch_add(bytes, Ordering::AcqRel);
        Some(Self {
            data,
            label: label.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for EffectMemory {
    fn drop(&mut self) {
        TOTAL_IN_USE.fetch_sub(self.data.len(), Ordering::AcqRel);
    }
}

/// Total bytes currently allocated to effects across the process
pub fn total_in_use() -> usize {
    TOTAL_IN_USE.load(Ordering::Acquire)
}

/// Human-readable byte count for dialogs and logs
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accounting_tracks_live_allocations() {
        // Other tests may allocate concurrently, so only the lower bound
        // given by our own live block is a safe assertion.
        let block = EffectMemory::allocate("blur1", 4096).unwrap();
        assert_eq!(block.len(), 4096);
        assert_eq!(block.label(), "blur1");
        assert!(total_in_use() >= 4096);
    }

    #[test]
    fn test_zero_byte_allocation() {
        let block = EffectMemory::allocate("blur1", 0).unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn test_memory_is_zeroed_and_writable() {
        let mut block = EffectMemory::allocate("blur1", 16).unwrap();
        assert!(block.as_slice().iter().all(|&b| b == 0));
        block.as_mut_slice()[0] = 0xFF;
        assert_eq!(block.as_slice()[0], 0xFF);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
