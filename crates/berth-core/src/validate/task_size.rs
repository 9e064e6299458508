//! Supported cpu/memory pairings for serverless tasks.

use berth_model::{CpuUnits, MemoryMib};

/// `(cpu, min memory, max memory, step)`.
const SIZES: &[(CpuUnits, MemoryMib, MemoryMib, MemoryMib)] = &[
    (256, 512, 2048, 512),
    (512, 1024, 4096, 1024),
    (1024, 2048, 8192, 1024),
    (2048, 4096, 16384, 1024),
    (4096, 8192, 30720, 1024),
    (8192, 16384, 61440, 4096),
    (16384, 32768, 122880, 8192),
];

pub fn is_supported(cpu: CpuUnits, memory_mib: MemoryMib) -> bool {
    SIZES.iter().any(|&(c, min, max, step)| {
        c == cpu && (min..=max).contains(&memory_mib) && (memory_mib - min) % step == 0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pairings() {
        assert!(is_supported(1024, 2048));
        assert!(is_supported(256, 512));
        assert!(is_supported(256, 1024));
        assert!(is_supported(4096, 30720));
    }

    #[test]
    fn rejected_pairings() {
        assert!(!is_supported(1024, 1024));
        assert!(!is_supported(256, 768));
        assert!(!is_supported(300, 1024));
        assert!(!is_supported(8192, 18432));
    }
}
