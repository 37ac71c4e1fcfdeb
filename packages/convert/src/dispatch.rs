//! Runtime kernel selection.

use once_cell::sync::Lazy;

/// Which kernel set is active for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// AVX2 vector kernels (x86_64 with OS-supported YMM state).
    Avx2,
    /// Portable scalar kernels.
    Scalar,
}

static ACTIVE: Lazy<Backend> = Lazy::new(detect);

/// The kernel set selected at first use. Probed once, then cached.
#[must_use]
pub fn active() -> Backend {
    *ACTIVE
}

fn detect() -> Backend {
    #[cfg(all(target_arch = "x86_64", feature = "simd"))]
    {
        // Covers the CPUID feature bit and OS XSAVE/YMM state support.
        if is_x86_feature_detected!("avx2") {
            return Backend::Avx2;
        }
    }
    Backend::Scalar
}
