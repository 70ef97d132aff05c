//! Denormal (subnormal) suppression
//!
//! Two layers: [`DenormalGuard`] switches the FPU to flush-to-zero for the
//! duration of a processing block, and [`flush_denormal`] zeroes tiny filter
//! history values on targets where the guard is a no-op.

/// Magnitude below which recursive filter state is zeroed
pub const DENORMAL_THRESHOLD: f32 = 1.0e-20;

/// Zero out values too small to matter before they become subnormal
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        x
    }
}

/// RAII guard enabling flush-to-zero / denormals-are-zero
///
/// The previous floating-point control state is restored on drop, so the
/// guard only affects the block it wraps. On targets without a known
/// control register it does nothing.
#[must_use = "the FTZ mode is restored when the guard is dropped"]
pub struct DenormalGuard {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    saved_mxcsr: u32,
    #[cfg(target_arch = "aarch64")]
    saved_fpcr: u64,
}

// The SSE control-register intrinsics are deprecated in favour of inline asm
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[allow(deprecated)]
mod arch {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::{_mm_getcsr, _mm_setcsr};
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::{_mm_getcsr, _mm_setcsr};

    /// MXCSR flush-to-zero (bit 15) and denormals-are-zero (bit 6)
    const FTZ_DAZ: u32 = 0x8040;

    pub(super) fn enable() -> u32 {
        // SAFETY: SSE is part of the x86_64 baseline; only the FTZ/DAZ bits change.
        unsafe {
            let saved = _mm_getcsr();
            _mm_setcsr(saved | FTZ_DAZ);
            saved
        }
    }

    pub(super) fn restore(saved: u32) {
        // SAFETY: restores a value previously read from the same register.
        unsafe { _mm_setcsr(saved) }
    }

    #[cfg(test)]
    pub(super) fn flush_enabled() -> bool {
        // SAFETY: read-only access to MXCSR.
        unsafe { _mm_getcsr() & FTZ_DAZ == FTZ_DAZ }
    }
}

#[cfg(target_arch = "aarch64")]
mod arch {
    use std::arch::asm;

    /// FPCR flush-to-zero (bit 24)
    const FZ: u64 = 1 << 24;

    pub(super) fn enable() -> u64 {
        let saved: u64;
        // SAFETY: reading and writing FPCR only changes floating-point modes.
        unsafe {
            asm!("mrs {}, fpcr", out(reg) saved, options(nomem, nostack));
            asm!("msr fpcr, {}", in(reg) saved | FZ, options(nostack));
        }
        saved
    }

    pub(super) fn restore(saved: u64) {
        // SAFETY: restores a value previously read from the same register.
        unsafe {
            asm!("msr fpcr, {}", in(reg) saved, options(nostack));
        }
    }

    #[cfg(test)]
    pub(super) fn flush_enabled() -> bool {
        let fpcr: u64;
        // SAFETY: read-only access to FPCR.
        unsafe {
            asm!("mrs {}, fpcr", out(reg) fpcr, options(nomem, nostack));
        }
        fpcr & FZ == FZ
    }
}

impl DenormalGuard {
    pub fn new() -> Self {
        Self {
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            saved_mxcsr: arch::enable(),
            #[cfg(target_arch = "aarch64")]
            saved_fpcr: arch::enable(),
        }
    }
}

impl Default for DenormalGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DenormalGuard {
    fn drop(&mut self) {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        arch::restore(self.saved_mxcsr);
        #[cfg(target_arch = "aarch64")]
        arch::restore(self.saved_fpcr);
    }
}
