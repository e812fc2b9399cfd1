//! Pull-based sample source consumed by every pipeline stage.

use crate::error::Result;

/// Pull-based access to a waveform.
///
/// Implementors expose the total sample count and copy `out.len()` samples
/// starting at `offset` into `out` on request. Samples may live anywhere
/// (memory, flash, a file); the pipeline never owns them.
///
/// Callers must never request past `total_length()`: `offset + out.len()`
/// is checked by the caller before `read` is invoked.
///
/// # Example
/// ```
/// use mf_core::error::Result;
/// use mf_core::signal::Signal;
///
/// struct Ramp(usize);
///
/// impl Signal for Ramp {
///     fn total_length(&self) -> usize {
///         self.0
///     }
///
///     fn read(&mut self, offset: usize, out: &mut [f32]) -> Result<usize> {
///         for (i, s) in out.iter_mut().enumerate() {
///             *s = (offset + i) as f32;
///         }
///         Ok(out.len())
///     }
/// }
///
/// let mut ramp = Ramp(10);
/// let mut buf = [0.0; 3];
/// assert_eq!(ramp.read(4, &mut buf).unwrap(), 3);
/// assert_eq!(buf, [4.0, 5.0, 6.0]);
/// ```
pub trait Signal {
    /// Total number of samples in the signal.
    fn total_length(&self) -> usize;

    /// Copy samples `[offset, offset + out.len())` into `out`.
    ///
    /// Returns the number of samples actually produced; a short count is a
    /// failure the caller checks against the requested length.
    ///
    /// # Errors
    /// Any error of the backing store.
    fn read(&mut self, offset: usize, out: &mut [f32]) -> Result<usize>;
}

impl<S: Signal + ?Sized> Signal for &mut S {
    fn total_length(&self) -> usize {
        (**self).total_length()
    }

    fn read(&mut self, offset: usize, out: &mut [f32]) -> Result<usize> {
        (**self).read(offset, out)
    }
}

impl<S: Signal + ?Sized> Signal for Box<S> {
    fn total_length(&self) -> usize {
        (**self).total_length()
    }

    fn read(&mut self, offset: usize, out: &mut [f32]) -> Result<usize> {
        (**self).read(offset, out)
    }
}
