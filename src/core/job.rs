//! Fixed-layout job record shared by both pool policies.
//!
//! A [`Job`] is one cache line: a function pointer, the handle of the job it
//! unblocks on completion, a pending-dependency counter and an inline payload
//! buffer. Records are copied between the job table and worker stacks, and
//! keeping each one on its own line stops workers from false-sharing.
//!
//! Payloads go through [`JobPayload`], which encodes small plain values into
//! the inline buffer without touching the heap:
//!
//! ```
//! use slot_scheduler::core::Job;
//!
//! fn scale(job: &mut Job) {
//!     let (value, factor): (u32, u32) = job.data();
//!     job.set_data(value * factor);
//! }
//!
//! let mut job = Job::with_data(scale, (21_u32, 2_u32));
//! assert!(job.run());
//! assert_eq!(job.data::<u32>(), 42);
//! ```

use std::array;
use std::fmt;
use std::mem::{align_of, size_of};

use crate::table::Handle;

/// Size in bytes of one [`Job`] record. Must match the `align` of `Job`.
pub const CACHE_LINE_SIZE: usize = 64;

/// Function run by a worker, given the job record it was submitted with.
pub type JobFn = fn(&mut Job);

/// Inline payload capacity left over once the header fields are laid out.
pub const JOB_DATA_LEN: usize =
    CACHE_LINE_SIZE - size_of::<Option<JobFn>>() - size_of::<Handle>() - size_of::<i32>();

/// One schedulable unit of work.
///
/// The payload holds plain values only; references and pointers cannot be
/// encoded without `unsafe`, which the crate denies. State shared between the
/// caller and job bodies therefore lives in `'static` items, with the payload
/// carrying an index or key into it:
///
/// ```
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use slot_scheduler::core::Job;
///
/// static TOTALS: [AtomicU64; 4] = [const { AtomicU64::new(0) }; 4];
///
/// fn accumulate(job: &mut Job) {
///     let (bucket, amount): (u8, u64) = job.data();
///     TOTALS[usize::from(bucket)].fetch_add(amount, Ordering::Relaxed);
/// }
///
/// Job::with_data(accumulate, (2_u8, 40_u64)).run();
/// assert_eq!(TOTALS[2].load(Ordering::Relaxed), 40);
/// ```
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct Job {
    pub(crate) function: Option<JobFn>,
    pub(crate) parent: Handle,
    pub(crate) pending_dependencies: i32,
    data: [u8; JOB_DATA_LEN],
}

const _: () = assert!(size_of::<Job>() == CACHE_LINE_SIZE);
const _: () = assert!(align_of::<Job>() == CACHE_LINE_SIZE);

impl Job {
    /// Job running `function` with an all-zero payload and no parent.
    #[must_use]
    pub const fn new(function: JobFn) -> Self {
        Self {
            function: Some(function),
            parent: Handle::INVALID,
            pending_dependencies: 0,
            data: [0; JOB_DATA_LEN],
        }
    }

    /// Job running `function` with `data` encoded into its payload buffer.
    ///
    /// Payloads larger than [`JOB_DATA_LEN`] are rejected at compile time.
    #[must_use]
    pub fn with_data<T: JobPayload>(function: JobFn, data: T) -> Self {
        let mut job = Self::new(function);
        job.set_data(data);
        job
    }

    /// Make this job a prerequisite of `parent`.
    ///
    /// The parent is not released before this job has finished.
    #[must_use]
    pub const fn with_parent(mut self, parent: Handle) -> Self {
        self.parent = parent;
        self
    }

    /// Decode the payload as `T`.
    #[must_use]
    pub fn data<T: JobPayload>(&self) -> T {
        const { assert!(T::SIZE <= JOB_DATA_LEN, "job payload does not fit in a cache line") };
        T::decode(&self.data[..T::SIZE])
    }

    /// Overwrite the payload with `value`; trailing bytes are zeroed.
    pub fn set_data<T: JobPayload>(&mut self, value: T) {
        const { assert!(T::SIZE <= JOB_DATA_LEN, "job payload does not fit in a cache line") };
        self.data = [0; JOB_DATA_LEN];
        value.encode(&mut self.data[..T::SIZE]);
    }

    /// Raw payload bytes.
    #[must_use]
    pub const fn raw_data(&self) -> &[u8; JOB_DATA_LEN] {
        &self.data
    }

    /// Function this job runs, `None` for a no-op job.
    #[must_use]
    pub const fn function(&self) -> Option<JobFn> {
        self.function
    }

    /// Handle of the job waiting on this one, possibly [`Handle::INVALID`].
    #[must_use]
    pub const fn parent(&self) -> Handle {
        self.parent
    }

    /// Prerequisites not yet finished.
    #[must_use]
    pub const fn pending_dependencies(&self) -> i32 {
        self.pending_dependencies
    }

    /// Invoke the job function on this record. Returns `false` for a job
    /// without a function, which completes immediately.
    pub fn run(&mut self) -> bool {
        match self.function {
            Some(function) => {
                function(self);
                true
            }
            None => false,
        }
    }
}

impl Default for Job {
    fn default() -> Self {
        Self {
            function: None,
            parent: Handle::INVALID,
            pending_dependencies: 0,
            data: [0; JOB_DATA_LEN],
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("has_function", &self.function.is_some())
            .field("parent", &self.parent)
            .field("pending_dependencies", &self.pending_dependencies)
            .finish_non_exhaustive()
    }
}

/// Plain value that can be stored inline in a [`Job`] payload.
///
/// Encodings are fixed-size and little-endian, so a payload written on one
/// worker decodes identically on any other.
pub trait JobPayload: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Write `self` into `out`, which is exactly `SIZE` bytes long.
    fn encode(&self, out: &mut [u8]);

    /// Read a value back from `bytes`, which is exactly `SIZE` bytes long.
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_payload_for_numbers {
    ($($ty:ty),* $(,)?) => {
        $(
            impl JobPayload for $ty {
                const SIZE: usize = size_of::<$ty>();

                fn encode(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0_u8; size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_payload_for_numbers!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

impl JobPayload for () {
    const SIZE: usize = 0;

    fn encode(&self, _out: &mut [u8]) {}

    fn decode(_bytes: &[u8]) -> Self {}
}

impl JobPayload for bool {
    const SIZE: usize = 1;

    fn encode(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

impl JobPayload for Handle {
    const SIZE: usize = 8;

    fn encode(&self, out: &mut [u8]) {
        self.index().encode(&mut out[..4]);
        self.generation().encode(&mut out[4..]);
    }

    fn decode(bytes: &[u8]) -> Self {
        Self::from_raw_parts(u32::decode(&bytes[..4]), u32::decode(&bytes[4..]))
    }
}

impl<T: JobPayload, const M: usize> JobPayload for [T; M] {
    const SIZE: usize = T::SIZE * M;

    fn encode(&self, out: &mut [u8]) {
        for (item, chunk) in self.iter().zip(out.chunks_exact_mut(T::SIZE.max(1))) {
            item.encode(&mut chunk[..T::SIZE]);
        }
    }

    fn decode(bytes: &[u8]) -> Self {
        array::from_fn(|i| T::decode(&bytes[i * T::SIZE..(i + 1) * T::SIZE]))
    }
}

impl<A: JobPayload, B: JobPayload> JobPayload for (A, B) {
    const SIZE: usize = A::SIZE + B::SIZE;

    fn encode(&self, out: &mut [u8]) {
        let (a, b) = out.split_at_mut(A::SIZE);
        self.0.encode(a);
        self.1.encode(b);
    }

    fn decode(bytes: &[u8]) -> Self {
        let (a, b) = bytes.split_at(A::SIZE);
        (A::decode(a), B::decode(b))
    }
}

impl<A: JobPayload, B: JobPayload, C: JobPayload> JobPayload for (A, B, C) {
    const SIZE: usize = A::SIZE + B::SIZE + C::SIZE;

    fn encode(&self, out: &mut [u8]) {
        let (a, rest) = out.split_at_mut(A::SIZE);
        let (b, c) = rest.split_at_mut(B::SIZE);
        self.0.encode(a);
        self.1.encode(b);
        self.2.encode(c);
    }

    fn decode(bytes: &[u8]) -> Self {
        let (a, rest) = bytes.split_at(A::SIZE);
        let (b, c) = rest.split_at(B::SIZE);
        (A::decode(a), B::decode(b), C::decode(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump(job: &mut Job) {
        let value: u64 = job.data();
        job.set_data(value + 1);
    }

    #[test]
    fn test_job_is_one_cache_line() {
        assert_eq!(size_of::<Job>(), CACHE_LINE_SIZE);
        assert_eq!(align_of::<Job>(), CACHE_LINE_SIZE);
        assert_eq!(JOB_DATA_LEN, 44);
    }

    #[test]
    fn test_default_job() {
        let mut job = Job::default();
        assert!(job.function().is_none());
        assert!(!job.parent().is_valid());
        assert_eq!(job.pending_dependencies(), 0);
        assert!(job.raw_data().iter().all(|b| *b == 0));
        assert!(!job.run());
    }

    #[test]
    fn test_run_mutates_payload() {
        let mut job = Job::with_data(bump, 41_u64);
        assert!(job.run());
        assert_eq!(job.data::<u64>(), 42);
    }

    #[test]
    fn test_with_parent() {
        let parent = Handle::from_raw_parts(4, 2);
        let job = Job::new(bump).with_parent(parent);
        assert_eq!(job.parent(), parent);
    }

    #[test]
    fn test_mixed_payload() {
        let parent = Handle::from_raw_parts(9, 3);
        let job = Job::with_data(bump, (parent, -7_i32, 2.5_f64));
        let (h, n, x): (Handle, i32, f64) = job.data();
        assert_eq!(h, parent);
        assert_eq!(n, -7);
        assert!((x - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_array_payload() {
        let job = Job::with_data(bump, [1_u32, 2, 3, 4, 5]);
        assert_eq!(job.data::<[u32; 5]>(), [1, 2, 3, 4, 5]);
        assert_eq!(&job.raw_data()[..4], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_set_data_clears_previous_bytes() {
        let mut job = Job::with_data(bump, u64::MAX);
        job.set_data(true);
        assert!(job.data::<bool>());
        assert!(job.raw_data()[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_full_buffer_payload() {
        let bytes: [u8; JOB_DATA_LEN] = array::from_fn(|i| u8::try_from(i).unwrap());
        let job = Job::with_data(bump, bytes);
        assert_eq!(job.data::<[u8; JOB_DATA_LEN]>(), bytes);
    }
}
