//! Test-only support code: a deterministic in-memory [`crate::driver::Driver`].
//! Not part of the public API — a real driver backend is out of scope for
//! this crate.

pub(crate) mod mock_driver;
