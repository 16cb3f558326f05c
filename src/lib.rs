#![warn(
    elided_lifetimes_in_paths,
    missing_debug_implementations,
    noop_method_call,
    single_use_lifetimes,
    unused_lifetimes,
    unused_qualifications
)]

//! ASCOM-Alpaca bridge for Celestron NexStar telescope mounts.
//!
//! Alpaca REST requests are validated against the mount's capability word
//! and state, translated to the NexStar hand-controller serial protocol,
//! and answered inside the uniform JSON envelope. A deterministic wire
//! simulator backs the test suite and the `--conform` mode.

pub mod api;
pub mod astro;
pub mod celestron;
mod errors;
pub mod server;

pub use errors::{ASCOMError, ASCOMErrorCode, ASCOMResult};
pub use server::{Server, TelescopeResource};
