//! Root crate facade for bufmirror.

pub use bufmirror_core::*;
