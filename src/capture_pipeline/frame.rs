//! Frame buffer types
//!
//! A [`RawFrame`] borrows the SDK's buffer; an [`Image`] owns a copy of it.

pub mod types;

pub use types::{Image, RawFrame};
