//! Masking engine for Custodia.
//!
//! Maps a raw value and a [`MaskPattern`](custodia_types::MaskPattern) to a
//! masked rendering. Every transform is pure: no clock, no randomness, and
//! never reversible.

pub mod engine;

pub use engine::{mask_str, mask_value, DEFAULT_FULL_WIDTH};
