//! texarray - texture array import pipeline
//!
//! Resizes and recompresses stacks of equally sized texture layers, keeping
//! block-compressed data out of the resampler.

pub mod settings;
pub mod textures;
