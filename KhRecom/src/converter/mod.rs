//! Format conversion utilities
//!
//! - TIM2 (decoded) → PNG - Texture export

mod texture_png;

pub use texture_png::{save_texture_png, texture_to_png_bytes, texture_to_rgba8, texture_to_rgba32f};
