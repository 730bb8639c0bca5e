//! Utility modules

pub mod cursor;

pub use cursor::ByteCursor;
