pub mod disasm;
pub mod image;
pub mod op;
pub mod slot;

pub use image::{ImageBuilder, ImageLayout, LoadError};
pub use slot::Slot;
