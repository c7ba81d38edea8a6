pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Init, Open, Share, Version};
