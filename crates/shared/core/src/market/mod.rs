mod bar;
mod tick;

pub use bar::Bar;
pub use tick::{DEPTH_LEVELS, Tick};
