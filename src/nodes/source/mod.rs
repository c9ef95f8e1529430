mod blank;
mod memory;
mod test_audio;

pub use blank::*;
pub use memory::*;
pub use test_audio::*;
