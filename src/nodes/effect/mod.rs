mod binding;
mod mix;
mod sample_rate;
mod shuffle;
mod splice;
mod split;
mod trim;

pub use binding::{bind_channels, SourceBinding};
pub use mix::*;
pub use sample_rate::*;
pub use shuffle::*;
pub use splice::*;
pub use split::*;
pub use trim::*;
