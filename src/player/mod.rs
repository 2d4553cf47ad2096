//! 剧情播放器

mod autoplay;
mod barrier;
mod definition;
mod interpreter;
mod loader;
#[allow(clippy::module_inception)]
mod player;
mod session;
mod voice;

pub use barrier::*;
pub use definition::*;
pub use interpreter::*;
pub use loader::*;
pub use player::*;
pub use session::{Session, seconds};
pub use voice::*;
