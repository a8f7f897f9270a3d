mod container;
mod stream;
mod video;

pub use container::Container;
pub use stream::{MediaKind, StreamPair, StreamVariant};
pub use video::VideoInfo;
