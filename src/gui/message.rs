use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Message {
    LoadImage,
    ImagePicked(Option<PathBuf>),
    /// Periodic wake-up that drains pending display updates.
    Tick,
}
