mod app;
mod message;

pub use app::RegionViewerApp;
pub use message::Message;
