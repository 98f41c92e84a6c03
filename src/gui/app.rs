use iced::widget::image::Handle;
use iced::widget::{Image, button, column, container, row, text};
use iced::{Alignment::Center, Element, Length, Subscription, Task};
use rfd::AsyncFileDialog;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;
use tracing::{error, warn};

use super::Message;
use crate::config::Settings;
use crate::orchestrator::{ChannelSink, DisplayUpdate, PipelineOrchestrator};
use crate::watcher::{DetectorLoader, SourceWatcher, TomlDetectorLoader, WatcherGuard};

/// How often the foreground loop drains results produced elsewhere.
const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

pub struct RegionViewerApp {
    orchestrator: Arc<PipelineOrchestrator>,
    updates: Receiver<DisplayUpdate>,
    _watcher: Option<WatcherGuard>,
    frame: Option<Handle>,
    status: String,
}

impl RegionViewerApp {
    pub fn new(settings: Settings) -> (Self, Task<Message>) {
        let (sender, updates) = mpsc::channel();
        let loader = Arc::new(TomlDetectorLoader::new(settings.source_path()));

        let detector = match loader.load() {
            Ok(detector) => detector,
            Err(e) => {
                warn!("{e}; starting with the default detector");
                Arc::new(crate::detection::ContourRegionDetector::default())
            }
        };

        let orchestrator = Arc::new(PipelineOrchestrator::new(
            detector,
            Arc::new(ChannelSink::new(sender)),
            settings.output_dir.clone(),
        ));

        let watcher = SourceWatcher::new(settings.source_suffix(), loader, orchestrator.clone())
            .spawn(&settings.watch_dir, settings.debounce)
            .inspect_err(|e| error!("live reload disabled: {e}"))
            .ok();

        let app = Self {
            orchestrator,
            updates,
            _watcher: watcher,
            frame: None,
            status: "Load an image to start".to_string(),
        };

        let task = match settings.initial_image {
            Some(path) => Task::done(Message::ImagePicked(Some(path))),
            None => Task::none(),
        };
        (app, task)
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::LoadImage => Task::perform(
                AsyncFileDialog::new()
                    .set_title("Load Image")
                    .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"])
                    .pick_file(),
                |handle| Message::ImagePicked(handle.map(|file| file.path().to_path_buf())),
            ),
            Message::ImagePicked(Some(path)) => {
                // Failures reach the status line through the sink.
                let _ = self.orchestrator.load_image(&path);
                self.drain_updates();
                Task::none()
            }
            Message::ImagePicked(None) => Task::none(),
            Message::Tick => {
                self.drain_updates();
                Task::none()
            }
        }
    }

    /// Apply every queued update on the foreground thread.
    fn drain_updates(&mut self) {
        loop {
            match self.updates.try_recv() {
                Ok(DisplayUpdate::Frame(result)) => {
                    let (width, height) = result.dimensions();
                    self.frame = Some(Handle::from_rgba(width, height, result.to_rgba8().into_raw()));
                    self.status = format!("{} region(s) detected", result.regions().len());
                }
                Ok(DisplayUpdate::Failure(message)) => {
                    self.status = format!("No update: {message}");
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let controls = row![
            button("Load Image").on_press(Message::LoadImage),
            text(self.status.as_str()),
        ]
        .spacing(20)
        .align_y(Center);

        let body: Element<'_, Message> = match &self.frame {
            Some(handle) => Image::<Handle>::new(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text("No image loaded"))
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        column![controls, body].spacing(20).padding(20).into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(DRAIN_INTERVAL).map(|_| Message::Tick)
    }

    pub fn title(&self) -> String {
        "Live Region Viewer".to_string()
    }
}
