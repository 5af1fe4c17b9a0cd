use iced::widget::{column, scrollable, stack};
use iced::widget::scrollable::Viewport as ScrollViewport;
use iced::{event, keyboard, mouse, window, Element, Event, Length, Size, Subscription, Task, Theme};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use memoir_gallery::loading::{
    FsImageLoader, ImageLoader, Liveness, LoadState, ProgressiveLoad, StageRecord, StageUrls,
    TierCache,
};
use memoir_gallery::prefetch::{
    BatchReport, Engagement, LogHints, PrefetchCache, PrefetchScheduler, SchedulerConfig,
    StaticNetwork, TriggerState,
};
use memoir_gallery::state::{Library, Photo, SortOrder};
use memoir_gallery::viewer::{Key, PanelLimits, Point, ViewerController, ViewerInput, ViewerOutcome, Viewport};
use memoir_gallery::{download, logging, LoadError, Settings};

mod ui;

/// Height of the footer band that counts as the near-view anchor
const FOOTER_HEIGHT: f32 = 80.0;

/// The progressive load of the photo currently shown in the viewer
struct ActiveLoad {
    photo_id: u64,
    state: Option<LoadState>,
    liveness: Option<Liveness>,
}

impl ActiveLoad {
    fn new(photo_id: u64) -> Self {
        Self {
            photo_id,
            state: None,
            liveness: None,
        }
    }

    /// Attach a stage job, tearing down whichever job it replaces
    fn attach(&mut self, state: LoadState, liveness: Liveness) {
        self.teardown();
        self.state = Some(state);
        self.liveness = Some(liveness);
    }

    fn teardown(&self) {
        if let Some(liveness) = &self.liveness {
            liveness.teardown();
        }
    }
}

/// Main application state
struct Gallery {
    settings: Settings,
    library: Library,
    /// Photos in the current display order
    photos: Vec<Photo>,
    sort: SortOrder,
    viewer: ViewerController,
    load: Option<ActiveLoad>,
    loader: Arc<dyn ImageLoader>,
    tiers: Arc<TierCache>,
    scheduler: Arc<PrefetchScheduler>,
    /// Last pointer position, needed because presses carry no coordinates
    cursor: Point,
    /// Vertical scroll offset of the page
    scroll_offset: f32,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    SortBy(SortOrder),
    Open(usize),
    Previous,
    Next,
    Close,
    ToggleLike,
    Download,
    Downloaded(Result<PathBuf, String>),
    CursorMoved(Point),
    PointerDown,
    PointerUp,
    KeyPressed(Key),
    Resized(Size),
    Scrolled(ScrollViewport),
    TiersReady(u64, Result<StageUrls, LoadError>),
    Stage(u64, StageRecord),
    PrefetchDone(Option<BatchReport>),
}

impl Gallery {
    fn new(settings: Settings) -> (Self, Task<Message>) {
        let mut status = String::new();

        let library = match Library::open(&settings.gallery.data_path) {
            Ok(library) => library,
            Err(error) => {
                warn!(%error, path = %settings.gallery.data_path.display(), "Gallery unavailable");
                status = format!("Could not read {}: {}", settings.gallery.data_path.display(), error);
                Library::empty()
            }
        };

        let sort = SortOrder::default();
        let photos = library.sorted(sort);

        let cache_root = TierCache::default_cache_root()
            .unwrap_or_else(|| std::env::temp_dir().join("memoir-gallery").join("tiers"));
        let tiers = Arc::new(TierCache::new(&settings.gallery.image_root, cache_root));
        let loader: Arc<dyn ImageLoader> = Arc::new(FsImageLoader::new(&settings.gallery.image_root));

        // Prefetching a photo generates its tiers, so opening it later skips
        // the source decode and goes straight to the tiered URLs
        let candidates: Vec<String> = library
            .top(sort, settings.prefetch.max_images)
            .into_iter()
            .map(|photo| photo.filename)
            .collect();
        let cache = Arc::new(
            PrefetchCache::new(tiers.clone(), Arc::new(LogHints))
                .with_hint_timeout(settings.prefetch.hint_timeout()),
        );
        let scheduler = Arc::new(PrefetchScheduler::new(
            SchedulerConfig::from(&settings.prefetch),
            candidates,
            cache,
            Arc::new(StaticNetwork(settings.network.effective_type)),
        ));

        let viewport = Viewport {
            width: settings.viewer.window_width,
            height: settings.viewer.window_height,
        };
        let viewer = ViewerController::new(PanelLimits::from(&settings.viewer), viewport);

        if status.is_empty() {
            status = format!("{} photos", photos.len());
        }
        info!(photos = photos.len(), "Memoir Gallery initialized");

        let timer = {
            let scheduler = scheduler.clone();
            Task::perform(
                async move { scheduler.run_engagement_timer().await },
                Message::PrefetchDone,
            )
        };

        let gallery = Gallery {
            settings,
            library,
            photos,
            sort,
            viewer,
            load: None,
            loader,
            tiers,
            scheduler,
            cursor: Point::new(0.0, 0.0),
            scroll_offset: 0.0,
            status,
        };
        // A short page shows the footer anchor without any scrolling
        let initial = gallery.layout_engagement();

        (gallery, Task::batch([timer, initial]))
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SortBy(order) => {
                let current = self.current_photo().map(|photo| photo.id);
                self.sort = order;
                self.photos = self.library.sorted(order);

                // Keep the open photo selected at its new position
                if let Some(index) = current.and_then(|id| self.photos.iter().position(|p| p.id == id)) {
                    self.viewer.relist(index, self.photos.len());
                }
                Task::none()
            }
            Message::Open(index) => {
                if !self.viewer.open(index, self.photos.len()) {
                    return Task::none();
                }
                self.viewer.finish_opening();
                self.show(index)
            }
            Message::Next => match self.viewer.next() {
                Some(index) => self.show(index),
                None => Task::none(),
            },
            Message::Previous => match self.viewer.previous() {
                Some(index) => self.show(index),
                None => Task::none(),
            },
            Message::Close => {
                if self.viewer.close() == ViewerOutcome::Closed {
                    self.finish_close();
                }
                Task::none()
            }
            Message::ToggleLike => {
                let liked = self.viewer.toggle_like();
                debug!(liked, "Toggled like");
                Task::none()
            }
            Message::Download => {
                let Some(dest_dir) = download::default_download_dir() else {
                    self.status = "No download folder available".to_string();
                    return Task::none();
                };
                let Some(photo) = self.current_photo() else {
                    return Task::none();
                };
                let source = self.tiers.source_path(&photo.filename);
                let title = photo.title.clone();
                self.status = format!("Downloading {}…", title);
                Task::perform(
                    async move {
                        download::save_copy(&source, &dest_dir, &title)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::Downloaded,
                )
            }
            Message::Downloaded(result) => {
                self.status = match result {
                    Ok(path) => format!("Saved to {}", path.display()),
                    Err(error) => {
                        warn!(%error, "Download failed");
                        format!("Download failed: {}", error)
                    }
                };
                Task::none()
            }
            Message::CursorMoved(position) => {
                self.cursor = position;
                self.dispatch(ViewerInput::PointerMove(position))
            }
            Message::PointerDown => self.dispatch(ViewerInput::PointerDown(self.cursor)),
            Message::PointerUp => self.dispatch(ViewerInput::PointerUp),
            Message::KeyPressed(key) => self.dispatch(ViewerInput::Key(key)),
            Message::Resized(size) => {
                let moved = self.dispatch(ViewerInput::Resize(Viewport {
                    width: size.width,
                    height: size.height,
                }));
                Task::batch([moved, self.layout_engagement()])
            }
            Message::Scrolled(viewport) => self.on_scroll(viewport),
            Message::TiersReady(photo_id, result) => {
                let Some(photo) = self.current_photo().filter(|photo| photo.id == photo_id) else {
                    return Task::none();
                };
                let urls = match result {
                    Ok(urls) => urls,
                    Err(error) => {
                        warn!(%error, photo_id, "Falling back to the original image");
                        StageUrls::direct(self.tiers.source_path(&photo.filename).to_string_lossy())
                    }
                };
                self.start_load(photo_id, urls)
            }
            Message::Stage(photo_id, record) => {
                if let Some(load) = self.load.as_mut().filter(|load| load.photo_id == photo_id) {
                    if let Some(state) = load.state.as_mut() {
                        state.apply(record);
                    }
                }
                Task::none()
            }
            Message::PrefetchDone(report) => {
                if let Some(report) = report {
                    self.status = format!(
                        "{} photos · prefetched {} of {}",
                        self.photos.len(),
                        report.completed,
                        report.requested
                    );
                }
                Task::none()
            }
        }
    }

    /// Feed an input to the viewer and act on what it reports
    fn dispatch(&mut self, input: ViewerInput) -> Task<Message> {
        match self.viewer.handle(input) {
            ViewerOutcome::Navigated(index) => self.show(index),
            ViewerOutcome::Closed => {
                self.finish_close();
                Task::none()
            }
            _ => Task::none(),
        }
    }

    fn finish_close(&mut self) {
        self.viewer.finish_closing();
        if let Some(load) = self.load.take() {
            load.teardown();
        }
    }

    /// Switch the viewer to the photo at `index`, preparing its tiers first
    fn show(&mut self, index: usize) -> Task<Message> {
        let Some(photo) = self.photos.get(index) else {
            return Task::none();
        };
        if let Some(previous) = self.load.take() {
            previous.teardown();
        }

        let photo_id = photo.id;
        self.load = Some(ActiveLoad::new(photo_id));

        let tiers = self.tiers.clone();
        let reference = photo.filename.clone();
        Task::perform(
            async move { tiers.ensure_tiers(reference).await },
            move |result| Message::TiersReady(photo_id, result),
        )
    }

    fn start_load(&mut self, photo_id: u64, urls: StageUrls) -> Task<Message> {
        let Some(load) = self.load.as_mut().filter(|load| load.photo_id == photo_id) else {
            return Task::none();
        };

        let progressive = self.settings.loading.progressive && urls.cdn_active;
        let state = LoadState::new(&urls.placeholder);

        let job = ProgressiveLoad::new(urls, self.loader.clone())
            .progressive(progressive)
            .dwell(self.settings.loading.dwell());
        load.attach(state, job.liveness());

        Task::run(job.into_stream(), move |record| Message::Stage(photo_id, record))
    }

    /// Turn scroll position into engagement signals for the prefetch scheduler
    fn on_scroll(&mut self, viewport: ScrollViewport) -> Task<Message> {
        let offset = viewport.absolute_offset().y;
        self.scroll_offset = offset;

        let content = viewport.content_bounds().height;
        self.engage([
            Engagement::Scroll { offset },
            near_view(content, offset, viewport.bounds().height),
        ])
    }

    /// Report where the footer anchor sits given the estimated page layout.
    /// Runs at startup and on resize, when no scroll event has measured it.
    fn layout_engagement(&self) -> Task<Message> {
        let window = self.viewer.viewport();
        let content = ui::grid::content_height(self.photos.len(), window.width, FOOTER_HEIGHT);
        self.engage([near_view(content, self.scroll_offset, window.height)])
    }

    /// Run the prefetch batch for the first signal that qualifies
    fn engage<const N: usize>(&self, signals: [Engagement; N]) -> Task<Message> {
        if self.scheduler.state() != TriggerState::Armed {
            return Task::none();
        }

        match signals.into_iter().find(|signal| self.scheduler.qualifies(signal)) {
            Some(signal) => {
                let scheduler = self.scheduler.clone();
                Task::perform(
                    async move { scheduler.on_engagement(signal).await },
                    Message::PrefetchDone,
                )
            }
            None => Task::none(),
        }
    }

    fn current_photo(&self) -> Option<&Photo> {
        if !self.viewer.is_visible() {
            return None;
        }
        self.photos.get(self.viewer.current_index())
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let viewing = self.viewer.is_visible();

        let content = column![
            ui::grid::toolbar(self.sort, &self.status),
            ui::grid::photo_grid(&self.photos, &self.settings.gallery.image_root, !viewing),
            ui::grid::footer(FOOTER_HEIGHT),
        ]
        .spacing(ui::grid::SECTION_SPACING)
        .padding(ui::grid::PAGE_PADDING);

        let page = scrollable(content)
            .on_scroll(Message::Scrolled)
            .width(Length::Fill)
            .height(Length::Fill);

        match self.current_photo() {
            Some(photo) => {
                let state = self.load.as_ref().and_then(|load| load.state.as_ref());
                stack![
                    page,
                    ui::panel::backdrop(),
                    ui::panel::floating_viewer(photo, &self.viewer, state, self.photos.len()),
                ]
                .into()
            }
            None => page.into(),
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        event::listen_with(|event, _status, _window| match event {
            Event::Mouse(mouse::Event::CursorMoved { position }) => {
                Some(Message::CursorMoved(Point::new(position.x, position.y)))
            }
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => Some(Message::PointerDown),
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => Some(Message::PointerUp),
            Event::Keyboard(keyboard::Event::KeyPressed { key, .. }) => viewer_key(&key).map(Message::KeyPressed),
            Event::Window(window::Event::Resized(size)) => Some(Message::Resized(size)),
            _ => None,
        })
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Near-view signal for the footer anchor at the bottom of the page
fn near_view(content_height: f32, offset: f32, visible_height: f32) -> Engagement {
    Engagement::NearView {
        anchor_top: (content_height - FOOTER_HEIGHT).max(0.0),
        anchor_bottom: content_height,
        viewport_top: offset,
        viewport_bottom: offset + visible_height,
    }
}

/// Keys the viewer reacts to; everything else is dropped before dispatch
fn viewer_key(key: &keyboard::Key) -> Option<Key> {
    use keyboard::key::Named;

    match key {
        keyboard::Key::Named(Named::ArrowLeft) => Some(Key::ArrowLeft),
        keyboard::Key::Named(Named::ArrowRight) => Some(Key::ArrowRight),
        keyboard::Key::Named(Named::Escape) => Some(Key::Escape),
        _ => None,
    }
}

fn main() -> iced::Result {
    let (settings, config_error) = match Settings::load() {
        Ok(settings) => (settings, None),
        Err(error) => (Settings::default(), Some(error)),
    };
    logging::init_logging(&settings.log_level);
    if let Some(error) = config_error {
        warn!(%error, "Using default settings");
    }

    let window = Size::new(settings.viewer.window_width, settings.viewer.window_height);

    iced::application("Memoir Gallery", Gallery::update, Gallery::view)
        .subscription(Gallery::subscription)
        .theme(Gallery::theme)
        .window_size(window)
        .centered()
        .run_with(move || Gallery::new(settings.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_tears_down_replaced_job() {
        let mut load = ActiveLoad::new(7);
        let first = Liveness::new();
        load.attach(LoadState::new("p.jpg"), first.clone());

        let second = Liveness::new();
        load.attach(LoadState::new("p.jpg"), second.clone());
        assert!(!first.is_alive());
        assert!(second.is_alive());

        load.teardown();
        assert!(!second.is_alive());
    }

    #[test]
    fn test_short_page_footer_is_near_view() {
        let content = ui::grid::content_height(3, 1280.0, FOOTER_HEIGHT);
        match near_view(content, 0.0, 800.0) {
            Engagement::NearView {
                anchor_top,
                viewport_bottom,
                ..
            } => assert!(anchor_top <= viewport_bottom),
            other => panic!("unexpected signal {:?}", other),
        }
    }
}
