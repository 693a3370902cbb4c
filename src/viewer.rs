//! Borderless viewer window: media surface, playback engine and the window
//! geometry derived from the media's aspect ratio.

use std::path::Path;
use std::time::Duration;

use eframe::egui;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::alert::AlertWindow;
use crate::config::Config;
use crate::engine::{EngineError, PlaybackEngine, PlaybackObserver};
use crate::geometry::{AspectRatio, WindowGeometry};
use crate::media::{MediaError, MetadataReader};
use crate::session::{format_elapsed, MediaStatus, PlaybackSession, PlaybackState};
use crate::widgets::{ControlWidgets, PlayIcon};

/// How often position updates are polled while playing
const POSITION_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum OpenError {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub struct Viewer {
    engine: Box<dyn PlaybackEngine>,
    metadata: Box<dyn MetadataReader>,
    session: Option<PlaybackSession>,
    aspect: AspectRatio,
    geometry: WindowGeometry,
    /// Dominant-side size applied when media is opened
    base_size: u32,
    widgets: ControlWidgets,
    /// Total length in whole seconds, recorded from the first duration report
    total_length_secs: Option<u64>,
    /// Geometry not yet sent to the window
    pending_geometry: Option<WindowGeometry>,
    /// Window-local pointer position at the start of a drag
    drag_anchor: Option<egui::Pos2>,
    alert: AlertWindow,
    on_close: Box<dyn FnMut()>,
    open: bool,
    texture: Option<egui::TextureHandle>,
    background: egui::Color32,
    viewport_id: egui::ViewportId,
}

impl Viewer {
    pub fn new(
        engine: Box<dyn PlaybackEngine>,
        metadata: Box<dyn MetadataReader>,
        config: &Config,
        on_close: Box<dyn FnMut()>,
    ) -> Self {
        let layout = config.viewer;
        let [r, g, b] = config.background_rgb;
        Self {
            engine,
            metadata,
            session: None,
            aspect: AspectRatio::default(),
            geometry: WindowGeometry::new(layout.x, layout.y, layout.width, layout.height),
            base_size: config.base_size,
            widgets: ControlWidgets::default(),
            total_length_secs: None,
            pending_geometry: None,
            drag_anchor: None,
            alert: AlertWindow::new(config.codec_install_url.clone()),
            on_close,
            open: true,
            texture: None,
            background: egui::Color32::from_rgb(r, g, b),
            viewport_id: egui::ViewportId::from_hash_of("pvd-viewer"),
        }
    }

    pub fn widgets(&self) -> &ControlWidgets {
        &self.widgets
    }

    #[cfg(test)]
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    #[cfg(test)]
    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    #[cfg(test)]
    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    #[cfg(test)]
    pub fn base_size(&self) -> u32 {
        self.base_size
    }

    #[cfg(test)]
    pub fn total_length_secs(&self) -> Option<u64> {
        self.total_length_secs
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[cfg(test)]
    pub fn alert_open(&self) -> bool {
        self.alert.is_open()
    }

    /// Open a media file: size the window to it and load it paused.
    ///
    /// On error nothing changes and the previous media stays loaded.
    pub fn set_media(&mut self, path: &Path) -> Result<(), OpenError> {
        let (width, height) = self.metadata.dimensions(path)?;
        let aspect = AspectRatio::from_dimensions(width, height).ok_or_else(|| {
            MediaError::ZeroDimension {
                path: path.to_path_buf(),
                width,
                height,
            }
        })?;

        self.engine.load(path)?;

        self.aspect = aspect;
        self.resize_window(self.base_size);
        self.widgets = ControlWidgets::default();
        self.total_length_secs = None;
        self.texture = None;
        self.session = Some(PlaybackSession::new(path));
        self.open = true;

        info!(
            "Opened {} ({}x{}, ratio {:.3} {:?})",
            path.display(),
            width,
            height,
            aspect.ratio(),
            aspect.dominant_axis()
        );
        Ok(())
    }

    pub fn toggle_play(&mut self) {
        if self.session.is_none() {
            return;
        }

        if self.engine.state() == PlaybackState::Playing {
            debug!("Pause");
            self.engine.pause();
        } else if self.engine.media_status() == MediaStatus::Unsupported {
            warn!("Unsupported media type");
            self.alert_window();
        } else {
            debug!("Play");
            self.engine.play();
        }
        self.pump_engine();
    }

    /// Jump to a position from the seek slider
    pub fn seek_to(&mut self, position_ms: u64) {
        self.engine.seek_to(position_ms);
    }

    /// Resize so the dominant side is `size`, keeping the top-left corner
    pub fn resize_window(&mut self, size: u32) {
        self.geometry = self.geometry.resized(size, &self.aspect);
        self.pending_geometry = Some(self.geometry);
    }

    /// Resize and keep `size` as the base for later opens
    pub fn resize_from_slider(&mut self, size: u32) {
        self.resize_window(size);
        self.base_size = size;
    }

    /// Pointer went down at a window-local position
    pub fn begin_drag(&mut self, local: egui::Pos2) {
        self.drag_anchor = Some(local);
    }

    /// Pointer moved to a window-local position while held
    pub fn drag_to(&mut self, local: egui::Pos2) {
        if let Some(anchor) = self.drag_anchor {
            self.geometry = self.geometry.dragged((anchor.x, anchor.y), (local.x, local.y));
            self.pending_geometry = Some(self.geometry);
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    /// Close the viewer surface and release the media
    pub fn close_window(&mut self) {
        if !self.open {
            return;
        }
        match self.session.take() {
            Some(session) => info!(
                "Closing viewer, releasing {} ({:?} at {} of {})",
                session.media_path().display(),
                session.state,
                format_elapsed(session.position_ms),
                format_elapsed(session.duration_ms)
            ),
            None => info!("Closing viewer"),
        }
        self.open = false;
        self.engine.unload();
        self.texture = None;
    }

    pub fn alert_window(&mut self) {
        self.alert.open();
    }

    /// Drain engine events into the observer callbacks
    pub fn pump_engine(&mut self) {
        for event in self.engine.poll_events() {
            event.dispatch(self);
        }
    }

    fn update_texture(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.engine.take_frame() {
            let image = egui::ColorImage::from_rgba_unmultiplied(
                [frame.width as usize, frame.height as usize],
                &frame.pixels,
            );
            match self.texture {
                Some(ref mut texture) => texture.set(image, egui::TextureOptions::LINEAR),
                None => {
                    self.texture =
                        Some(ctx.load_texture("pvd-frame", image, egui::TextureOptions::LINEAR));
                }
            }
        }
    }

    fn handle_drag(&mut self, ctx: &egui::Context) {
        let (pressed, down, pos) = ctx.input(|i| {
            (
                i.pointer.button_pressed(egui::PointerButton::Primary),
                i.pointer.button_down(egui::PointerButton::Primary),
                i.pointer.interact_pos(),
            )
        });

        match (pressed, down, pos) {
            (true, _, Some(pos)) => self.begin_drag(pos),
            (false, true, Some(pos)) => self.drag_to(pos),
            (_, false, _) => self.end_drag(),
            _ => {}
        }

        if self.drag_anchor.is_some() {
            ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
        }
    }

    fn flush_geometry(&mut self, ctx: &egui::Context) {
        if let Some(geometry) = self.pending_geometry.take() {
            ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(geometry.position()));
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(geometry.size()));
        }
    }

    fn draw_surface(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.viewport().close_requested()) {
            info!("Viewer closed by the window manager");
            (self.on_close)();
            ctx.request_repaint();
            return;
        }

        self.update_texture(ctx);
        self.handle_drag(ctx);
        self.flush_geometry(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.background))
            .show(ctx, |ui| {
                let available = ui.max_rect();
                if let Some(ref texture) = self.texture {
                    let size = texture.size_vec2();
                    let scale = (available.width() / size.x).min(available.height() / size.y);
                    let rect = egui::Rect::from_center_size(available.center(), size * scale);
                    ui.painter().image(
                        texture.id(),
                        rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }
            });

        if self.engine.state() == PlaybackState::Playing {
            ctx.request_repaint_after(POSITION_POLL_INTERVAL);
        }
    }

    /// Render the viewer window and any open alert
    pub fn show(&mut self, ctx: &egui::Context) {
        self.pump_engine();

        if self.open {
            let builder = egui::ViewportBuilder::default()
                .with_title("PVD Viewer")
                .with_decorations(false)
                .with_position(self.geometry.position())
                .with_inner_size(self.geometry.size());

            ctx.show_viewport_immediate(self.viewport_id, builder, |ctx, _class| {
                self.draw_surface(ctx);
            });
        }

        self.alert.show(ctx);
    }
}

impl PlaybackObserver for Viewer {
    fn on_state_changed(&mut self, state: PlaybackState) {
        if let Some(ref mut session) = self.session {
            session.state = state;
        }
        self.widgets.play_icon = match state {
            PlaybackState::Playing => PlayIcon::Pause,
            PlaybackState::Stopped | PlaybackState::Paused => PlayIcon::Play,
        };
    }

    fn on_position_changed(&mut self, position_ms: u64) {
        // A zero duration means a still image: hold the frame.
        if self.engine.duration_ms() == 0 {
            self.engine.pause();
            return;
        }

        if let Some(ref mut session) = self.session {
            session.position_ms = position_ms;
        }
        self.widgets.seek_value = position_ms;
        self.widgets.timer_label = format_elapsed(position_ms);
    }

    fn on_duration_changed(&mut self, duration_ms: u64) {
        self.widgets.seek_range = (0, duration_ms);
        if let Some(ref mut session) = self.session {
            session.duration_ms = duration_ms;
        }
        if self.total_length_secs.is_none() {
            self.total_length_secs = Some(duration_ms / 1000);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineEvent, VideoFrame};
    use crate::geometry::DominantAxis;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::rc::Rc;

    #[derive(Default)]
    struct EngineLog {
        state: PlaybackState,
        status: MediaStatus,
        duration_ms: u64,
        loaded: Vec<PathBuf>,
        seeks: Vec<u64>,
        pauses: usize,
        unloads: usize,
        queued: Vec<EngineEvent>,
    }

    /// Engine double that applies transport calls immediately and reports
    /// state changes like the real one.
    struct FakeEngine(Rc<RefCell<EngineLog>>);

    impl FakeEngine {
        fn transition(&mut self, state: PlaybackState) {
            let mut log = self.0.borrow_mut();
            if log.state != state {
                log.state = state;
                log.queued.push(EngineEvent::StateChanged(state));
            }
        }
    }

    impl PlaybackEngine for FakeEngine {
        fn load(&mut self, path: &Path) -> Result<(), EngineError> {
            let mut log = self.0.borrow_mut();
            log.loaded.push(path.to_path_buf());
            log.state = PlaybackState::Stopped;
            log.status = MediaStatus::Loaded;
            Ok(())
        }
        fn play(&mut self) {
            self.transition(PlaybackState::Playing);
        }
        fn pause(&mut self) {
            self.0.borrow_mut().pauses += 1;
            self.transition(PlaybackState::Paused);
        }
        fn seek_to(&mut self, position_ms: u64) {
            self.0.borrow_mut().seeks.push(position_ms);
        }
        fn unload(&mut self) {
            let mut log = self.0.borrow_mut();
            log.unloads += 1;
            log.status = MediaStatus::NoMedia;
        }
        fn state(&self) -> PlaybackState {
            self.0.borrow().state
        }
        fn media_status(&self) -> MediaStatus {
            self.0.borrow().status
        }
        fn duration_ms(&self) -> u64 {
            self.0.borrow().duration_ms
        }
        fn poll_events(&mut self) -> Vec<EngineEvent> {
            std::mem::take(&mut self.0.borrow_mut().queued)
        }
        fn take_frame(&mut self) -> Option<VideoFrame> {
            None
        }
    }

    struct FakeMetadata(HashMap<PathBuf, (u32, u32)>);

    impl MetadataReader for FakeMetadata {
        fn dimensions(&self, path: &Path) -> Result<(u32, u32), MediaError> {
            self.0
                .get(path)
                .copied()
                .ok_or_else(|| MediaError::Unreadable {
                    path: path.to_path_buf(),
                    reason: "corrupt".to_string(),
                })
        }
    }

    struct Harness {
        viewer: Viewer,
        engine: Rc<RefCell<EngineLog>>,
        closes: Rc<Cell<usize>>,
    }

    fn harness() -> Harness {
        let engine = Rc::new(RefCell::new(EngineLog::default()));
        let closes = Rc::new(Cell::new(0));
        let metadata = FakeMetadata(HashMap::from([
            (PathBuf::from("video.mp4"), (1920, 1080)),
            (PathBuf::from("portrait.jpg"), (1080, 1920)),
            (PathBuf::from("square.png"), (600, 600)),
            (PathBuf::from("empty.png"), (0, 600)),
        ]));
        let counter = closes.clone();
        let viewer = Viewer::new(
            Box::new(FakeEngine(engine.clone())),
            Box::new(metadata),
            &Config::default(),
            Box::new(move || counter.set(counter.get() + 1)),
        );
        Harness {
            viewer,
            engine,
            closes,
        }
    }

    #[test]
    fn set_media_sizes_window_and_loads_paused() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();

        assert_eq!(h.viewer.aspect().dominant_axis(), DominantAxis::Width);
        assert_eq!(h.viewer.geometry(), WindowGeometry::new(0, 0, 700, 394));
        assert_eq!(h.viewer.widgets().timer_label, "0:00:00");
        assert_eq!(h.engine.borrow().loaded, vec![PathBuf::from("video.mp4")]);
        assert_eq!(h.engine.borrow().state, PlaybackState::Stopped);
        assert_eq!(h.viewer.session().unwrap().state, PlaybackState::Stopped);
    }

    #[test]
    fn portrait_media_uses_base_size_for_height() {
        let mut h = harness();
        h.viewer.set_media(Path::new("portrait.jpg")).unwrap();
        assert_eq!(h.viewer.geometry(), WindowGeometry::new(0, 0, 394, 700));
    }

    #[test]
    fn unreadable_metadata_rejects_the_open() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();

        let err = h.viewer.set_media(Path::new("broken.mkv")).unwrap_err();
        assert!(matches!(err, OpenError::Media(MediaError::Unreadable { .. })));
        assert!(matches!(
            h.viewer.set_media(Path::new("empty.png")).unwrap_err(),
            OpenError::Media(MediaError::ZeroDimension { .. })
        ));

        assert_eq!(
            h.viewer.session().unwrap().media_path(),
            Path::new("video.mp4")
        );
        assert_eq!(h.engine.borrow().loaded.len(), 1);
    }

    #[test]
    fn toggle_twice_goes_playing_then_paused() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();

        h.viewer.toggle_play();
        assert_eq!(h.viewer.session().unwrap().state, PlaybackState::Playing);
        assert_eq!(h.viewer.widgets().play_icon, PlayIcon::Pause);

        h.viewer.toggle_play();
        assert_eq!(h.viewer.session().unwrap().state, PlaybackState::Paused);
        assert_eq!(h.viewer.widgets().play_icon, PlayIcon::Play);
    }

    #[test]
    fn toggle_without_media_does_nothing() {
        let mut h = harness();
        h.viewer.toggle_play();
        assert_eq!(h.engine.borrow().state, PlaybackState::Stopped);
        assert!(!h.viewer.alert_open());
    }

    #[test]
    fn unsupported_media_opens_alert_and_keeps_state() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();
        h.engine.borrow_mut().status = MediaStatus::Unsupported;

        h.viewer.toggle_play();

        assert!(h.viewer.alert_open());
        assert_eq!(h.engine.borrow().state, PlaybackState::Stopped);
        assert_eq!(h.viewer.session().unwrap().state, PlaybackState::Stopped);
        assert_eq!(h.viewer.widgets().play_icon, PlayIcon::Play);
    }

    #[test]
    fn playing_unsupported_media_still_pauses() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();
        h.viewer.toggle_play();
        h.engine.borrow_mut().status = MediaStatus::Unsupported;

        h.viewer.toggle_play();
        assert_eq!(h.engine.borrow().state, PlaybackState::Paused);
        assert!(!h.viewer.alert_open());
    }

    #[test]
    fn still_image_position_pauses_without_updating_widgets() {
        let mut h = harness();
        h.viewer.set_media(Path::new("square.png")).unwrap();
        h.viewer.toggle_play();

        h.viewer.on_position_changed(40);

        assert_eq!(h.engine.borrow().pauses, 1);
        assert_eq!(h.viewer.widgets().seek_value, 0);
        assert_eq!(h.viewer.widgets().timer_label, "0:00:00");
    }

    #[test]
    fn video_position_updates_slider_and_label() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();
        h.engine.borrow_mut().duration_ms = 7_200_000;

        h.viewer.on_position_changed(3_661_500);

        assert_eq!(h.engine.borrow().pauses, 0);
        assert_eq!(h.viewer.widgets().seek_value, 3_661_500);
        assert_eq!(h.viewer.widgets().timer_label, "1:01:01");
        assert_eq!(h.viewer.session().unwrap().position_ms, 3_661_500);
    }

    #[test]
    fn duration_sets_range_every_time_but_length_once() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();

        h.viewer.on_duration_changed(90_500);
        h.viewer.on_duration_changed(120_000);

        assert_eq!(h.viewer.widgets().seek_range, (0, 120_000));
        assert_eq!(h.viewer.total_length_secs(), Some(90));

        // A new file starts a fresh record.
        h.viewer.set_media(Path::new("portrait.jpg")).unwrap();
        assert_eq!(h.viewer.total_length_secs(), None);
        h.viewer.on_duration_changed(0);
        assert_eq!(h.viewer.total_length_secs(), Some(0));
    }

    #[test]
    fn seek_is_forwarded_unclamped() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();
        h.viewer.seek_to(999_999_999);
        assert_eq!(h.engine.borrow().seeks, vec![999_999_999]);
    }

    #[test]
    fn slider_resize_becomes_new_base_size() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();

        h.viewer.resize_from_slider(900);
        assert_eq!(h.viewer.geometry(), WindowGeometry::new(0, 0, 900, 506));
        assert_eq!(h.viewer.base_size(), 900);

        h.viewer.set_media(Path::new("square.png")).unwrap();
        assert_eq!(h.viewer.geometry(), WindowGeometry::new(0, 0, 900, 900));
    }

    #[test]
    fn resize_keeps_dragged_position() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();

        h.viewer.begin_drag(egui::pos2(10.0, 10.0));
        h.viewer.drag_to(egui::pos2(60.0, 35.0));
        h.viewer.end_drag();
        h.viewer.drag_to(egui::pos2(500.0, 500.0));

        h.viewer.resize_window(350);
        assert_eq!(h.viewer.geometry(), WindowGeometry::new(50, 25, 350, 197));
    }

    #[test]
    fn engine_events_reach_the_observer() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();
        h.engine.borrow_mut().duration_ms = 10_000;
        h.engine.borrow_mut().queued.extend([
            EngineEvent::DurationChanged(10_000),
            EngineEvent::StateChanged(PlaybackState::Playing),
            EngineEvent::PositionChanged(2_000),
        ]);

        h.viewer.pump_engine();

        let widgets = h.viewer.widgets();
        assert_eq!(widgets.seek_range, (0, 10_000));
        assert_eq!(widgets.play_icon, PlayIcon::Pause);
        assert_eq!(widgets.timer_label, "0:00:02");
    }

    #[test]
    fn window_manager_close_calls_back_once() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();

        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| h.viewer.show(ctx));
        assert_eq!(h.closes.get(), 0);

        let mut input = egui::RawInput::default();
        input
            .viewports
            .entry(egui::ViewportId::ROOT)
            .or_default()
            .events
            .push(egui::ViewportEvent::Close);
        let _ = ctx.run(input, |ctx| h.viewer.show(ctx));

        assert_eq!(h.closes.get(), 1);
    }

    #[test]
    fn close_window_releases_media_without_calling_back() {
        let mut h = harness();
        h.viewer.set_media(Path::new("video.mp4")).unwrap();

        h.viewer.close_window();
        h.viewer.close_window();

        assert!(!h.viewer.is_open());
        assert!(h.viewer.session().is_none());
        assert_eq!(h.engine.borrow().unloads, 1);
        assert_eq!(h.closes.get(), 0);
    }
}
