//! Controller window: transport widgets, the open dialog and the global
//! play/pause hotkey. Owns the viewer and forwards user intent to it.

use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::engine::PlaybackEngine;
use crate::keyboard::{ControlEvent, KeyListener};
use crate::media::{is_supported_media, MetadataReader, SUPPORTED_EXTENSIONS};
use crate::viewer::Viewer;

/// Size slider upper bound for a screen `screen_width` points wide
pub fn size_slider_max(screen_width: u32, offset: u32) -> u32 {
    screen_width.saturating_sub(offset)
}

/// First dropped file the viewer can open; anything else is ignored
pub fn first_supported(dropped: &[PathBuf]) -> Option<&PathBuf> {
    dropped.iter().find(|p| is_supported_media(p))
}

pub struct Controller {
    viewer: Viewer,
    events: Receiver<ControlEvent>,
    key_listener: Option<KeyListener>,
    /// Play button stays disabled until something was opened
    play_enabled: bool,
    size_slider: u32,
    size_slider_max: u32,
    size_offset: u32,
    media_dir: PathBuf,
    /// Last open failure, shown under the transport row
    status: Option<String>,
    shut_down: bool,
}

impl Controller {
    /// Build the controller and its viewer. Key presses and viewer close
    /// requests arrive on `events`; `sender` is the matching end.
    pub fn new(
        config: &Config,
        engine: Box<dyn PlaybackEngine>,
        metadata: Box<dyn MetadataReader>,
        screen_width: u32,
        sender: Sender<ControlEvent>,
        events: Receiver<ControlEvent>,
    ) -> Self {
        let on_close = Box::new(move || {
            let _ = sender.send(ControlEvent::ViewerClosed);
        });
        let viewer = Viewer::new(engine, metadata, config, on_close);

        let size_slider_max = size_slider_max(screen_width, config.size_slider_offset);

        Self {
            viewer,
            events,
            key_listener: None,
            play_enabled: false,
            size_slider: config.size_slider_initial.min(size_slider_max),
            size_slider_max,
            size_offset: config.size_slider_offset,
            media_dir: config.media_dir(),
            status: None,
            shut_down: false,
        }
    }

    /// Attach the background hotkey listener
    pub fn with_key_listener(mut self, listener: KeyListener) -> Self {
        self.key_listener = Some(listener);
        self
    }

    #[cfg(test)]
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    #[cfg(test)]
    pub fn play_enabled(&self) -> bool {
        self.play_enabled
    }

    #[cfg(test)]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Show the open dialog and load the selection
    pub fn open_media(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Open Video")
            .set_directory(&self.media_dir)
            .add_filter("Media Files", SUPPORTED_EXTENSIONS)
            .pick_file();

        match picked {
            Some(path) => self.load(&path),
            None => debug!("Open dialog cancelled"),
        }
    }

    /// Load `path` into the viewer and enable playback
    pub fn load(&mut self, path: &Path) {
        match self.viewer.set_media(path) {
            Ok(()) => {
                self.play_enabled = true;
                self.status = None;
            }
            Err(e) => {
                error!("Could not open {}: {}", path.display(), e);
                self.status = Some(e.to_string());
            }
        }
    }

    pub fn toggle_play(&mut self) {
        self.viewer.toggle_play();
    }

    pub fn seek(&mut self, position_ms: u64) {
        self.viewer.seek_to(position_ms);
    }

    pub fn resize_from_slider(&mut self, position: u32) {
        self.size_slider = position;
        self.viewer.resize_from_slider(position + self.size_offset);
    }

    /// Stop the hotkey listener, then close the viewer
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Some(listener) = self.key_listener.as_ref() {
            listener.stop();
        }
        self.viewer.close_window();
        info!("Controller closed");
    }

    /// Apply queued hotkey presses and viewer close requests.
    /// Returns true when the whole application should close.
    pub fn drain_events(&mut self) -> bool {
        let mut close = false;
        while let Ok(event) = self.events.try_recv() {
            match event {
                ControlEvent::TogglePlay => self.toggle_play(),
                ControlEvent::ViewerClosed => close = true,
            }
        }
        close
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });

        if let Some(path) = first_supported(&dropped) {
            self.load(path);
        } else if !dropped.is_empty() {
            debug!("Ignoring {} dropped file(s) with unsupported types", dropped.len());
        }
    }

    fn draw_controls(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK).inner_margin(8.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Open Media").clicked() {
                        self.open_media();
                    }

                    let icon = self.viewer.widgets().play_icon.glyph();
                    if ui
                        .add_enabled(self.play_enabled, egui::Button::new(icon))
                        .clicked()
                    {
                        self.toggle_play();
                    }

                    let (lo, hi) = self.viewer.widgets().seek_range;
                    let mut position = self.viewer.widgets().seek_value;
                    let seek = ui.add(
                        egui::Slider::new(&mut position, lo..=hi)
                            .show_value(false)
                            .trailing_fill(true),
                    );
                    if seek.changed() {
                        self.seek(position);
                    }

                    let mut size = self.size_slider;
                    let resize = ui.add(
                        egui::Slider::new(&mut size, 0..=self.size_slider_max).show_value(false),
                    );
                    if resize.changed() {
                        self.resize_from_slider(size);
                    }
                });

                ui.label(
                    egui::RichText::new(&self.viewer.widgets().timer_label)
                        .color(egui::Color32::WHITE),
                );

                if let Some(ref status) = self.status {
                    ui.label(egui::RichText::new(status).color(egui::Color32::RED));
                }
            });
    }
}

impl eframe::App for Controller {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.drain_events() {
            info!("Viewer closed, closing controller");
            self.shutdown();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            self.shutdown();
            return;
        }

        self.handle_dropped_files(ctx);
        self.viewer.show(ctx);
        self.draw_controls(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shutdown();
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0, 0.0, 0.0, 1.0]
    }
}
