//! Unsupported-media notice with a link to a codec pack.

use eframe::egui;
use tracing::{info, warn};

pub const UNSUPPORTED_MESSAGE: &str =
    "Unsupported media type. Install the k-lite codec to support many types of media.";

pub struct AlertWindow {
    open: bool,
    url: String,
    viewport_id: egui::ViewportId,
}

impl AlertWindow {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            open: false,
            url: url.into(),
            viewport_id: egui::ViewportId::from_hash_of("pvd-alert"),
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn install(&self) {
        info!("Opening {}", self.url);
        if let Err(e) = open::that(&self.url) {
            warn!("Could not open browser for {}: {}", self.url, e);
        }
    }

    /// Draw the notice as its own window while it is open
    pub fn show(&mut self, ctx: &egui::Context) {
        if !self.open {
            return;
        }

        let builder = egui::ViewportBuilder::default()
            .with_title("Alert")
            .with_inner_size([420.0, 110.0])
            .with_resizable(false);

        ctx.show_viewport_immediate(self.viewport_id, builder, |ctx, _class| {
            egui::CentralPanel::default()
                .frame(egui::Frame::none().fill(egui::Color32::BLACK).inner_margin(12.0))
                .show(ctx, |ui| {
                    ui.label(egui::RichText::new(UNSUPPORTED_MESSAGE).color(egui::Color32::WHITE));
                    ui.add_space(8.0);
                    if ui.button("Install").clicked() {
                        self.install();
                    }
                });

            if ctx.input(|i| i.viewport().close_requested()) {
                self.open = false;
            }
        });
    }
}
