//! PVD Viewer: a controller window with transport controls and a borderless,
//! aspect-locked viewer window.
//! Built with Rust + egui (eframe) + GStreamer

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod alert;
mod config;
mod controller;
mod engine;
mod geometry;
mod gst_engine;
mod keyboard;
mod media;
mod session;
mod viewer;
mod widgets;

#[cfg(feature = "mimalloc-allocator")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;
use std::sync::Arc;

use config::Config;
use controller::Controller;
use eframe::egui;
use gst_engine::GstEngine;
use keyboard::KeyListener;
use media::MediaProbe;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Get primary monitor width on Windows
#[cfg(target_os = "windows")]
fn primary_screen_width() -> u32 {
    use winapi::um::winuser::{GetSystemMetrics, SM_CXSCREEN};

    unsafe { GetSystemMetrics(SM_CXSCREEN).max(0) as u32 }
}

#[cfg(not(target_os = "windows"))]
fn primary_screen_width() -> u32 {
    1920
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pvd_viewer={}", config.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> eframe::Result<()> {
    let loaded = Config::load();
    init_logging(&loaded.config);
    loaded.report();
    let config = loaded.config;

    // Optional media path to open at startup
    let initial_path = std::env::args().nth(1).map(PathBuf::from);

    let controller_layout = config.controller;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("PVD Controller")
            .with_icon(build_app_icon())
            .with_position([controller_layout.x as f32, controller_layout.y as f32])
            .with_inner_size([controller_layout.width as f32, controller_layout.height as f32])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    info!("Starting PVD Viewer");

    eframe::run_native(
        "PVD Controller",
        options,
        Box::new(move |cc| {
            let mut visuals = egui::Visuals::dark();
            visuals.panel_fill = egui::Color32::BLACK;
            visuals.window_fill = egui::Color32::BLACK;
            cc.egui_ctx.set_visuals(visuals);

            let repaint_ctx = cc.egui_ctx.clone();
            let engine = GstEngine::new(Arc::new(move || repaint_ctx.request_repaint()))?;

            let (sender, events) = crossbeam_channel::unbounded();
            let mut controller = Controller::new(
                &config,
                Box::new(engine),
                Box::new(MediaProbe::new()),
                primary_screen_width(),
                sender.clone(),
                events,
            );

            if config.global_hotkey {
                match config.toggle_play_key.to_rdev_key() {
                    Some(key) => {
                        let wake_ctx = cc.egui_ctx.clone();
                        match KeyListener::start(key, sender, move || wake_ctx.request_repaint()) {
                            Ok(listener) => controller = controller.with_key_listener(listener),
                            Err(e) => warn!("Could not start global key listener: {}", e),
                        }
                    }
                    None => warn!(
                        "No global hook key for {:?}",
                        config.toggle_play_key.as_str()
                    ),
                }
            }

            if let Some(path) = initial_path {
                controller.load(&path);
            }

            Ok(Box::new(controller))
        }),
    )
}

fn build_app_icon() -> egui::IconData {
    let w: usize = 64;
    let h: usize = 64;
    let mut rgba = vec![0u8; w * h * 4];

    let set_px = |rgba: &mut [u8], x: usize, y: usize, a: u8| {
        let idx = (y * w + x) * 4;
        rgba[idx] = 255;
        rgba[idx + 1] = 255;
        rgba[idx + 2] = 255;
        rgba[idx + 3] = a;
    };

    // Rounded frame with a play triangle in the middle.
    for y in 0..h {
        for x in 0..w {
            let fx = x as f32 + 0.5;
            let fy = y as f32 + 0.5;
            let border = 6.0;
            let left = border;
            let right = (w as f32) - border;
            let top = border;
            let bottom = (h as f32) - border;

            let on_border = (fx >= left && fx <= right && (fy - top).abs() < 1.2)
                || (fx >= left && fx <= right && (fy - bottom).abs() < 1.2)
                || (fy >= top && fy <= bottom && (fx - left).abs() < 1.2)
                || (fy >= top && fy <= bottom && (fx - right).abs() < 1.2);

            // Triangle pointing right, 24px tall, centered.
            let tri_left = 24.0;
            let tri_right = 44.0;
            let cy = h as f32 / 2.0;
            let half = 12.0 * (tri_right - fx) / (tri_right - tri_left);
            let in_play = fx >= tri_left && fx <= tri_right && (fy - cy).abs() <= half;

            if on_border || in_play {
                set_px(&mut rgba, x, y, 235);
            }
        }
    }

    egui::IconData {
        rgba,
        width: w as u32,
        height: h as u32,
    }
}
