//! GStreamer `playbin` backend for the viewer.
//!
//! Frames are pulled as RGBA from an `appsink` on the streaming thread and
//! parked in a single-slot mailbox; everything else runs on the UI thread,
//! which drains the pipeline bus once per frame in [`GstEngine::poll_events`].

use std::path::Path;
use std::sync::Arc;

use gstreamer as gst;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use gst_video::prelude::*;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::engine::{EngineError, EngineEvent, PlaybackEngine, VideoFrame};
use crate::session::{MediaStatus, PlaybackState};

/// Wakes the UI thread when a new frame is available
pub type RepaintWaker = Arc<dyn Fn() + Send + Sync>;

type FrameSlot = Arc<Mutex<Option<VideoFrame>>>;

/// Transport bookkeeping shared by every pipeline call. Holds no GStreamer
/// objects; the engine applies the pipeline side of each decision.
#[derive(Debug, Default)]
struct Transport {
    state: PlaybackState,
    status: MediaStatus,
    duration_ms: u64,
    last_position_ms: Option<u64>,
    prerolled: bool,
    pending: Vec<EngineEvent>,
}

impl Transport {
    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.pending.push(EngineEvent::StateChanged(state));
        }
    }

    fn has_media(&self) -> bool {
        !matches!(self.status, MediaStatus::NoMedia | MediaStatus::Unsupported)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn loading(&mut self) {
        self.status = MediaStatus::Loading;
    }

    /// First preroll finished. Returns true when the duration must be reported.
    fn prerolled(&mut self) -> bool {
        if self.prerolled {
            return false;
        }
        self.prerolled = true;
        if self.status == MediaStatus::Loading {
            self.status = MediaStatus::Loaded;
        }
        true
    }

    fn duration(&mut self, duration_ms: u64, force: bool) {
        if force || duration_ms != self.duration_ms {
            self.duration_ms = duration_ms;
            self.pending.push(EngineEvent::DurationChanged(duration_ms));
        }
    }

    fn end_of_stream(&mut self) {
        self.status = MediaStatus::EndOfMedia;
        self.set_state(PlaybackState::Stopped);
    }

    fn unsupported(&mut self) {
        self.status = MediaStatus::Unsupported;
        self.set_state(PlaybackState::Stopped);
    }

    /// About to play. Returns true when playback must restart from the beginning.
    fn rewind_before_play(&mut self) -> bool {
        if self.status == MediaStatus::EndOfMedia {
            self.status = MediaStatus::Loaded;
            return true;
        }
        false
    }

    fn started(&mut self) {
        self.set_state(PlaybackState::Playing);
        // Report the current position even if it has not moved, so a still
        // image gets paused by the viewer straight away.
        self.last_position_ms = None;
    }

    fn seeked(&mut self) {
        self.last_position_ms = None;
    }

    fn wants_position(&self) -> bool {
        self.prerolled && self.has_media()
    }

    fn position(&mut self, position_ms: u64) {
        if self.last_position_ms != Some(position_ms) {
            self.last_position_ms = Some(position_ms);
            self.pending.push(EngineEvent::PositionChanged(position_ms));
        }
    }

    fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending)
    }
}

pub struct GstEngine {
    playbin: gst::Element,
    bus: gst::Bus,
    frames: FrameSlot,
    transport: Transport,
}

impl GstEngine {
    pub fn new(waker: RepaintWaker) -> Result<Self, EngineError> {
        gst::init().map_err(|e| EngineError::Init(e.to_string()))?;

        let playbin = gst::ElementFactory::make("playbin")
            .name("pvd-playbin")
            .build()
            .map_err(|e| EngineError::Pipeline(e.to_string()))?;

        let frames: FrameSlot = Arc::new(Mutex::new(None));

        let sink = gst_app::AppSink::builder()
            .caps(
                &gst_video::VideoCapsBuilder::new()
                    .format(gst_video::VideoFormat::Rgba)
                    .build(),
            )
            .max_buffers(1)
            .drop(true)
            .build();

        let preroll_frames = frames.clone();
        let preroll_waker = waker.clone();
        let sample_frames = frames.clone();
        let sample_waker = waker;
        sink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_preroll(move |sink| {
                    let sample = sink.pull_preroll().map_err(|_| gst::FlowError::Eos)?;
                    store_sample(&sample, &preroll_frames, &preroll_waker)
                })
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    store_sample(&sample, &sample_frames, &sample_waker)
                })
                .build(),
        );

        playbin.set_property("video-sink", &sink);

        let bus = playbin
            .bus()
            .ok_or_else(|| EngineError::Pipeline("playbin has no bus".to_string()))?;

        info!("GStreamer {} playback engine ready", gst::version_string());

        Ok(Self {
            playbin,
            bus,
            frames,
            transport: Transport::default(),
        })
    }

    fn mark_unsupported(&mut self) {
        let _ = self.playbin.set_state(gst::State::Null);
        self.transport.unsupported();
    }

    fn query_duration_ms(&self) -> u64 {
        self.playbin
            .query_duration::<gst::ClockTime>()
            .map(|d| d.mseconds())
            .unwrap_or(0)
    }

    fn handle_message(&mut self, msg: &gst::Message) {
        use gst::MessageView;

        match msg.view() {
            MessageView::AsyncDone(..) => {
                if self.transport.prerolled() {
                    let duration = self.query_duration_ms();
                    self.transport.duration(duration, true);
                }
            }
            MessageView::DurationChanged(..) => {
                let duration = self.query_duration_ms();
                self.transport.duration(duration, false);
            }
            MessageView::Eos(..) => {
                debug!("End of stream");
                let _ = self.playbin.set_state(gst::State::Paused);
                self.transport.end_of_stream();
            }
            MessageView::Error(err) => {
                warn!(
                    "Playback error from {}: {} ({:?})",
                    msg.src()
                        .map(|s| s.path_string().to_string())
                        .unwrap_or_else(|| "pipeline".to_string()),
                    err.error(),
                    err.debug()
                );
                self.mark_unsupported();
            }
            _ => {}
        }
    }
}

impl PlaybackEngine for GstEngine {
    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        // Resolve first: a bad path must leave the current media playing.
        let uri = media_uri(path)?;

        self.unload();
        self.playbin.set_property("uri", uri.as_str());
        self.transport.loading();

        // Preroll so the first frame and the duration show up before play.
        if let Err(e) = self.playbin.set_state(gst::State::Paused) {
            warn!("{} refused to preroll: {}", path.display(), e);
            self.mark_unsupported();
        }

        info!("Loaded {}", uri);
        Ok(())
    }

    fn play(&mut self) {
        if !self.transport.has_media() {
            return;
        }

        if self.transport.rewind_before_play() {
            self.seek_to(0);
        }

        match self.playbin.set_state(gst::State::Playing) {
            Ok(_) => self.transport.started(),
            Err(e) => {
                warn!("Could not start playback: {}", e);
                self.mark_unsupported();
            }
        }
    }

    fn pause(&mut self) {
        if !self.transport.has_media() {
            return;
        }

        match self.playbin.set_state(gst::State::Paused) {
            Ok(_) => self.transport.set_state(PlaybackState::Paused),
            Err(e) => warn!("Could not pause playback: {}", e),
        }
    }

    fn seek_to(&mut self, position_ms: u64) {
        if let Err(e) = self.playbin.seek_simple(
            gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT,
            gst::ClockTime::from_mseconds(position_ms),
        ) {
            debug!("Seek to {} ms failed: {}", position_ms, e);
            return;
        }
        self.transport.seeked();
    }

    fn unload(&mut self) {
        let _ = self.playbin.set_state(gst::State::Null);
        self.frames.lock().take();
        self.transport.reset();
    }

    fn state(&self) -> PlaybackState {
        self.transport.state
    }

    fn media_status(&self) -> MediaStatus {
        self.transport.status
    }

    fn duration_ms(&self) -> u64 {
        self.transport.duration_ms
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        while let Some(msg) = self.bus.pop() {
            self.handle_message(&msg);
        }

        if self.transport.wants_position() {
            let position = self
                .playbin
                .query_position::<gst::ClockTime>()
                .map(|p| p.mseconds())
                .unwrap_or(0);
            self.transport.position(position);
        }

        self.transport.drain()
    }

    fn take_frame(&mut self) -> Option<VideoFrame> {
        self.frames.lock().take()
    }
}

impl Drop for GstEngine {
    fn drop(&mut self) {
        let _ = self.playbin.set_state(gst::State::Null);
    }
}

/// `file://` URI for a local media path
fn media_uri(path: &Path) -> Result<String, EngineError> {
    let load_error = |reason: String| EngineError::Load {
        path: path.to_path_buf(),
        reason,
    };
    let abs_path = path.canonicalize().map_err(|e| load_error(e.to_string()))?;
    let uri = gst::glib::filename_to_uri(&abs_path, None).map_err(|e| load_error(e.to_string()))?;
    Ok(uri.to_string())
}

fn store_sample(
    sample: &gst::Sample,
    frames: &FrameSlot,
    waker: &RepaintWaker,
) -> Result<gst::FlowSuccess, gst::FlowError> {
    let caps = sample.caps().ok_or(gst::FlowError::Error)?;
    let info = gst_video::VideoInfo::from_caps(caps).map_err(|_| gst::FlowError::Error)?;
    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
    let frame = gst_video::VideoFrameRef::from_buffer_ref_readable(buffer, &info)
        .map_err(|_| gst::FlowError::Error)?;

    let stride = frame.plane_stride()[0] as usize;
    let data = frame.plane_data(0).map_err(|_| gst::FlowError::Error)?;
    let pixels =
        pack_rows(data, stride, info.width(), info.height()).ok_or(gst::FlowError::Error)?;

    *frames.lock() = Some(VideoFrame {
        width: info.width(),
        height: info.height(),
        pixels,
    });
    waker();

    Ok(gst::FlowSuccess::Ok)
}

/// Copy RGBA rows out of a padded plane. `None` if the plane is too short.
fn pack_rows(data: &[u8], stride: usize, width: u32, height: u32) -> Option<Vec<u8>> {
    let row = width as usize * 4;
    if stride < row {
        return None;
    }

    let mut pixels = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        pixels.extend_from_slice(data.get(start..start + row)?);
    }
    Some(pixels)
}
