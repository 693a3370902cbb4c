//! Global keyboard listener.
//!
//! The OS hook blocks its thread for the life of the process, so it runs on a
//! dedicated thread and forwards matching presses to the UI over a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

/// Requests delivered to the controller's event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Toggle play/pause (hotkey press)
    TogglePlay,
    /// The viewer window was closed from outside the controller
    ViewerClosed,
}

/// Filters raw hook events down to play toggles
struct KeyFilter {
    key: rdev::Key,
    stopped: Arc<AtomicBool>,
    events: Sender<ControlEvent>,
    wake: Box<dyn Fn() + Send>,
}

impl KeyFilter {
    fn on_event(&self, event: &rdev::EventType) {
        if self.stopped.load(Ordering::Relaxed) {
            return;
        }
        if let rdev::EventType::KeyPress(key) = event {
            if *key == self.key && self.events.send(ControlEvent::TogglePlay).is_ok() {
                (self.wake)();
            }
        }
    }
}

/// Handle to the background hook thread
pub struct KeyListener {
    stopped: Arc<AtomicBool>,
}

impl KeyListener {
    /// Start listening for `key` on a background thread.
    ///
    /// `wake` is called after each forwarded press so the UI thread picks the
    /// event up without waiting for input of its own.
    pub fn start(
        key: rdev::Key,
        events: Sender<ControlEvent>,
        wake: impl Fn() + Send + 'static,
    ) -> std::io::Result<Self> {
        let stopped = Arc::new(AtomicBool::new(false));
        let filter = KeyFilter {
            key,
            stopped: stopped.clone(),
            events,
            wake: Box::new(wake),
        };

        std::thread::Builder::new()
            .name("key-listener".to_string())
            .spawn(move || {
                if let Err(e) = rdev::listen(move |event| filter.on_event(&event.event_type)) {
                    warn!("Global key listener failed: {:?}", e);
                }
            })?;

        info!("Global key listener started for {:?}", key);
        Ok(Self { stopped })
    }

    /// Stop forwarding presses. The hook thread itself is not joined.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::Relaxed) {
            debug!("Global key listener stopped");
        }
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn filter_for(key: rdev::Key) -> (KeyFilter, crossbeam_channel::Receiver<ControlEvent>, Arc<AtomicUsize>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        let filter = KeyFilter {
            key,
            stopped: Arc::new(AtomicBool::new(false)),
            events: tx,
            wake: Box::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        };
        (filter, rx, wakes)
    }

    #[test]
    fn only_presses_of_the_bound_key_are_forwarded() {
        let (filter, rx, wakes) = filter_for(rdev::Key::Space);

        filter.on_event(&rdev::EventType::KeyPress(rdev::Key::KeyA));
        filter.on_event(&rdev::EventType::KeyRelease(rdev::Key::Space));
        filter.on_event(&rdev::EventType::KeyPress(rdev::Key::Space));

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![ControlEvent::TogglePlay]);
        assert_eq!(wakes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn stopped_filter_drops_presses() {
        let (filter, rx, wakes) = filter_for(rdev::Key::Space);
        filter.stopped.store(true, Ordering::Relaxed);

        filter.on_event(&rdev::EventType::KeyPress(rdev::Key::Space));

        assert!(rx.try_recv().is_err());
        assert_eq!(wakes.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn closed_channel_does_not_wake() {
        let (filter, rx, wakes) = filter_for(rdev::Key::Space);
        drop(rx);

        filter.on_event(&rdev::EventType::KeyPress(rdev::Key::Space));
        assert_eq!(wakes.load(Ordering::Relaxed), 0);
    }
}
