//! Render thread for one overlay window.
//!
//! The thread idles on a condition variable until the shared state is dirty,
//! snapshots the scene and the current animation alpha under the lock, then
//! draws and presents with the lock released. `dirty` is a level: any number
//! of updates before a wake collapse into one frame showing the latest scene.
//!
//! While a fade is in flight every snapshot leaves `dirty` set again, so the
//! thread keeps drawing until a frame with alpha 1 has been handed to the
//! surface.
//!
//! Mutators go through [`RenderLoop::update`], which raises a priority count
//! before taking the lock and lowers it after releasing it. While the count is
//! non-zero the render thread yields before relocking so the caller gets the
//! lock first.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{OverlayError, OverlayResult};

/// Pause between redraw attempts once a surface has failed twice in a row.
const RETRY_DELAY: Duration = Duration::from_millis(50);

use super::animation::{self, Animation};
use super::graphics::GraphicsSurface;
use super::types::{DrawableRect, Frame};

/// State shared between mutators and the render thread.
#[derive(Debug, Default)]
pub struct RenderState {
    scene: Vec<DrawableRect>,
    show_labels: bool,
    animation: Option<Animation>,
    visible: bool,
    dirty: bool,
    trim_requested: bool,
}

impl RenderState {
    /// Replace the scene and schedule a frame.
    pub fn submit_scene(&mut self, scene: Vec<DrawableRect>, show_labels: bool) {
        self.scene = scene;
        self.show_labels = show_labels;
        self.dirty = true;
    }

    /// Become visible and start a fade. Returns false if already visible.
    pub fn begin_show(&mut self, duration_ms: u32) -> bool {
        if self.visible {
            return false;
        }
        self.visible = true;
        self.animation = Animation::start(duration_ms);
        self.dirty = true;
        true
    }

    /// Cancel any fade and become hidden. Returns false if already hidden.
    pub fn end_show(&mut self) -> bool {
        if !self.visible {
            return false;
        }
        self.visible = false;
        self.animation = None;
        self.trim_requested = true;
        true
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn scene(&self) -> &[DrawableRect] {
        &self.scene
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref()
    }

    pub fn alpha_at(&self, now: Instant) -> f32 {
        animation::alpha_at(self.animation.as_ref(), now)
    }

    fn has_work(&self) -> bool {
        self.dirty || self.trim_requested
    }
}

struct Shared {
    state: Mutex<RenderState>,
    wake: Condvar,
    priority: AtomicUsize,
    abort: AtomicBool,
}

/// Work picked up by the render thread in one wake.
struct Job {
    frame: Option<Frame>,
    trim: bool,
}

/// Owner handle of a render thread. Dropping it stops and joins the thread.
pub struct RenderLoop {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl RenderLoop {
    /// Start the render thread; it takes ownership of `surface`.
    pub fn spawn(surface: Box<dyn GraphicsSurface>) -> OverlayResult<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(RenderState::default()),
            wake: Condvar::new(),
            priority: AtomicUsize::new(0),
            abort: AtomicBool::new(false),
        });

        let thread_shared = shared.clone();
        let thread = std::thread::Builder::new()
            .name("zone-overlay-render".into())
            .spawn(move || run(thread_shared, surface))
            .map_err(|e| OverlayError::RenderThread(format!("spawn failed: {}", e)))?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Mutate the shared state with priority over the render thread and wake
    /// it if there is something to do.
    pub fn update<R>(&self, f: impl FnOnce(&mut RenderState) -> R) -> R {
        let _priority = PriorityGuard::raise(&self.shared.priority);
        let mut state = self.shared.state.lock();
        let result = f(&mut state);
        if state.has_work() {
            self.shared.wake.notify_all();
        }
        drop(state);
        result
    }

    /// Read the shared state without scheduling anything.
    pub fn read<R>(&self, f: impl FnOnce(&RenderState) -> R) -> R {
        f(&self.shared.state.lock())
    }

    /// Stop the render thread and wait for it. Safe to call more than once.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        {
            let _state = self.shared.state.lock();
            self.shared.abort.store(true, Ordering::SeqCst);
        }
        self.shared.wake.notify_all();

        if thread.join().is_err() {
            log::error!("[RENDER] Render thread panicked");
        } else {
            log::debug!("[RENDER] Render thread stopped");
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Raised for the lifetime of a mutator's critical section, lowered after the
/// lock is released (the guard is declared before the lock guard).
struct PriorityGuard<'a>(&'a AtomicUsize);

impl<'a> PriorityGuard<'a> {
    fn raise(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PriorityGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn run(shared: Arc<Shared>, mut surface: Box<dyn GraphicsSurface>) {
    log::debug!("[RENDER] Render thread started");
    let mut failures = 0u32;

    while !shared.abort.load(Ordering::SeqCst) {
        // A mutator is waiting for the lock
        if shared.priority.load(Ordering::SeqCst) > 0 {
            std::thread::yield_now();
        }

        let Some(job) = next_job(&shared) else {
            break;
        };

        if job.trim {
            surface.trim();
        }

        let Some(frame) = job.frame else {
            continue;
        };

        match surface.draw(&frame) {
            Ok(()) => failures = 0,
            Err(e) if e.is_recoverable() => {
                failures += 1;
                log::warn!("[RENDER] Frame dropped ({} in a row): {}", failures, e);
                shared.state.lock().mark_dirty();
                if failures > 1 {
                    std::thread::sleep(RETRY_DELAY);
                }
            }
            Err(e) => log::error!("[RENDER] Frame failed: {}", e),
        }
    }
}

/// Block until there is work, then take it. `None` means abort.
fn next_job(shared: &Shared) -> Option<Job> {
    let mut state = shared.state.lock();
    shared.wake.wait_while(&mut state, |s| {
        !s.has_work() && !shared.abort.load(Ordering::SeqCst)
    });

    if shared.abort.load(Ordering::SeqCst) {
        return None;
    }

    let trim = std::mem::take(&mut state.trim_requested);
    let frame = if std::mem::take(&mut state.dirty) {
        let frame = Frame {
            rects: state.scene.clone(),
            alpha: state.alpha_at(Instant::now()),
            show_labels: state.show_labels,
        };
        // Fade still in flight: the opaque frame is yet to come
        if frame.alpha < 1.0 {
            state.dirty = true;
        }
        Some(frame)
    } else {
        None
    };

    Some(Job { frame, trim })
}
