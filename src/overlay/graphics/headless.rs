//! Headless graphics surface.
//!
//! Records every presented frame instead of drawing it. Used where no GPU
//! window exists (non-Windows hosts, tests). A device loss, and any number of
//! failed rebuild attempts after it, can be armed to exercise the same
//! notify-and-rebuild path the DirectX surface takes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{OverlayError, OverlayResult};
use crate::overlay::types::Frame;

use super::{DeviceNotifyList, GraphicsSurface, OutputSize};

/// Frames presented by a `HeadlessSurface`, shared with whoever inspects them.
#[derive(Clone, Default)]
pub struct FrameLog {
    inner: Arc<FrameLogInner>,
}

#[derive(Default)]
struct FrameLogInner {
    frames: Mutex<Vec<Frame>>,
    presented: Condvar,
    trims: AtomicUsize,
    rebuilds: AtomicUsize,
}

impl FrameLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.inner.frames.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<Frame> {
        self.inner.frames.lock().last().cloned()
    }

    pub fn trims(&self) -> usize {
        self.inner.trims.load(Ordering::SeqCst)
    }

    /// Number of times device resources were successfully rebuilt after a loss.
    pub fn rebuilds(&self) -> usize {
        self.inner.rebuilds.load(Ordering::SeqCst)
    }

    /// Block until a presented frame satisfies `pred` or `timeout` elapses.
    pub fn wait_for<F>(&self, timeout: Duration, mut pred: F) -> Option<Frame>
    where
        F: FnMut(&Frame) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut frames = self.inner.frames.lock();
        loop {
            if let Some(frame) = frames.iter().rev().find(|f| pred(*f)) {
                return Some(frame.clone());
            }
            if self
                .inner
                .presented
                .wait_until(&mut frames, deadline)
                .timed_out()
            {
                return frames.iter().rev().find(|f| pred(*f)).cloned();
            }
        }
    }

    fn push(&self, frame: Frame) {
        self.inner.frames.lock().push(frame);
        self.inner.presented.notify_all();
    }
}

/// A `GraphicsSurface` that records frames instead of presenting them.
pub struct HeadlessSurface {
    size: OutputSize,
    log: FrameLog,
    notify: DeviceNotifyList,
    lose_device: Arc<AtomicBool>,
    failing_rebuilds: Arc<AtomicUsize>,
    lost: bool,
    vsync: Duration,
}

/// Stand-in for a blocking present so an animating render loop does not spin.
const HEADLESS_VSYNC: Duration = Duration::from_millis(2);

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: OutputSize {
                width: width.max(1),
                height: height.max(1),
            },
            log: FrameLog::new(),
            notify: DeviceNotifyList::new(),
            lose_device: Arc::new(AtomicBool::new(false)),
            failing_rebuilds: Arc::new(AtomicUsize::new(0)),
            lost: false,
            vsync: HEADLESS_VSYNC,
        }
    }

    pub fn frame_log(&self) -> FrameLog {
        self.log.clone()
    }

    pub fn device_notify(&self) -> DeviceNotifyList {
        self.notify.clone()
    }

    /// Handle that makes the next present fail with a device loss.
    pub fn device_loss_trigger(&self) -> Arc<AtomicBool> {
        self.lose_device.clone()
    }

    /// Handle holding the number of upcoming rebuild attempts that fail.
    pub fn rebuild_failures(&self) -> Arc<AtomicUsize> {
        self.failing_rebuilds.clone()
    }

    fn handle_device_lost(&mut self) -> OverlayResult<()> {
        if !self.lost {
            self.lost = true;
            self.notify.notify_lost();
        }
        self.rebuild()
    }

    /// Restore notification is sent once, by the attempt that succeeds.
    fn rebuild(&mut self) -> OverlayResult<()> {
        let pending = self
            .failing_rebuilds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            log::warn!("[GRAPHICS] Headless rebuild failed, device still lost");
            return Err(OverlayError::DeviceLost("rebuild failed".into()));
        }

        self.log.inner.rebuilds.fetch_add(1, Ordering::SeqCst);
        if std::mem::take(&mut self.lost) {
            self.notify.notify_restored();
        }
        Ok(())
    }
}

impl GraphicsSurface for HeadlessSurface {
    fn draw(&mut self, frame: &Frame) -> OverlayResult<()> {
        if self.lose_device.swap(false, Ordering::SeqCst) {
            log::warn!("[GRAPHICS] Headless device removed, rebuilding resources");
            self.handle_device_lost()?;
            return Err(OverlayError::DeviceLost("simulated device removal".into()));
        }
        if self.lost {
            self.rebuild()?;
        }
        std::thread::sleep(self.vsync);
        self.log.push(frame.clone());
        Ok(())
    }

    fn trim(&mut self) {
        self.log.inner.trims.fetch_add(1, Ordering::SeqCst);
    }

    fn output_size(&self) -> OutputSize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::graphics::DeviceNotify;

    struct Flag(AtomicUsize);

    impl DeviceNotify for Flag {
        fn on_device_lost(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn on_device_restored(&self) {
            self.0.fetch_add(10, Ordering::SeqCst);
        }
    }

    #[test]
    fn records_frames() {
        let mut surface = HeadlessSurface::new(800, 600);
        let log = surface.frame_log();
        surface.draw(&Frame::default()).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(surface.output_size(), OutputSize { width: 800, height: 600 });
    }

    #[test]
    fn zero_size_is_clamped() {
        let surface = HeadlessSurface::new(0, 0);
        assert_eq!(surface.output_size(), OutputSize { width: 1, height: 1 });
    }

    #[test]
    fn device_loss_notifies_and_drops_frame() {
        let mut surface = HeadlessSurface::new(10, 10);
        let flag = Arc::new(Flag(AtomicUsize::new(0)));
        surface.device_notify().register(flag.clone());
        surface.device_loss_trigger().store(true, Ordering::SeqCst);

        let err = surface.draw(&Frame::default()).unwrap_err();
        assert!(matches!(err, OverlayError::DeviceLost(_)));
        assert_eq!(flag.0.load(Ordering::SeqCst), 11);
        assert!(surface.frame_log().is_empty());
        assert_eq!(surface.frame_log().rebuilds(), 1);

        surface.draw(&Frame::default()).unwrap();
        assert_eq!(surface.frame_log().len(), 1);
    }

    #[test]
    fn failed_rebuilds_delay_the_restore_notification() {
        let mut surface = HeadlessSurface::new(10, 10);
        let flag = Arc::new(Flag(AtomicUsize::new(0)));
        surface.device_notify().register(flag.clone());
        surface.rebuild_failures().store(2, Ordering::SeqCst);
        surface.device_loss_trigger().store(true, Ordering::SeqCst);

        assert!(surface.draw(&Frame::default()).is_err());
        assert!(surface.draw(&Frame::default()).is_err());
        assert_eq!(flag.0.load(Ordering::SeqCst), 1);
        assert_eq!(surface.frame_log().rebuilds(), 0);

        surface.draw(&Frame::default()).unwrap();
        assert_eq!(flag.0.load(Ordering::SeqCst), 11);
        assert_eq!(surface.frame_log().rebuilds(), 1);
        assert_eq!(surface.frame_log().len(), 1);
    }

    #[test]
    fn trim_is_counted() {
        let mut surface = HeadlessSurface::new(10, 10);
        surface.trim();
        assert_eq!(surface.frame_log().trims(), 1);
    }
}
