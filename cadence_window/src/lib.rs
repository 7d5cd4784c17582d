//! Window integration for the engine: a backend neutral event stream and a winit backed window.

pub mod winit_window;

pub use winit_window::WinitWindow;

/// Window state changes the frame loop reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEvent {
    /// The drawable area changed size, in physical pixels
    Resized { width: u32, height: u32 },
    /// The window is no longer visible and nothing should be drawn
    Minimized,
    /// The window became visible again after [`WindowEvent::Minimized`]
    Restored,
    /// The user asked for the window to close
    CloseRequested,
}

/// Source of window events, polled once per loop iteration
pub trait EventSource {
    /// Returns every event received since the last poll without blocking
    fn poll_events(&mut self) -> Vec<WindowEvent>;
}
