use std::time::Duration;

use anyhow::{Result, anyhow};
use cadence_gpu::winit;
use cadence_gpu::wsi::WindowDimensions;
use tracing::{debug, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent as WinitEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::{EventSource, WindowEvent};

/// Collects winit callbacks into [`WindowEvent`]s between polls
struct WindowApp {
    attributes: WindowAttributes,
    window: Option<Window>,
    created: bool,
    creation_error: Option<winit::error::OsError>,
    visibility: Visibility,
    pending: Vec<WindowEvent>,
}

impl WindowApp {
    fn new(attributes: WindowAttributes) -> Self {
        Self {
            attributes,
            window: None,
            created: false,
            creation_error: None,
            visibility: Visibility::default(),
            pending: Vec::new(),
        }
    }
}

impl ApplicationHandler for WindowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.created {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                self.window = Some(window);
                self.created = true;
            }
            Err(err) => self.creation_error = Some(err),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WinitEvent) {
        translate_event(&event, &mut self.visibility, &mut self.pending);
    }
}

/// The two independent ways a window stops being visible
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub occluded: bool,
    pub zero_sized: bool,
}

impl Visibility {
    pub fn is_hidden(&self) -> bool {
        self.occluded || self.zero_sized
    }
}

/// Maps a winit event onto zero or more [`WindowEvent`]s. The window counts as minimized while it
/// is zero sized or occluded, and is restored only once it is neither.
pub fn translate_event(
    event: &WinitEvent,
    visibility: &mut Visibility,
    out: &mut Vec<WindowEvent>,
) {
    let was_hidden = visibility.is_hidden();
    match event {
        WinitEvent::CloseRequested | WinitEvent::Destroyed => {
            out.push(WindowEvent::CloseRequested);
            return;
        }
        WinitEvent::Resized(size) => {
            visibility.zero_sized = size.width == 0 || size.height == 0;
        }
        WinitEvent::Occluded(occluded) => visibility.occluded = *occluded,
        _ => return,
    }
    match (was_hidden, visibility.is_hidden()) {
        (false, true) => out.push(WindowEvent::Minimized),
        (true, false) => out.push(WindowEvent::Restored),
        _ => {}
    }
    if let WinitEvent::Resized(size) = event {
        if !visibility.zero_sized {
            out.push(WindowEvent::Resized {
                width: size.width,
                height: size.height,
            });
        }
    }
}

/// A winit window driven by pumping its event loop from the frame loop
pub struct WinitWindow {
    event_loop: EventLoop<()>,
    app: WindowApp,
    window: Window,
    exited: bool,
}

impl WinitWindow {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        let mut event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        let attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);
        let mut app = WindowApp::new(attributes);

        // the window only exists once the loop has delivered `resumed`
        let window = loop {
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(Duration::from_millis(16)), &mut app)
            {
                return Err(anyhow!("event loop exited with {code} before a window was created"));
            }
            if let Some(err) = app.creation_error.take() {
                return Err(err.into());
            }
            if let Some(window) = app.window.take() {
                break window;
            }
        };
        info!(
            "Created window \"{title}\" at {}x{}",
            window.width(),
            window.height()
        );

        Ok(Self {
            event_loop,
            app,
            window,
            exited: false,
        })
    }

    /// The winit window, for surface creation
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Current drawable size in physical pixels
    pub fn drawable_extent(&self) -> (u32, u32) {
        (self.window.width(), self.window.height())
    }
}

impl EventSource for WinitWindow {
    fn poll_events(&mut self) -> Vec<WindowEvent> {
        if !self.exited {
            if let PumpStatus::Exit(code) =
                self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.app)
            {
                debug!("Event loop exited with {code}");
                self.exited = true;
                self.app.pending.push(WindowEvent::CloseRequested);
            }
        }
        std::mem::take(&mut self.app.pending)
    }
}
