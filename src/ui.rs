//! Window-based key capture. Keys pressed while the window has focus are
//! forwarded to the keyboard service; the window colour shows host state.

use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;

use softbuffer::{Context as SbContext, Surface as SbSurface};
use tokio::sync::mpsc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    keyboard::PhysicalKey,
    window::Window,
};

use crate::hid::keycode_to_hid;
use crate::input::KeyEvent;
use crate::protocol::{ProtocolMode, SuspendState};
use crate::service::KeyboardService;

const COLOR_REPORT: u32 = 0xFF00_0000;
const COLOR_BOOT: u32 = 0xFF00_0030;
const COLOR_SUSPENDED: u32 = 0xFF30_3030;

pub fn state_color(mode: ProtocolMode, suspend: SuspendState) -> u32 {
    match (suspend, mode) {
        (SuspendState::Suspended, _) => COLOR_SUSPENDED,
        (SuspendState::Active, ProtocolMode::Boot) => COLOR_BOOT,
        (SuspendState::Active, ProtocolMode::Report) => COLOR_REPORT,
    }
}

pub struct App {
    window: Option<Rc<Window>>,
    sb_ctx: Option<SbContext<Rc<Window>>>,
    sb_surface: Option<SbSurface<Rc<Window>, Rc<Window>>>,
    key_tx: mpsc::Sender<KeyEvent>,
    keyboard: Arc<KeyboardService>,
    pressed_usages: BTreeSet<u8>,
    size: PhysicalSize<u32>,
    exiting: bool,
}

impl App {
    pub fn new(key_tx: mpsc::Sender<KeyEvent>, keyboard: Arc<KeyboardService>) -> Self {
        Self {
            window: None,
            sb_ctx: None,
            sb_surface: None,
            key_tx,
            keyboard,
            pressed_usages: BTreeSet::new(),
            size: PhysicalSize::new(320, 200),
            exiting: false,
        }
    }

    #[inline]
    fn send(&self, ev: KeyEvent) {
        if self.key_tx.blocking_send(ev).is_err() {
            tracing::debug!(?ev, "Key channel closed");
        }
    }

    fn draw(&mut self) {
        // Lazy init if needed
        if self.sb_surface.is_none() {
            let Some(win_ref) = self.window.as_ref() else {
                return;
            };
            let win_owned = Rc::clone(win_ref);
            if self.sb_ctx.is_none() {
                match SbContext::new(win_owned.clone()) {
                    Ok(c) => self.sb_ctx = Some(c),
                    Err(e) => {
                        tracing::error!(error = %e, "softbuffer context error");
                        return;
                    }
                }
            }
            if let Some(ctx) = self.sb_ctx.as_ref() {
                match SbSurface::new(ctx, win_owned) {
                    Ok(s) => self.sb_surface = Some(s),
                    Err(e) => {
                        tracing::error!(error = %e, "softbuffer surface error");
                        return;
                    }
                }
            }
        }
        let (Some(w), Some(h)) = (
            NonZeroU32::new(self.size.width.max(1)),
            NonZeroU32::new(self.size.height.max(1)),
        ) else {
            return;
        };
        let color = state_color(self.keyboard.protocol_mode(), self.keyboard.suspend_state());
        if let Some(surf) = self.sb_surface.as_mut() {
            if let Err(e) = surf.resize(w, h) {
                tracing::error!(error = %e, "softbuffer resize error");
                return;
            }
            if let Ok(mut buf) = surf.buffer_mut() {
                buf.fill(color);
                if let Err(e) = buf.present() {
                    tracing::error!(error = %e, "softbuffer present error");
                }
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, el: &winit::event_loop::ActiveEventLoop) {
        if self.exiting {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("LeKeyboard")
            .with_inner_size(self.size);
        match el.create_window(attrs) {
            Ok(win) => {
                self.size = win.inner_size();
                win.request_redraw();
                self.window = Some(Rc::new(win));
                tracing::info!("[winit] resumed -> window created");
            }
            Err(e) => {
                tracing::error!(error = %e, "window creation failed");
                el.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        tracing::trace!(?event, "winit event");
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.exiting = true;
                // Drop softbuffer resources explicitly
                self.sb_surface = None;
                self.sb_ctx = None;
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.repeat {
                    return;
                }
                let usage = match &event.physical_key {
                    PhysicalKey::Code(code) => keycode_to_hid(*code),
                    _ => None,
                };
                if let Some(u) = usage {
                    let down = matches!(event.state, ElementState::Pressed);
                    // Track pressed usages for focus-loss cleanup
                    if down {
                        self.pressed_usages.insert(u);
                    } else {
                        self.pressed_usages.remove(&u);
                    }
                    self.send(KeyEvent::new(u, down));
                }
                if let Some(w) = self.window.as_ref() {
                    w.request_redraw();
                }
            }
            WindowEvent::Focused(focused) => {
                if !focused {
                    for u in std::mem::take(&mut self.pressed_usages) {
                        self.send(KeyEvent::new(u, false));
                    }
                }
                tracing::info!(%focused, "Focused");
            }
            WindowEvent::Resized(sz) => {
                self.size = sz;
                if let Some(w) = self.window.as_ref() {
                    w.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                self.draw();
            }
            _ => {}
        }
    }
}
