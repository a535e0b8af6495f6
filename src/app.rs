// Window setup and the winit event loop driving the engine

use std::{sync::Arc, time::Instant};

use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, Event, MouseButton, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowBuilder},
};

use crate::{
    engine::{Engine, EngineConfig},
    error::EngineError,
    renderer::WgpuDevice,
};

pub fn create_window(event_loop: &EventLoop<()>, config: &EngineConfig) -> Result<Arc<Window>, EngineError> {
    // Create window with Arc for shared ownership
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .build(event_loop)?;
    Ok(Arc::new(window))
}

fn grab_cursor(window: &Window) -> bool {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    match grabbed {
        Ok(()) => {
            window.set_cursor_visible(false);
            true
        }
        Err(err) => {
            log::warn!("pointer lock unavailable: {err}");
            false
        }
    }
}

fn release_cursor(window: &Window) {
    if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
        log::warn!("failed to release pointer: {err}");
    }
    window.set_cursor_visible(true);
}

impl Engine<WgpuDevice> {
    /// Runs frames until the window closes, calling `on_tick` once per frame.
    ///
    /// Clicking the window captures the pointer for mouse look; Escape or
    /// losing focus releases it.
    pub fn run<F>(mut self, event_loop: EventLoop<()>, mut on_tick: F) -> Result<(), EngineError>
    where
        F: FnMut(&mut Engine<WgpuDevice>, f32),
    {
        let window = self.device().window().clone();
        let mut pointer_locked = false;

        event_loop.run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent {
                    window_id,
                    event: WindowEvent::CloseRequested,
                } if window_id == window.id() => {
                    target.exit();
                }
                Event::WindowEvent {
                    event: WindowEvent::Resized(physical_size),
                    window_id,
                } if window_id == window.id() => {
                    self.resize(physical_size.width, physical_size.height);
                }
                Event::WindowEvent {
                    event: WindowEvent::Focused(false),
                    window_id,
                } if window_id == window.id() => {
                    self.input_mut().clear();
                    if pointer_locked {
                        release_cursor(&window);
                        pointer_locked = false;
                    }
                }
                Event::WindowEvent {
                    event:
                        WindowEvent::MouseInput {
                            state: ElementState::Pressed,
                            button: MouseButton::Left,
                            ..
                        },
                    window_id,
                } if window_id == window.id() => {
                    if !pointer_locked {
                        pointer_locked = grab_cursor(&window);
                    }
                }
                Event::WindowEvent {
                    event: WindowEvent::KeyboardInput { event, .. },
                    window_id,
                } if window_id == window.id() => {
                    let escape = event.physical_key == PhysicalKey::Code(KeyCode::Escape);
                    if escape && event.state == ElementState::Pressed && pointer_locked {
                        release_cursor(&window);
                        pointer_locked = false;
                    }
                    self.input_mut().handle_key_event(&event);
                }
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta: (dx, dy) },
                    ..
                } => {
                    if pointer_locked {
                        self.input_mut().add_mouse_delta(dx as f32, dy as f32);
                    }
                }
                Event::AboutToWait => {
                    window.request_redraw();
                }
                Event::WindowEvent {
                    event: WindowEvent::RedrawRequested,
                    window_id,
                } if window_id == window.id() => {
                    self.frame(Instant::now(), Some(&mut on_tick));
                }
                _ => {}
            }
        })?;

        log::info!("event loop finished");
        Ok(())
    }
}
