use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_events::EventListener;
use gloo_render::{request_animation_frame, AnimationFrame};
use log::info;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, MouseEvent, Window};

use crate::config::ParallaxConfig;
use crate::dom;
use crate::error::SiteError;

/// Offset in px for the artifact at `index`, given the pointer as a fraction
/// of the viewport. Deeper artifacts move further.
pub fn parallax_offset(
    index: usize,
    mouse_x: f64,
    mouse_y: f64,
    speed_step: f64,
    amplitude: f64,
) -> (f64, f64) {
    let speed = (index + 1) as f64 * speed_step;
    (
        (mouse_x - 0.5) * speed * amplitude,
        (mouse_y - 0.5) * speed * amplitude,
    )
}

/// Holds at most one pending animation frame.
#[derive(Default)]
pub struct FrameGate {
    pending: RefCell<Option<AnimationFrame>>,
}

impl FrameGate {
    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Schedules `callback` for the next frame unless one is already queued.
    /// Returns whether a new frame was requested.
    pub fn request<F>(self: &Rc<Self>, callback: F) -> bool
    where
        F: FnOnce(f64) + 'static,
    {
        if self.is_pending() {
            return false;
        }
        let gate = Rc::clone(self);
        let frame = request_animation_frame(move |timestamp| {
            gate.pending.borrow_mut().take();
            callback(timestamp);
        });
        *self.pending.borrow_mut() = Some(frame);
        true
    }

    pub fn cancel(&self) {
        self.pending.borrow_mut().take();
    }
}

/// Mouse-driven artifact parallax plus the pointer glow on service cards.
pub struct Parallax {
    gate: Rc<FrameGate>,
    listeners: Vec<EventListener>,
}

impl Parallax {
    pub fn attach(
        window: &Window,
        document: &Document,
        config: &ParallaxConfig,
    ) -> Result<Self, SiteError> {
        let mut parallax = Self {
            gate: Rc::new(FrameGate::default()),
            listeners: Vec::new(),
        };

        let artifacts = Rc::new(dom::query_all(document, &config.selector)?);
        if !artifacts.is_empty() {
            info!("Parallax on {} artifacts", artifacts.len());
            let pointer = Rc::new(Cell::new((0.5, 0.5)));
            let gate = parallax.gate.clone();
            let window_for_size = window.clone();
            let speed_step = config.speed_step;
            let amplitude = config.amplitude;
            parallax.listeners.push(EventListener::new(window, "mousemove", move |event| {
                let Some(event) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                let (width, height) = viewport_size(&window_for_size);
                pointer.set((event.client_x() as f64 / width, event.client_y() as f64 / height));

                let artifacts = artifacts.clone();
                let pointer = pointer.clone();
                gate.request(move |_| {
                    let (mouse_x, mouse_y) = pointer.get();
                    for (index, artifact) in artifacts.iter().enumerate() {
                        let (x, y) =
                            parallax_offset(index, mouse_x, mouse_y, speed_step, amplitude);
                        let transform = format!("translate({}px, {}px)", x, y);
                        let _ = dom::set_style(artifact, "transform", &transform);
                    }
                });
            }));
        }

        for card in dom::query_all(document, ".service-card")? {
            parallax.listeners.push(pointer_glow(card));
        }
        Ok(parallax)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Drop for Parallax {
    fn drop(&mut self) {
        self.gate.cancel();
    }
}

fn viewport_size(window: &Window) -> (f64, f64) {
    let extent = |value: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(1.0).max(1.0)
    };
    (extent(window.inner_width()), extent(window.inner_height()))
}

fn pointer_glow(card: Element) -> EventListener {
    let target = card.clone();
    EventListener::new(&target, "mouseenter", move |event| {
        let Some(event) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        let rect = card.get_bounding_client_rect();
        let x = event.client_x() as f64 - rect.left();
        let y = event.client_y() as f64 - rect.top();
        let _ = dom::set_style(&card, "--mouse-x", &format!("{}px", x));
        let _ = dom::set_style(&card, "--mouse-y", &format!("{}px", y));
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_pointer_does_not_move_anything() {
        for index in 0..5 {
            assert_eq!(parallax_offset(index, 0.5, 0.5, 0.02, 100.0), (0.0, 0.0));
        }
    }

    #[test]
    fn deeper_artifacts_move_further() {
        let (x0, y0) = parallax_offset(0, 1.0, 0.0, 0.02, 100.0);
        let (x2, y2) = parallax_offset(2, 1.0, 0.0, 0.02, 100.0);
        assert!((x0 - 1.0).abs() < 1e-9);
        assert!((y0 + 1.0).abs() < 1e-9);
        assert!((x2 - 3.0).abs() < 1e-9);
        assert!((y2 + 3.0).abs() < 1e-9);
    }

    #[test]
    fn opposite_corners_mirror() {
        let (ax, ay) = parallax_offset(1, 0.1, 0.9, 0.02, 100.0);
        let (bx, by) = parallax_offset(1, 0.9, 0.1, 0.02, 100.0);
        assert!((ax + bx).abs() < 1e-9);
        assert!((ay + by).abs() < 1e-9);
    }
}
