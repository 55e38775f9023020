//! Reveal-on-scroll.
//!
//! Elements move from hidden to revealed exactly once, the first time the
//! browser reports them intersecting the viewport at or above the scope's
//! threshold. After that they are unobserved and cost nothing.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use js_sys::Array;
use log::{debug, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit,
};

use crate::config::RevealScope;
use crate::dom;
use crate::error::SiteError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealTicket {
    pub id: usize,
    pub delay_secs: f64,
}

/// One entry of an intersection batch, keyed by registry id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionRecord {
    pub id: usize,
    pub ratio: f64,
    pub is_intersecting: bool,
}

/// Registration order, stagger and the pending set. Only ever shrinks after
/// registration finishes.
#[derive(Debug, Clone)]
pub struct RevealRegistry {
    threshold: f64,
    stagger_secs: f64,
    next_id: usize,
    pending: BTreeSet<usize>,
}

impl RevealRegistry {
    pub fn new(threshold: f64, stagger_secs: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            stagger_secs: stagger_secs.max(0.0),
            next_id: 0,
            pending: BTreeSet::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn register(&mut self) -> RevealTicket {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id);
        RevealTicket {
            id,
            delay_secs: id as f64 * self.stagger_secs,
        }
    }

    /// Returns the ids revealed by this batch, in batch order. Records for ids
    /// that are unknown or already revealed are ignored.
    pub fn process(&mut self, batch: &[IntersectionRecord]) -> Vec<usize> {
        batch
            .iter()
            .filter(|record| record.is_intersecting && record.ratio >= self.threshold)
            .filter_map(|record| self.pending.remove(&record.id).then_some(record.id))
            .collect()
    }

    #[cfg(test)]
    pub fn is_pending(&self, id: usize) -> bool {
        self.pending.contains(&id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

pub type RevealHook = Rc<dyn Fn(&Element)>;

type ObserverCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

/// Attribute recording which scope of a claim group owns an element.
fn claim_attr(group: &str) -> String {
    format!("data-{}-scope", group)
}

/// Watches one scope's elements through an `IntersectionObserver`.
///
/// Elements already claimed by an earlier controller of the same group are
/// skipped, so every element has at most one registry membership per group.
/// Dropping the controller disconnects the observer.
pub struct RevealController {
    observer: IntersectionObserver,
    registry: Rc<RefCell<RevealRegistry>>,
    _callback: ObserverCallback,
}

impl RevealController {
    pub fn attach(
        document: &Document,
        scope: &RevealScope,
        group: &str,
        on_reveal: Option<RevealHook>,
    ) -> Result<Self, SiteError> {
        let attr = claim_attr(group);
        let mut registry = RevealRegistry::new(scope.threshold, scope.stagger_secs);
        let mut elements = Vec::new();

        for element in dom::query_all(document, &scope.selector)? {
            if element.has_attribute(&attr) {
                continue;
            }
            element.set_attribute(&attr, &scope.name)?;
            let ticket = registry.register();
            if let Some(class) = &scope.initial_class {
                element.class_list().add_1(class)?;
            }
            if ticket.delay_secs > 0.0 {
                dom::set_style(&element, "transition-delay", &format!("{}s", ticket.delay_secs))?;
            }
            elements.push(element);
        }

        let registry = Rc::new(RefCell::new(registry));
        let callback = {
            let registry = registry.clone();
            let elements = elements.clone();
            let visible_class = scope.visible_class.clone();
            let scope_name = scope.name.clone();
            Closure::wrap(Box::new(move |entries: Array, observer: IntersectionObserver| {
                let batch: Vec<IntersectionRecord> = entries
                    .iter()
                    .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                    .filter_map(|entry| {
                        let target = entry.target();
                        let id = elements.iter().position(|el| el == &target)?;
                        Some(IntersectionRecord {
                            id,
                            ratio: entry.intersection_ratio(),
                            is_intersecting: entry.is_intersecting(),
                        })
                    })
                    .collect();

                let revealed = registry.borrow_mut().process(&batch);
                for id in revealed {
                    let element = &elements[id];
                    let _ = element.class_list().add_1(&visible_class);
                    observer.unobserve(element);
                    debug!("Revealed {} #{}", scope_name, id);
                    if let Some(hook) = &on_reveal {
                        hook(element);
                    }
                }
            }) as Box<dyn FnMut(Array, IntersectionObserver)>)
        };

        let options = IntersectionObserverInit::new();
        options.set_threshold(&JsValue::from_f64(registry.borrow().threshold()));
        options.set_root_margin(&scope.root_margin);
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)?;
        for element in &elements {
            observer.observe(element);
        }

        info!("Reveal scope '{}' watching {} elements", scope.name, elements.len());
        Ok(Self {
            observer,
            registry,
            _callback: callback,
        })
    }

    pub fn pending(&self) -> usize {
        self.registry.borrow().pending_len()
    }
}

impl Drop for RevealController {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(id: usize, ratio: f64) -> IntersectionRecord {
        IntersectionRecord { id, ratio, is_intersecting: ratio > 0.0 }
    }

    #[test]
    fn reveals_only_at_or_above_threshold() {
        let mut registry = RevealRegistry::new(0.5, 0.0);
        let a = registry.register();
        let b = registry.register();

        assert!(registry.process(&[seen(a.id, 0.2), seen(b.id, 0.49)]).is_empty());
        assert_eq!(registry.pending_len(), 2);

        assert_eq!(registry.process(&[seen(a.id, 0.5), seen(b.id, 0.3)]), vec![a.id]);
        assert!(!registry.is_pending(a.id));
        assert!(registry.is_pending(b.id));
    }

    #[test]
    fn repeated_records_reveal_once() {
        let mut registry = RevealRegistry::new(0.1, 0.0);
        let a = registry.register();

        assert_eq!(registry.process(&[seen(a.id, 1.0), seen(a.id, 1.0)]), vec![a.id]);
        assert!(registry.process(&[seen(a.id, 1.0)]).is_empty());
        assert_eq!(registry.pending_len(), 0);
    }

    #[test]
    fn non_intersecting_record_never_reveals() {
        let mut registry = RevealRegistry::new(0.0, 0.0);
        let a = registry.register();
        let record = IntersectionRecord { id: a.id, ratio: 0.0, is_intersecting: false };

        assert!(registry.process(&[record]).is_empty());
        assert!(registry.is_pending(a.id));
    }

    #[test]
    fn unknown_ids_and_empty_batches_are_ignored() {
        let mut registry = RevealRegistry::new(0.1, 0.0);
        registry.register();

        assert!(registry.process(&[]).is_empty());
        assert!(registry.process(&[seen(7, 1.0)]).is_empty());
        assert_eq!(registry.pending_len(), 1);
    }

    #[test]
    fn batch_order_does_not_matter() {
        let mut forward = RevealRegistry::new(0.1, 0.0);
        let mut backward = RevealRegistry::new(0.1, 0.0);
        let ids: Vec<usize> = (0..4)
            .map(|_| {
                backward.register();
                forward.register().id
            })
            .collect();
        let batch: Vec<_> = ids.iter().map(|&id| seen(id, 0.3)).collect();
        let reversed: Vec<_> = batch.iter().rev().copied().collect();

        let mut a = forward.process(&batch);
        let mut b = backward.process(&reversed);
        a.sort();
        b.sort();
        assert_eq!(a, b);
        assert_eq!(forward.pending_len(), 0);
        assert_eq!(backward.pending_len(), 0);
    }

    #[test]
    fn stagger_delay_grows_with_registration_order() {
        let mut registry = RevealRegistry::new(0.1, 0.1);
        let delays: Vec<f64> = (0..6).map(|_| registry.register().delay_secs).collect();

        assert_eq!(delays[0], 0.0);
        assert!((delays[3] - 0.3).abs() < 1e-9);
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(RevealRegistry::new(1.7, 0.0).threshold(), 1.0);
        assert_eq!(RevealRegistry::new(-0.2, 0.0).threshold(), 0.0);
    }
}
