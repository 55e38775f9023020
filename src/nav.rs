use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use log::{debug, warn};
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlElement, KeyboardEvent, ScrollBehavior, ScrollToOptions, Window,
};

use crate::config::SiteConfig;
use crate::dom;
use crate::error::SiteError;

/// Vertical extent of a `section[id]` in document coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpan {
    pub id: String,
    pub top: f64,
    pub height: f64,
}

pub fn is_scrolled(scroll_y: f64, threshold: f64) -> bool {
    scroll_y > threshold
}

/// Id of the section spanning `scroll_y`, with every section pulled up by
/// `offset`. Later sections win when spans overlap.
pub fn active_section(sections: &[SectionSpan], scroll_y: f64, offset: f64) -> Option<&str> {
    sections
        .iter()
        .rev()
        .find(|section| {
            let top = section.top - offset;
            scroll_y >= top && scroll_y < top + section.height
        })
        .map(|section| section.id.as_str())
}

/// Element id an in-page link points at. A bare `#` points nowhere.
pub fn hash_target(href: &str) -> Option<&str> {
    href.strip_prefix('#').filter(|id| !id.is_empty())
}

pub fn anchor_scroll_top(target_top: f64, offset: f64) -> f64 {
    target_top - offset
}

pub struct MobileMenu {
    button: Element,
    links: Element,
}

impl MobileMenu {
    pub fn find(document: &Document) -> Result<Self, SiteError> {
        Ok(Self {
            button: dom::query_one(document, ".mobile-menu-btn")?,
            links: dom::query_one(document, ".nav-links")?,
        })
    }

    pub fn is_open(&self) -> bool {
        self.links.class_list().contains("active")
    }

    pub fn toggle(&self) {
        let _ = self.button.class_list().toggle("active");
        let _ = self.links.class_list().toggle("active");
    }

    pub fn close(&self) {
        let _ = self.button.class_list().remove_1("active");
        let _ = self.links.class_list().remove_1("active");
    }
}

/// Navbar state, in-page scrolling, the mobile menu and active-link
/// highlighting. Dropping it removes every listener.
pub struct Navigation {
    menu: Option<Rc<MobileMenu>>,
    listeners: Vec<EventListener>,
}

impl Navigation {
    pub fn attach(
        window: &Window,
        document: &Document,
        config: &SiteConfig,
    ) -> Result<Self, SiteError> {
        let menu = match MobileMenu::find(document) {
            Ok(menu) => Some(Rc::new(menu)),
            Err(e) => {
                debug!("Mobile menu disabled: {}", e);
                None
            }
        };
        let mut nav = Self { menu, listeners: Vec::new() };

        match dom::query_one(document, ".navbar") {
            Ok(navbar) => nav.watch_navbar(window, navbar, config.navbar_scroll_threshold),
            Err(e) => warn!("Navbar scroll state disabled: {}", e),
        }
        nav.watch_anchors(window, document, config.anchor_offset)?;
        nav.watch_menu(document);
        nav.watch_sections(window, document, config.active_section_offset)?;
        Ok(nav)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn watch_navbar(&mut self, window: &Window, navbar: Element, threshold: f64) {
        let update = {
            let window = window.clone();
            move || {
                let scrolled = is_scrolled(dom::scroll_y(&window), threshold);
                let _ = navbar.class_list().toggle_with_force("scrolled", scrolled);
            }
        };
        update();
        self.listeners.push(EventListener::new(window, "scroll", move |_| update()));
    }

    fn watch_anchors(
        &mut self,
        window: &Window,
        document: &Document,
        offset: f64,
    ) -> Result<(), SiteError> {
        for anchor in dom::query_all(document, "a[href^=\"#\"]")? {
            let window = window.clone();
            let document = document.clone();
            let menu = self.menu.clone();
            let href = anchor.get_attribute("href").unwrap_or_default();
            let options = EventListenerOptions::enable_prevent_default();
            let listener = EventListener::new_with_options(&anchor, "click", options, move |event| {
                event.prevent_default();
                let Some(target) = hash_target(&href)
                    .and_then(|id| document.get_element_by_id(id))
                    .and_then(|el| el.dyn_into::<HtmlElement>().ok())
                else {
                    return;
                };
                let options = ScrollToOptions::new();
                options.set_top(anchor_scroll_top(target.offset_top() as f64, offset));
                options.set_behavior(ScrollBehavior::Smooth);
                window.scroll_to_with_scroll_to_options(&options);
                if let Some(menu) = &menu {
                    menu.close();
                }
            });
            self.listeners.push(listener);
        }
        Ok(())
    }

    fn watch_menu(&mut self, document: &Document) {
        let Some(menu) = self.menu.clone() else {
            return;
        };
        {
            let menu = menu.clone();
            let button = menu.button.clone();
            self.listeners.push(EventListener::new(&button, "click", move |_| menu.toggle()));
        }
        self.listeners.push(EventListener::new(document, "keydown", move |event| {
            let escape = event
                .dyn_ref::<KeyboardEvent>()
                .map(|key| key.key() == "Escape")
                .unwrap_or(false);
            if escape && menu.is_open() {
                menu.close();
            }
        }));
    }

    fn watch_sections(
        &mut self,
        window: &Window,
        document: &Document,
        offset: f64,
    ) -> Result<(), SiteError> {
        let sections: Vec<HtmlElement> = dom::query_all(document, "section[id]")?
            .into_iter()
            .filter_map(|el| el.dyn_into::<HtmlElement>().ok())
            .collect();
        let links = dom::query_all(document, ".nav-links a")?;
        if sections.is_empty() || links.is_empty() {
            return Ok(());
        }

        let mut update = {
            let window = window.clone();
            let mut current: Option<String> = None;
            move || {
                let spans: Vec<SectionSpan> = sections
                    .iter()
                    .map(|section| SectionSpan {
                        id: section.id(),
                        top: section.offset_top() as f64,
                        height: section.offset_height() as f64,
                    })
                    .collect();
                let active =
                    active_section(&spans, dom::scroll_y(&window), offset).map(str::to_string);
                if active != current {
                    debug!("Active section: {:?}", active);
                }
                let wanted = active.as_ref().map(|id| format!("#{}", id));
                for link in &links {
                    let on = wanted.is_some() && link.get_attribute("href") == wanted;
                    let _ = link.class_list().toggle_with_force("active", on);
                }
                current = active;
            }
        };
        update();
        self.listeners.push(EventListener::new(window, "scroll", move |_| update()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans() -> Vec<SectionSpan> {
        vec![
            SectionSpan { id: "hero".to_string(), top: 0.0, height: 700.0 },
            SectionSpan { id: "services".to_string(), top: 700.0, height: 900.0 },
            SectionSpan { id: "contact".to_string(), top: 1600.0, height: 500.0 },
        ]
    }

    #[test]
    fn picks_section_under_offset_line() {
        let sections = spans();
        assert_eq!(active_section(&sections, 0.0, 100.0), Some("hero"));
        assert_eq!(active_section(&sections, 599.0, 100.0), Some("hero"));
        assert_eq!(active_section(&sections, 600.0, 100.0), Some("services"));
        assert_eq!(active_section(&sections, 1500.0, 100.0), Some("contact"));
    }

    #[test]
    fn none_past_last_section() {
        assert_eq!(active_section(&spans(), 2000.0, 100.0), None);
        assert_eq!(active_section(&[], 10.0, 100.0), None);
    }

    #[test]
    fn later_section_wins_on_overlap() {
        let sections = vec![
            SectionSpan { id: "outer".to_string(), top: 0.0, height: 1000.0 },
            SectionSpan { id: "inner".to_string(), top: 200.0, height: 100.0 },
        ];
        assert_eq!(active_section(&sections, 150.0, 0.0), Some("outer"));
        assert_eq!(active_section(&sections, 250.0, 0.0), Some("inner"));
    }

    #[test]
    fn navbar_scrolled_strictly_past_threshold() {
        assert!(!is_scrolled(50.0, 50.0));
        assert!(is_scrolled(50.5, 50.0));
        assert!(!is_scrolled(0.0, 50.0));
    }

    #[test]
    fn hash_targets() {
        assert_eq!(hash_target("#services"), Some("services"));
        assert_eq!(hash_target("#"), None);
        assert_eq!(hash_target("/about"), None);
        assert_eq!(anchor_scroll_top(900.0, 80.0), 820.0);
    }
}
