use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use log::{info, warn};
use web_sys::{Document, Element, Window};

use crate::config::{CounterConfig, RevealScope, SiteConfig};
use crate::counter::CounterRun;
use crate::dom;
use crate::nav::Navigation;
use crate::parallax::Parallax;
use crate::reveal::{RevealController, RevealHook};

const REVEAL_GROUP: &str = "reveal";
const COUNTER_GROUP: &str = "counter";

/// Everything the page does in response to the user. Owns every listener,
/// observer and animation it starts; dropping it tears them all down.
pub struct Site {
    navigation: Option<Navigation>,
    reveals: Vec<RevealController>,
    stats: Option<RevealController>,
    counter_runs: Rc<RefCell<Vec<CounterRun>>>,
    parallax: Option<Parallax>,
    load_listener: Option<EventListener>,
}

impl Site {
    pub fn attach(window: &Window, document: &Document, config: &SiteConfig) -> Self {
        let navigation = Navigation::attach(window, document, config)
            .map_err(|e| warn!("Navigation disabled: {}", e))
            .ok();

        let reveals: Vec<RevealController> = config
            .reveal_scopes
            .iter()
            .filter_map(|scope| {
                RevealController::attach(document, scope, REVEAL_GROUP, None)
                    .map_err(|e| warn!("Reveal scope '{}' disabled: {}", scope.name, e))
                    .ok()
            })
            .collect();

        let counter_runs = Rc::new(RefCell::new(Vec::new()));
        let stats = RevealController::attach(
            document,
            &stats_scope(&config.counter),
            COUNTER_GROUP,
            Some(start_counters(&config.counter, counter_runs.clone())),
        )
        .map_err(|e| warn!("Stat counters disabled: {}", e))
        .ok();

        let parallax = Parallax::attach(window, document, &config.parallax)
            .map_err(|e| warn!("Parallax disabled: {}", e))
            .ok();

        let load_listener = mark_loaded(window, document);

        let site = Self {
            navigation,
            reveals,
            stats,
            counter_runs,
            parallax,
            load_listener,
        };
        info!(
            "Site attached: {} reveal scopes, {} elements pending, {} listeners",
            site.reveals.len(),
            site.pending_reveals(),
            site.listener_count()
        );
        site
    }

    pub fn listener_count(&self) -> usize {
        self.navigation.as_ref().map_or(0, Navigation::listener_count)
            + self.parallax.as_ref().map_or(0, Parallax::listener_count)
            + usize::from(self.load_listener.is_some())
    }

    /// Elements still waiting to be revealed, across every scope.
    pub fn pending_reveals(&self) -> usize {
        self.reveals.iter().map(RevealController::pending).sum::<usize>()
            + self.stats.as_ref().map_or(0, RevealController::pending)
    }

    /// Keeps the site wired up until the page unloads.
    pub fn keep_alive(self) {
        std::mem::forget(self);
    }
}

impl Drop for Site {
    fn drop(&mut self) {
        for run in self.counter_runs.borrow().iter() {
            run.cancel();
        }
    }
}

fn stats_scope(config: &CounterConfig) -> RevealScope {
    RevealScope {
        name: "stats".to_string(),
        selector: config.section_selector.clone(),
        threshold: config.threshold,
        root_margin: "0px".to_string(),
        initial_class: None,
        visible_class: "counted".to_string(),
        stagger_secs: 0.0,
    }
}

fn start_counters(config: &CounterConfig, runs: Rc<RefCell<Vec<CounterRun>>>) -> RevealHook {
    let number_selector = config.number_selector.clone();
    let suffixes = config.animated_suffixes.clone();
    let duration_ms = config.duration_ms;
    let easing = config.easing;
    Rc::new(move |section: &Element| {
        let stats = match dom::query_all_within(section, &number_selector) {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Stat counters skipped: {}", e);
                return;
            }
        };
        let mut runs = runs.borrow_mut();
        runs.extend(
            stats
                .into_iter()
                .filter_map(|stat| CounterRun::start(stat, &suffixes, duration_ms, easing)),
        );
    })
}

/// Adds `loaded` to `<body>` once the window has loaded.
fn mark_loaded(window: &Window, document: &Document) -> Option<EventListener> {
    let Some(body) = document.body() else {
        warn!("Document has no body");
        return None;
    };
    if document.ready_state() == "complete" {
        let _ = body.class_list().add_1("loaded");
        return None;
    }
    Some(EventListener::once(window, "load", move |_| {
        let _ = body.class_list().add_1("loaded");
    }))
}
