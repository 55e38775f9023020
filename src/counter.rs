use std::cell::RefCell;
use std::rc::Rc;

use gloo_render::{request_animation_frame, AnimationFrame};
use log::debug;
use serde::Deserialize;
use web_sys::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    EaseOutQuad,
    EaseOutCubic,
}

impl Easing {
    /// Maps progress in `[0, 1]` onto `[0, 1]`, monotone non-decreasing.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterAnimation {
    pub target: u64,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl CounterAnimation {
    pub fn value_at(&self, elapsed_ms: f64) -> u64 {
        if self.duration_ms <= 0.0 || elapsed_ms >= self.duration_ms {
            return self.target;
        }
        let progress = self.easing.apply(elapsed_ms.max(0.0) / self.duration_ms);
        ((self.target as f64 * progress).floor() as u64).min(self.target)
    }

    pub fn is_finished(&self, elapsed_ms: f64) -> bool {
        self.duration_ms <= 0.0 || elapsed_ms >= self.duration_ms
    }
}

/// A stat label split into its leading number and whatever follows it,
/// e.g. `"50+"` or `"98%"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatText {
    pub value: u64,
    pub suffix: String,
}

impl StatText {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let digits = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
        if digits == 0 {
            return None;
        }
        let value = text[..digits].parse().ok()?;
        Some(Self {
            value,
            suffix: text[digits..].to_string(),
        })
    }

    /// Parses `text` only when its suffix is one of `suffixes`, so labels
    /// such as `"24/7"` are never treated as counts.
    pub fn parse_countable(text: &str, suffixes: &[String]) -> Option<Self> {
        let stat = Self::parse(text)?;
        suffixes
            .iter()
            .any(|suffix| *suffix == stat.suffix)
            .then_some(stat)
    }

    pub fn render(&self, value: u64) -> String {
        format!("{}{}", value, self.suffix)
    }
}

struct CounterState {
    element: Element,
    stat: StatText,
    animation: CounterAnimation,
    started_at: Option<f64>,
    frame: Option<AnimationFrame>,
}

/// Drives one stat element from zero to its value, one step per frame.
/// The pending frame keeps the run alive until its last step or `cancel`.
#[derive(Clone)]
pub struct CounterRun {
    state: Rc<RefCell<CounterState>>,
}

impl CounterRun {
    /// Starts counting if the element's text is a number followed by one of
    /// `suffixes`.
    pub fn start(
        element: Element,
        suffixes: &[String],
        duration_ms: f64,
        easing: Easing,
    ) -> Option<Self> {
        let text = element.text_content().unwrap_or_default();
        let stat = StatText::parse_countable(&text, suffixes)?;
        let animation = CounterAnimation {
            target: stat.value,
            duration_ms,
            easing,
        };
        element.set_text_content(Some(&stat.render(0)));
        let run = Self {
            state: Rc::new(RefCell::new(CounterState {
                element,
                stat,
                animation,
                started_at: None,
                frame: None,
            })),
        };
        run.schedule();
        Some(run)
    }

    fn schedule(&self) {
        let run = self.clone();
        let frame = request_animation_frame(move |timestamp| run.step(timestamp));
        self.state.borrow_mut().frame = Some(frame);
    }

    fn step(&self, timestamp: f64) {
        let finished = {
            let mut state = self.state.borrow_mut();
            state.frame = None;
            let started_at = *state.started_at.get_or_insert(timestamp);
            let elapsed = timestamp - started_at;
            let value = state.animation.value_at(elapsed);
            state.element.set_text_content(Some(&state.stat.render(value)));
            state.animation.is_finished(elapsed)
        };
        if finished {
            debug!("Counter reached {}", self.state.borrow().animation.target);
        } else {
            self.schedule();
        }
    }

    pub fn cancel(&self) {
        self.state.borrow_mut().frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 3] = [Easing::Linear, Easing::EaseOutQuad, Easing::EaseOutCubic];

    #[test]
    fn reaches_target_exactly_at_duration() {
        for easing in ALL {
            let counter = CounterAnimation { target: 250, duration_ms: 1500.0, easing };
            assert_eq!(counter.value_at(0.0), 0);
            assert_eq!(counter.value_at(1500.0), 250);
            assert_eq!(counter.value_at(9000.0), 250);
            assert!(counter.is_finished(1500.0));
            assert!(!counter.is_finished(1499.0));
        }
    }

    #[test]
    fn never_decreases() {
        for easing in ALL {
            let counter = CounterAnimation { target: 1234, duration_ms: 2000.0, easing };
            let mut last = 0;
            for frame in 0..=130 {
                let value = counter.value_at(frame as f64 * 16.0);
                assert!(value >= last, "{:?} dropped at frame {}", easing, frame);
                assert!(value <= 1234);
                last = value;
            }
            assert_eq!(last, 1234);
        }
    }

    #[test]
    fn linear_midpoint_is_half() {
        let counter = CounterAnimation { target: 100, duration_ms: 1000.0, easing: Easing::Linear };
        assert_eq!(counter.value_at(500.0), 50);
    }

    #[test]
    fn eased_counters_run_ahead_of_linear() {
        let linear = CounterAnimation { target: 100, duration_ms: 1000.0, easing: Easing::Linear };
        let quad = CounterAnimation { easing: Easing::EaseOutQuad, ..linear };
        let cubic = CounterAnimation { easing: Easing::EaseOutCubic, ..linear };
        assert!(quad.value_at(300.0) > linear.value_at(300.0));
        assert!(cubic.value_at(300.0) > quad.value_at(300.0));
    }

    #[test]
    fn zero_duration_jumps_to_target() {
        let counter = CounterAnimation { target: 9, duration_ms: 0.0, easing: Easing::Linear };
        assert_eq!(counter.value_at(0.0), 9);
    }

    #[test]
    fn parses_stat_labels() {
        assert_eq!(StatText::parse("50+"), Some(StatText { value: 50, suffix: "+".to_string() }));
        assert_eq!(StatText::parse(" 98% "), Some(StatText { value: 98, suffix: "%".to_string() }));
        assert_eq!(StatText::parse("12").unwrap().render(3), "3");
        assert_eq!(StatText::parse("+50"), None);
        assert_eq!(StatText::parse(""), None);
    }

    #[test]
    fn only_configured_suffixes_count() {
        let plus = vec!["+".to_string()];
        assert_eq!(StatText::parse_countable("50+", &plus).map(|s| s.value), Some(50));
        assert_eq!(StatText::parse_countable("24/7", &plus), None);
        assert_eq!(StatText::parse_countable("98%", &plus), None);
        assert_eq!(StatText::parse_countable("12", &plus), None);

        let percent = vec!["+".to_string(), "%".to_string()];
        assert_eq!(StatText::parse_countable("98%", &percent).map(|s| s.value), Some(98));
    }
}
