use log::warn;
use serde::Deserialize;
use web_sys::Document;

use crate::counter::Easing;
use crate::error::SiteError;

/// Id of the optional inline `<script type="application/json">` block that
/// overrides the defaults below.
pub const CONFIG_ELEMENT_ID: &str = "site-config";

#[cfg(debug_assertions)]
pub fn get_sheet_url() -> &'static str {
    "" // Sheet logging disabled when running locally
}

#[cfg(not(debug_assertions))]
pub fn get_sheet_url() -> &'static str {
    "https://script.google.com/macros/s/AKfycbwtuk7HnOBAnEBj10aAHFsC7neuFKDgyExzjdO-fsX3pVdpPXOioVkLu_djHY6YE7aOkg/exec"
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub navbar_scroll_threshold: f64,
    pub anchor_offset: f64,
    pub active_section_offset: f64,
    pub reveal_scopes: Vec<RevealScope>,
    pub counter: CounterConfig,
    pub parallax: ParallaxConfig,
    pub contact: ContactConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            navbar_scroll_threshold: 50.0,
            anchor_offset: 80.0,
            active_section_offset: 100.0,
            reveal_scopes: vec![
                RevealScope {
                    name: "fade".to_string(),
                    selector: ".service-card, .solution-item, .process-step, .tech-item"
                        .to_string(),
                    threshold: 0.1,
                    root_margin: "0px".to_string(),
                    initial_class: Some("fade-in".to_string()),
                    visible_class: "visible".to_string(),
                    stagger_secs: 0.1,
                },
                RevealScope {
                    name: "reveal".to_string(),
                    selector: ".reveal".to_string(),
                    threshold: 0.15,
                    root_margin: "0px 0px -50px 0px".to_string(),
                    initial_class: None,
                    visible_class: "visible".to_string(),
                    stagger_secs: 0.0,
                },
            ],
            counter: CounterConfig::default(),
            parallax: ParallaxConfig::default(),
            contact: ContactConfig::default(),
        }
    }
}

/// One independently configured reveal observer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RevealScope {
    pub name: String,
    pub selector: String,
    pub threshold: f64,
    pub root_margin: String,
    pub initial_class: Option<String>,
    pub visible_class: String,
    pub stagger_secs: f64,
}

impl Default for RevealScope {
    fn default() -> Self {
        Self {
            name: "reveal".to_string(),
            selector: ".reveal".to_string(),
            threshold: 0.1,
            root_margin: "0px".to_string(),
            initial_class: None,
            visible_class: "visible".to_string(),
            stagger_secs: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub section_selector: String,
    pub number_selector: String,
    pub threshold: f64,
    pub duration_ms: f64,
    pub easing: Easing,
    /// Stat suffixes that mark a label as a count, e.g. `"50+"`. Labels with
    /// any other suffix are left as written.
    pub animated_suffixes: Vec<String>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            section_selector: ".hero-stats".to_string(),
            number_selector: ".stat-number".to_string(),
            threshold: 0.5,
            duration_ms: 1500.0,
            easing: Easing::Linear,
            animated_suffixes: vec!["+".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParallaxConfig {
    pub selector: String,
    pub speed_step: f64,
    pub amplitude: f64,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            selector: ".artifact".to_string(),
            speed_step: 0.02,
            amplitude: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SheetTransport {
    /// `POST` with a JSON body in `no-cors` mode.
    Json,
    /// `GET` through an image request with the fields as query parameters.
    Image,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    pub recipient: String,
    pub subject: String,
    pub fallback_body: String,
    pub sheet_url: String,
    pub sheet_transport: SheetTransport,
    pub collect_email: bool,
    pub collect_phone: bool,
    pub success_message: Option<String>,
    pub success_dismiss_ms: u32,
    pub redirect_delay_ms: u32,
    pub direct_email_label: Option<String>,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            recipient: "hello@ephemeral.ai".to_string(),
            subject: "Ephemeral.ai - Project Inquiry".to_string(),
            fallback_body: "I would like to discuss a project with you.".to_string(),
            sheet_url: get_sheet_url().to_string(),
            sheet_transport: SheetTransport::Json,
            collect_email: true,
            collect_phone: true,
            success_message: Some(
                "Thanks! Your email app is opening with the details filled in.".to_string(),
            ),
            success_dismiss_ms: 5000,
            redirect_delay_ms: 400,
            direct_email_label: Some("Email us directly".to_string()),
        }
    }
}

impl SiteConfig {
    pub fn from_json(raw: &str) -> Result<Self, SiteError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads the inline config block, falling back to defaults when it is
    /// absent or malformed.
    pub fn load(document: &Document) -> Self {
        let Some(element) = document.get_element_by_id(CONFIG_ELEMENT_ID) else {
            return Self::default();
        };
        let raw = element.text_content().unwrap_or_default();
        if raw.trim().is_empty() {
            return Self::default();
        }
        match Self::from_json(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring #{}: {}", CONFIG_ELEMENT_ID, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_page() {
        let config = SiteConfig::default();
        assert_eq!(config.navbar_scroll_threshold, 50.0);
        assert_eq!(config.anchor_offset, 80.0);
        assert_eq!(config.reveal_scopes.len(), 2);
        assert_eq!(config.reveal_scopes[0].initial_class.as_deref(), Some("fade-in"));
        assert_eq!(config.counter.threshold, 0.5);
        assert_eq!(config.counter.animated_suffixes, vec!["+".to_string()]);
        assert_eq!(config.contact.sheet_transport, SheetTransport::Json);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = SiteConfig::from_json(
            r#"{
                "anchor_offset": 64,
                "counter": {"easing": "ease-out-cubic"},
                "contact": {"sheet_transport": "image", "collect_phone": false}
            }"#,
        )
        .unwrap();
        assert_eq!(config.anchor_offset, 64.0);
        assert_eq!(config.navbar_scroll_threshold, 50.0);
        assert_eq!(config.counter.easing, Easing::EaseOutCubic);
        assert_eq!(config.counter.duration_ms, 1500.0);
        assert_eq!(config.contact.sheet_transport, SheetTransport::Image);
        assert!(!config.contact.collect_phone);
        assert!(config.contact.collect_email);
    }

    #[test]
    fn reveal_scope_list_replaces_defaults() {
        let config = SiteConfig::from_json(
            r#"{"reveal_scopes": [{"name": "cards", "selector": ".card", "stagger_secs": 0.05}]}"#,
        )
        .unwrap();
        assert_eq!(config.reveal_scopes.len(), 1);
        let scope = &config.reveal_scopes[0];
        assert_eq!(scope.selector, ".card");
        assert_eq!(scope.threshold, 0.1);
        assert_eq!(scope.visible_class, "visible");
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = SiteConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SiteError::Config(_)));
    }
}
