use chrono::{SecondsFormat, Utc};
use gloo_net::http::Request;
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlImageElement, RequestMode};

use crate::config::{ContactConfig, SheetTransport};
use crate::error::SiteError;

/// Which optional reachability fields the form collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactFields {
    pub email: bool,
    pub phone: bool,
}

impl From<&ContactConfig> for ContactFields {
    fn from(config: &ContactConfig) -> Self {
        Self {
            email: config.collect_email,
            phone: config.collect_phone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("Please enter your email or phone number so we can reach you.")]
    MissingReachability,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl ContactSubmission {
    pub fn new(name: &str, company: &str, email: &str, phone: &str, message: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            company: company.trim().to_string(),
            email: email.trim().to_string(),
            phone: phone.trim().to_string(),
            message: message.trim().to_string(),
        }
    }

    /// At least one of email or phone is required whenever the form asks
    /// for either.
    pub fn validate(&self, fields: ContactFields) -> Result<(), ContactError> {
        if !fields.email && !fields.phone {
            return Ok(());
        }
        let has_email = fields.email && !self.email.is_empty();
        let has_phone = fields.phone && !self.phone.is_empty();
        if has_email || has_phone {
            Ok(())
        } else {
            Err(ContactError::MissingReachability)
        }
    }

    pub fn mail_body(&self, fallback: &str) -> String {
        let mut body = String::new();
        let labelled = [
            ("Name", &self.name),
            ("Company", &self.company),
            ("Email", &self.email),
            ("Phone", &self.phone),
        ];
        let mut any = false;
        for (label, value) in labelled {
            if !value.is_empty() {
                body.push_str(&format!("{}: {}\n", label, value));
                any = true;
            }
        }
        if any {
            body.push('\n');
        }
        if self.message.is_empty() {
            body.push_str(fallback);
        } else {
            body.push_str(&self.message);
        }
        body
    }

    pub fn mailto_uri(&self, config: &ContactConfig) -> String {
        format!(
            "mailto:{}?subject={}&body={}",
            config.recipient,
            urlencoding::encode(&config.subject),
            urlencoding::encode(&self.mail_body(&config.fallback_body)),
        )
    }

    pub fn sheet_record(&self, timestamp: String) -> SheetRecord {
        fn or(value: &str, fallback: &str) -> String {
            if value.is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        }
        SheetRecord {
            name: or(&self.name, "Not provided"),
            company: or(&self.company, "Not provided"),
            email: or(&self.email, "Not provided"),
            phone: or(&self.phone, "Not provided"),
            message: or(&self.message, "No message"),
            timestamp,
        }
    }
}

/// Row appended to the spreadsheet log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRecord {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub timestamp: String,
}

impl SheetRecord {
    pub fn query_string(&self) -> String {
        [
            ("name", &self.name),
            ("company", &self.company),
            ("email", &self.email),
            ("phone", &self.phone),
            ("message", &self.message),
            ("timestamp", &self.timestamp),
        ]
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
    }
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Best-effort spreadsheet logging. Nothing waits on it and failures only
/// reach the console.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSink {
    url: String,
    transport: SheetTransport,
}

impl SheetSink {
    /// `None` when no endpoint is configured.
    pub fn from_config(config: &ContactConfig) -> Option<Self> {
        if config.sheet_url.trim().is_empty() {
            return None;
        }
        Some(Self {
            url: config.sheet_url.clone(),
            transport: config.sheet_transport,
        })
    }

    pub fn image_url(&self, record: &SheetRecord) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, record.query_string())
    }

    pub fn log(&self, record: SheetRecord) {
        match self.transport {
            SheetTransport::Json => {
                let url = self.url.clone();
                spawn_local(async move {
                    if let Err(e) = post_json(&url, &record).await {
                        warn!("Sheet logging failed: {}", e);
                    }
                });
            }
            SheetTransport::Image => {
                if let Err(e) = self.ping_image(&record) {
                    warn!("Sheet logging failed: {}", e);
                }
            }
        }
    }

    fn ping_image(&self, record: &SheetRecord) -> Result<(), SiteError> {
        let image = HtmlImageElement::new()?;
        image.set_src(&self.image_url(record));
        Ok(())
    }
}

async fn post_json(url: &str, record: &SheetRecord) -> Result<(), SiteError> {
    let response = Request::post(url)
        .mode(RequestMode::NoCors)
        .header("Content-Type", "application/json")
        .json(record)?
        .send()
        .await?;
    // Opaque in no-cors mode; the status is always 0.
    debug!("Sheet logging sent ({})", response.status());
    Ok(())
}
