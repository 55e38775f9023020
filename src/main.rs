use log::{info, Level};

mod config;
mod contact;
mod counter;
mod dom;
mod error;
mod nav;
mod parallax;
mod reveal;
mod site;

mod components {
    pub mod contact_form;
}

use components::contact_form::{ContactForm, ContactFormProps};
use config::SiteConfig;
use site::Site;

/// Host element for the contact form component.
const CONTACT_ROOT_ID: &str = "contact-form-root";

fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(Level::Info).expect("error initializing log");

    let (window, document) = match dom::window().and_then(|w| Ok((w, dom::document()?))) {
        Ok(pair) => pair,
        Err(e) => {
            gloo_console::error!(format!("Not running in a browser page: {}", e));
            return;
        }
    };

    let config = SiteConfig::load(&document);
    info!("Starting site interactions");

    Site::attach(&window, &document, &config).keep_alive();

    if let Some(host) = document.get_element_by_id(CONTACT_ROOT_ID) {
        yew::Renderer::<ContactForm>::with_root_and_props(
            host,
            ContactFormProps {
                config: config.contact.clone(),
            },
        )
        .render();
    }
}
