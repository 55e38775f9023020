use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use log::{info, warn};
use web_sys::{HtmlInputElement, HtmlTextAreaElement, MouseEvent};
use yew::prelude::*;

use crate::config::ContactConfig;
use crate::contact::{now_timestamp, ContactError, ContactFields, ContactSubmission, SheetSink};
use crate::dom;

const DEFAULT_HINT: &str = "Email or phone, whichever you prefer.";

#[derive(Properties, PartialEq)]
pub struct ContactFormProps {
    pub config: ContactConfig,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FormStatus {
    Idle,
    Invalid,
    Sent,
}

#[derive(Clone, Default, PartialEq)]
struct Draft {
    name: String,
    company: String,
    email: String,
    phone: String,
    message: String,
}

impl Draft {
    fn submission(&self) -> ContactSubmission {
        ContactSubmission::new(&self.name, &self.company, &self.email, &self.phone, &self.message)
    }
}

fn open_mail_draft(uri: &str) {
    match dom::window() {
        Ok(window) => {
            if let Err(e) = window.location().set_href(uri) {
                warn!("Could not open email draft: {:?}", e);
            }
        }
        Err(e) => warn!("Could not open email draft: {}", e),
    }
}

fn on_input(
    draft: &UseStateHandle<Draft>,
    status: &UseStateHandle<FormStatus>,
    apply: fn(&mut Draft, String),
    clears_error: bool,
) -> Callback<InputEvent> {
    let draft = draft.clone();
    let status = status.clone();
    Callback::from(move |e: InputEvent| {
        let value = e
            .target_dyn_into::<HtmlInputElement>()
            .map(|input| input.value())
            .or_else(|| e.target_dyn_into::<HtmlTextAreaElement>().map(|area| area.value()))
            .unwrap_or_default();
        let mut next = (*draft).clone();
        apply(&mut next, value);
        draft.set(next);
        if clears_error && *status == FormStatus::Invalid {
            status.set(FormStatus::Idle);
        }
    })
}

#[function_component(ContactForm)]
pub fn contact_form(props: &ContactFormProps) -> Html {
    let config = &props.config;
    let draft = use_state(Draft::default);
    let status = use_state(|| FormStatus::Idle);
    let dismiss = use_mut_ref(|| None::<Timeout>);

    let send = {
        let config = config.clone();
        let draft = draft.clone();
        let status = status.clone();
        let dismiss: Rc<RefCell<Option<Timeout>>> = dismiss.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            let submission = draft.submission();
            if let Err(err) = submission.validate(ContactFields::from(&config)) {
                info!("Contact form rejected: {}", err);
                status.set(FormStatus::Invalid);
                return;
            }

            info!("Contact form submitted");
            if let Some(sink) = SheetSink::from_config(&config) {
                sink.log(submission.sheet_record(now_timestamp()));
            }

            if config.success_message.is_some() {
                status.set(FormStatus::Sent);
                let status = status.clone();
                // Replacing the handle cancels an earlier dismissal.
                *dismiss.borrow_mut() = Some(Timeout::new(config.success_dismiss_ms, move || {
                    status.set(FormStatus::Idle);
                }));
            } else {
                status.set(FormStatus::Idle);
            }

            let uri = submission.mailto_uri(&config);
            Timeout::new(config.redirect_delay_ms, move || open_mail_draft(&uri)).forget();
        })
    };

    let direct = {
        let config = config.clone();
        let draft = draft.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            open_mail_draft(&draft.submission().mailto_uri(&config));
        })
    };

    let invalid = *status == FormStatus::Invalid;
    let hint = if invalid {
        ContactError::MissingReachability.to_string()
    } else {
        DEFAULT_HINT.to_string()
    };

    let group_class = classes!("form-group", invalid.then(|| "error"));
    let input_class = classes!(invalid.then(|| "input-error"));
    let hint_class = classes!("form-hint", invalid.then(|| "error-hint"));

    html! {
        <div class="contact-form">
            <div class="form-group">
                <label for="name">{"Name"}</label>
                <input id="name" type="text" value={draft.name.clone()}
                    oninput={on_input(&draft, &status, |d, v| d.name = v, false)} />
            </div>
            <div class="form-group">
                <label for="company">{"Company"}</label>
                <input id="company" type="text" value={draft.company.clone()}
                    oninput={on_input(&draft, &status, |d, v| d.company = v, false)} />
            </div>
            if config.collect_email {
                <div class={group_class.clone()}>
                    <label for="email">{"Email"}</label>
                    <input id="email" type="email" class={input_class.clone()}
                        value={draft.email.clone()}
                        oninput={on_input(&draft, &status, |d, v| d.email = v, true)} />
                    <small class={hint_class.clone()}>{hint.clone()}</small>
                </div>
            }
            if config.collect_phone {
                <div class={group_class.clone()}>
                    <label for="phone">{"Phone"}</label>
                    <input id="phone" type="tel" class={input_class.clone()}
                        value={draft.phone.clone()}
                        oninput={on_input(&draft, &status, |d, v| d.phone = v, true)} />
                    <small class={hint_class.clone()}>{hint.clone()}</small>
                </div>
            }
            <div class="form-group">
                <label for="message">{"Message"}</label>
                <textarea id="message" rows="5" value={draft.message.clone()}
                    oninput={on_input(&draft, &status, |d, v| d.message = v, false)} />
            </div>
            <div class="form-actions">
                <button id="sendEmailBtn" type="button" class="btn btn-primary" onclick={send}>
                    {"Send Message"}
                </button>
                if let Some(label) = &config.direct_email_label {
                    <button type="button" class="btn btn-secondary" onclick={direct}>
                        {label.clone()}
                    </button>
                }
            </div>
            if let (FormStatus::Sent, Some(message)) = (*status, &config.success_message) {
                <div class="success-message">{message.clone()}</div>
            }
        </div>
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use gloo_timers::future::TimeoutFuture;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;
    use web_sys::{Element, HtmlElement};

    use super::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn find(host: &Element, selector: &str) -> Element {
        host.query_selector(selector).unwrap().unwrap()
    }

    #[wasm_bindgen_test]
    async fn send_without_email_or_phone_marks_fields() {
        let window = dom::window().unwrap();
        let document = dom::document().unwrap();
        let host = document.create_element("div").unwrap();
        document.body().unwrap().append_child(&host).unwrap();
        let before = window.location().href().unwrap();

        let config = ContactConfig {
            sheet_url: String::new(),
            redirect_delay_ms: 20,
            success_message: Some("Sent".to_string()),
            ..ContactConfig::default()
        };
        let app = yew::Renderer::<ContactForm>::with_root_and_props(
            host.clone(),
            ContactFormProps { config },
        )
        .render();
        TimeoutFuture::new(50).await;

        let send = find(&host, "#sendEmailBtn").dyn_into::<HtmlElement>().unwrap();
        send.click();
        TimeoutFuture::new(100).await;

        for field in ["#email", "#phone"] {
            let input = find(&host, field);
            assert!(input.class_list().contains("input-error"), "{}", field);
            let group = input.parent_element().unwrap();
            assert!(group.class_list().contains("error"), "{}", field);
            let hint = group.query_selector(".form-hint").unwrap().unwrap();
            assert!(hint.class_list().contains("error-hint"));
            assert_eq!(
                hint.text_content().unwrap_or_default(),
                ContactError::MissingReachability.to_string()
            );
        }
        assert!(host.query_selector(".success-message").unwrap().is_none());
        assert_eq!(window.location().href().unwrap(), before);

        app.destroy();
        host.remove();
    }
}
