use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, NodeList, Window};

use crate::error::SiteError;

pub fn window() -> Result<Window, SiteError> {
    web_sys::window().ok_or(SiteError::NoWindow)
}

pub fn document() -> Result<Document, SiteError> {
    window()?.document().ok_or(SiteError::NoDocument)
}

fn elements(list: NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// All elements matching `selector`, in document order. An invalid selector
/// yields an error rather than an empty list.
pub fn query_all(root: &Document, selector: &str) -> Result<Vec<Element>, SiteError> {
    Ok(elements(root.query_selector_all(selector)?))
}

pub fn query_all_within(root: &Element, selector: &str) -> Result<Vec<Element>, SiteError> {
    Ok(elements(root.query_selector_all(selector)?))
}

pub fn query_one(root: &Document, selector: &str) -> Result<Element, SiteError> {
    root.query_selector(selector)?
        .ok_or_else(|| SiteError::MissingElement(selector.to_string()))
}

pub fn as_html(element: &Element) -> Option<&HtmlElement> {
    element.dyn_ref::<HtmlElement>()
}

pub fn set_style(element: &Element, property: &str, value: &str) -> Result<(), SiteError> {
    let html = as_html(element)
        .ok_or_else(|| SiteError::Js(format!("<{}> has no style", element.tag_name())))?;
    html.style().set_property(property, value)?;
    Ok(())
}

pub fn scroll_y(window: &Window) -> f64 {
    window.scroll_y().unwrap_or(0.0)
}
