//! JavaScript entry points.
//!
//! ```js
//! import { openMenu, select, create, clearFirst, clearAll } from "select-event";
//! await select(input, ["Apple", /^Cher/]);
//! await create(input, "NewTag", { createOptionText: /^Add / });
//! ```

use js_sys::{Array, RegExp, Reflect};
use regex::RegexBuilder;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Element;

use crate::browser::BrowserHost;
use crate::config::SelectConfig;
use crate::error::{Result, SelectError};
use crate::host::TextMatch;
use crate::interaction::{self, Labels};

/// A JS string becomes an exact match, a `RegExp` a pattern (flags `i`, `m`, `s` carried over).
fn label_from_js(value: &JsValue) -> Result<TextMatch> {
    if let Some(text) = value.as_string() {
        return Ok(TextMatch::Exact(text));
    }
    if let Some(re) = value.dyn_ref::<RegExp>() {
        let source = String::from(re.source());
        let flags = String::from(re.flags());
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map_err(|e| SelectError::InvalidSelector { selector: source.clone(), error: e.to_string() })?;
        return Ok(TextMatch::Pattern(pattern));
    }
    Err(SelectError::Environment { message: format!("Expected a string or RegExp label, got {:?}", value) })
}

fn labels_from_js(value: &JsValue) -> Result<Labels> {
    if Array::is_array(value) {
        let labels = Array::from(value).iter().map(|item| label_from_js(&item)).collect::<Result<Vec<_>>>()?;
        return Ok(Labels::from(labels));
    }
    label_from_js(value).map(Labels::from)
}

fn config_from_js(config: &JsValue) -> Result<SelectConfig<Element>> {
    let mut builder = SelectConfig::builder();
    if config.is_undefined() || config.is_null() {
        return Ok(builder.build());
    }

    let container = Reflect::get(config, &JsValue::from_str("container"))?;
    if !container.is_undefined() && !container.is_null() {
        let container = container.dyn_into::<Element>().map_err(|other| SelectError::Environment {
            message: format!("Expected an Element as container, got {:?}", other),
        })?;
        builder = builder.container(container);
    }
    let create_option_text = Reflect::get(config, &JsValue::from_str("createOptionText"))?;
    if !create_option_text.is_undefined() && !create_option_text.is_null() {
        builder = builder.create_option_text(label_from_js(&create_option_text)?);
    }
    if let Some(wait) = Reflect::get(config, &JsValue::from_str("waitForElement"))?.as_bool() {
        builder = builder.wait_for_element(wait);
    }
    Ok(builder.build())
}

#[wasm_bindgen(js_name = openMenu)]
pub fn open_menu(input: Element) -> std::result::Result<(), JsValue> {
    interaction::open_menu(&BrowserHost::new(), &input)?;
    Ok(())
}

/// Select one label or an array of labels. `config` may carry `container`.
#[wasm_bindgen]
pub async fn select(input: Element, labels: JsValue, config: JsValue) -> std::result::Result<(), JsValue> {
    let labels = labels_from_js(&labels)?;
    let config = config_from_js(&config)?;
    interaction::select(&BrowserHost::new(), &input, labels, &config).await?;
    Ok(())
}

/// Type `text` and pick the create entry. `config` may carry `container`,
/// `createOptionText` and `waitForElement`.
#[wasm_bindgen]
pub async fn create(input: Element, text: String, config: JsValue) -> std::result::Result<(), JsValue> {
    let config = config_from_js(&config)?;
    interaction::create(&BrowserHost::new(), &input, &text, &config).await?;
    Ok(())
}

#[wasm_bindgen(js_name = clearFirst)]
pub async fn clear_first(input: Element) -> std::result::Result<(), JsValue> {
    interaction::clear_first(&BrowserHost::new(), &input).await?;
    Ok(())
}

#[wasm_bindgen(js_name = clearAll)]
pub async fn clear_all(input: Element) -> std::result::Result<(), JsValue> {
    interaction::clear_all(&BrowserHost::new(), &input).await?;
    Ok(())
}
