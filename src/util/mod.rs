use wasm_bindgen::JsValue;

/// Renders a backend timestamp in the browser's locale; anything the `Date`
/// constructor cannot parse is shown as-is.
pub(crate) fn format_updated_at(raw: &str) -> String {
    let d = js_sys::Date::new(&JsValue::from_str(raw));
    if d.get_time().is_nan() {
        return raw.to_string();
    }
    String::from(d.to_locale_string("default", &JsValue::UNDEFINED))
}
