//! Signed-in account chrome.
//!
//! Authentication happens outside the editor. The host page may expose
//! the signed-in user as a JSON string in `window.underlaySession`; the
//! editor only reads it to render the navbar.

use serde::Deserialize;
use wasm_bindgen::JsValue;

/// Global the host page sets to a JSON-encoded [`Session`].
pub const SESSION_GLOBAL: &str = "underlaySession";

/// The signed-in user, as far as the editor is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Session {
    pub email: String,
}

impl Session {
    /// Parse the host page's session JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Read the session the host page published, if any.
#[must_use]
pub fn current_session() -> Option<Session> {
    let window = web_sys::window()?;
    let json = js_sys::Reflect::get(&window, &JsValue::from_str(SESSION_GLOBAL))
        .ok()?
        .as_string()?;
    match Session::from_json(&json) {
        Ok(session) => Some(session),
        Err(e) => {
            web_sys::console::warn_1(&format!("ignoring malformed session: {e}").into());
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_email() {
        let session = Session::from_json(r#"{"email":"a@example.com"}"#).unwrap();
        assert_eq!(session.email, "a@example.com");
    }

    #[test]
    fn rejects_missing_email() {
        assert!(Session::from_json("{}").is_err());
    }
}
