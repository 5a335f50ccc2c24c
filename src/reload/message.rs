//! Live-reload message protocol.
//!
//! JSON messages sent from the server to browser clients:
//!
//! - `{"type":"connected","version":"..."}` on connect
//! - `{"type":"reload","path":"/img/a.png"}` full page reload
//! - `{"type":"css","path":"/css/index.css"}` stylesheet swap, no reload

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    Connected {
        version: String,
    },
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    Css {
        path: String,
    },
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn reload(path: Option<String>) -> Self {
        Self::Reload { path }
    }

    pub fn css(path: impl Into<String>) -> Self {
        Self::Css { path: path.into() }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            ReloadMessage::reload(Some("/index.html".into())).to_json(),
            r#"{"type":"reload","path":"/index.html"}"#
        );
        assert_eq!(ReloadMessage::reload(None).to_json(), r#"{"type":"reload"}"#);
        assert_eq!(
            ReloadMessage::css("/css/index.css").to_json(),
            r#"{"type":"css","path":"/css/index.css"}"#
        );
        assert!(ReloadMessage::connected().to_json().starts_with(r#"{"type":"connected""#));
    }

    #[test]
    fn test_parse() {
        let msg: ReloadMessage = serde_json::from_str(r#"{"type":"css","path":"/a.css"}"#).unwrap();
        assert_eq!(msg, ReloadMessage::css("/a.css"));
    }
}
