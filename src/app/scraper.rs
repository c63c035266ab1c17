//! Extraction of values from service responses
//!
//! The service reports results through cookies, hidden form inputs inside
//! HTML fragments, and small JSON replies. Everything here is a pure function
//! over header lists and body text; malformed input yields `None` or a
//! [`ProtocolError`], never a panic.

use scraper::{Html, Selector};
use serde_json::Value;

use crate::app::models::Primitive;
use crate::constants::http;
use crate::errors::{ProtocolError, ProtocolResult};

/// Extract the value of cookie `name` from the `Set-Cookie` headers.
///
/// The name only matches at a cookie boundary, so looking up `JSESSIONID`
/// never returns the value of `OLDJSESSIONID`. The value runs up to the next
/// `;` or the end of the header.
pub fn extract_cookie(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(http::HEADER_SET_COOKIE))
        .find_map(|(_, value)| cookie_in_header(value, name))
}

fn cookie_in_header(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim_start().split_once('=')?;
        (key == name).then(|| value.trim_end().to_string())
    })
}

/// Whether a cookie with the given name was set, whatever its value
pub fn has_cookie(headers: &[(String, String)], name: &str) -> bool {
    extract_cookie(headers, name).is_some()
}

/// Extract a cookie holding a comma-separated list, e.g. several new ids
pub fn extract_cookie_list(headers: &[(String, String)], name: &str) -> Vec<String> {
    extract_cookie(headers, name)
        .map(|raw| {
            raw.replace('"', "")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Extract a cookie and parse it as a non-negative integer
pub fn extract_cookie_number(
    headers: &[(String, String)],
    name: &str,
) -> ProtocolResult<Option<u64>> {
    match extract_cookie(headers, name) {
        None => Ok(None),
        Some(raw) => raw
            .trim_matches('"')
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ProtocolError::MalformedValue {
                name: name.to_string(),
                value: raw,
            }),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Id of a primitive: the value of the hidden input in a listing fragment
pub fn extract_id(fragment: &str) -> Option<u64> {
    let document = Html::parse_fragment(fragment);
    let hidden = selector("input[type=\"hidden\"]")?;
    document
        .select(&hidden)
        .find_map(|element| element.value().attr("value"))
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Display name of a space: the text of its `openSpace` link
pub fn extract_space_name(fragment: &str) -> Option<String> {
    let document = Html::parse_fragment(fragment);
    let link = selector("[onclick^=\"openSpace\"]")?;
    document
        .select(&link)
        .next()
        .map(|element| element.text().collect::<String>())
}

/// Display name of a leaf primitive: the text of its `_blank` link
pub fn extract_primitive_name(fragment: &str) -> Option<String> {
    let document = Html::parse_fragment(fragment);
    let link = selector("a[target=\"_blank\"]")?;
    document
        .select(&link)
        .next()
        .map(|element| element.text().collect::<String>())
}

/// Value of a named `<input>` on a form page
pub fn extract_input_value(html: &str, name: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let input = selector(&format!("input[name=\"{name}\"]"))?;
    document
        .select(&input)
        .find_map(|element| element.value().attr("value"))
        .map(str::to_string)
}

/// Whether a body is the service's login form, shown when a session has expired
pub fn is_login_form(body: &str) -> bool {
    body.contains(crate::constants::auth::LOGIN_FORM_MARKER)
}

/// Parse a listing reply into primitives.
///
/// A successful reply is an object whose `aaData` holds rows of HTML
/// fragments. A bare integer is an error code: 2 means the caller may not
/// view the space.
pub fn parse_listing(body: &str, containers: bool) -> ProtocolResult<Vec<Primitive>> {
    let json: Value = serde_json::from_str(body)?;

    if let Some(code) = json.as_i64() {
        return Err(match code {
            2 => ProtocolError::PermissionDenied,
            other => ProtocolError::UnexpectedPayload {
                reason: format!("listing returned code {other}"),
            },
        });
    }

    let rows = match json.get("aaData").and_then(Value::as_array) {
        Some(rows) => rows,
        None => {
            return Err(match json.get("message").and_then(Value::as_str) {
                Some(message) => ProtocolError::Rejected {
                    message: message.to_string(),
                },
                None => ProtocolError::UnexpectedPayload {
                    reason: "listing has no aaData array".to_string(),
                },
            })
        }
    };

    let mut primitives = Vec::new();
    for row in rows {
        let cells = match row.as_array() {
            Some(cells) => cells,
            None => continue,
        };
        for cell in cells.iter().filter_map(Value::as_str) {
            let id = extract_id(cell);
            let name = if containers {
                extract_space_name(cell)
            } else {
                extract_primitive_name(cell)
            };
            if let (Some(id), Some(name)) = (id, name) {
                primitives.push(Primitive { id, name });
            }
        }
    }
    Ok(primitives)
}

/// Interpret the small JSON acknowledgement returned by edit operations.
///
/// Older deployments reply with a bare integer (0 on success); newer ones
/// reply with `{"success": bool, "message": "..."}`. On success the message,
/// if any, is returned.
pub fn parse_reply(body: &str) -> ProtocolResult<Option<String>> {
    let json: Value = serde_json::from_str(body.trim())?;

    if let Some(code) = json.as_i64() {
        return match code {
            0 => Ok(None),
            3..=6 => Err(ProtocolError::PermissionDenied),
            7 => Err(ProtocolError::NameNotUnique),
            8 => Err(ProtocolError::InsufficientQuota),
            other => Err(ProtocolError::UnexpectedPayload {
                reason: format!("service returned code {other}"),
            }),
        };
    }

    let success = json
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| ProtocolError::UnexpectedPayload {
            reason: "reply has no success flag".to_string(),
        })?;
    let message = json
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    if success {
        Ok(message)
    } else {
        Err(ProtocolError::Rejected {
            message: message.unwrap_or_default(),
        })
    }
}
