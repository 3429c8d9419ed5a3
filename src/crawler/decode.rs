//! Response decoding for the remote endpoints
//!
//! The hint endpoint answers with an XML property list:
//!
//! ```text
//! <plist><dict>
//!   <key>title</key><string>Suggestions</string>
//!   <key>hints</key>
//!   <array>
//!     <dict><key>term</key><string>…</string><key>priority</key><integer>…</integer>…</dict>
//!   </array>
//! </dict></plist>
//! ```
//!
//! The property list is walked with the same markup parser used for HTML.
//! The search endpoint answers with JSON whose `results` carry a `bundleId`.

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use thiserror::Error;

use crate::records::Hint;

/// The response body did not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Subset of plist values the hint envelope uses
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Dict(Vec<(String, Value)>),
    Array(Vec<Value>),
    String(String),
    Integer(i64),
    Other,
}

impl Value {
    fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Dict(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Decodes a hint envelope into hints attributed to `query`, keeping the
/// endpoint's order
pub fn decode_hints(query: &str, body: &str) -> Result<Vec<Hint>, DecodeError> {
    let root = parse_plist(body)?;

    match root.get("title") {
        Some(Value::String(title)) if title == "Suggestions" => {}
        _ => return Err(DecodeError::new("invalid envelope: missing Suggestions title")),
    }
    let items = match root.get("hints") {
        Some(Value::Array(items)) => items,
        _ => return Err(DecodeError::new("invalid envelope: missing hints array")),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let term = match item.get("term") {
                Some(Value::String(term)) => term,
                _ => return Err(DecodeError(format!("invalid hint dict {}: no term", i))),
            };
            let priority = match item.get("priority") {
                Some(Value::Integer(p)) => i16::try_from(*p).map_err(|_| {
                    DecodeError(format!("invalid hint dict {}: priority {} out of range", i, p))
                })?,
                _ => return Err(DecodeError(format!("invalid hint dict {}: no priority", i))),
            };
            Ok(Hint::new(priority, query, term.clone()))
        })
        .collect()
}

/// Parses the value held by the document's `<plist>` element
///
/// The markup parser is lenient, so a body cut short would still yield a tree;
/// the closing tag is checked first to reject truncated responses.
fn parse_plist(body: &str) -> Result<Value, DecodeError> {
    if !body.trim_end().ends_with("</plist>") {
        return Err(DecodeError::new("no complete plist in document"));
    }

    let document = Html::parse_document(&expand_empty_elements(body));
    let selector = Selector::parse("plist")
        .map_err(|e| DecodeError(format!("invalid selector: {:?}", e)))?;
    let plist = document
        .select(&selector)
        .next()
        .ok_or_else(|| DecodeError::new("no plist element in document"))?;

    let root = plist
        .children()
        .find_map(ElementRef::wrap)
        .ok_or_else(|| DecodeError::new("empty plist"))?;
    parse_value(root)
}

fn parse_value(element: ElementRef<'_>) -> Result<Value, DecodeError> {
    match element.value().name() {
        "dict" => {
            let mut entries = Vec::new();
            let mut key: Option<String> = None;
            for child in element.children().filter_map(ElementRef::wrap) {
                if child.value().name() == "key" {
                    key = Some(text_of(child));
                    continue;
                }
                let key = key
                    .take()
                    .ok_or_else(|| DecodeError::new("dict value without key"))?;
                entries.push((key, parse_value(child)?));
            }
            Ok(Value::Dict(entries))
        }
        "array" => element
            .children()
            .filter_map(ElementRef::wrap)
            .map(parse_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        "string" => Ok(Value::String(text_of(element))),
        "integer" => {
            let text = text_of(element);
            text.trim()
                .parse()
                .map(Value::Integer)
                .map_err(|_| DecodeError(format!("invalid integer {:?}", text)))
        }
        _ => Ok(Value::Other),
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Rewrites every self-closing element (`<true/>`, `<dict />`, ...) as a
/// start/end pair
///
/// HTML parsing ignores the self-closing flag on unknown elements, which would
/// nest every following sibling inside the empty one. A `/>` that does not
/// close a tag (character data may contain a bare `>`) is copied unchanged.
fn expand_empty_elements(body: &str) -> String {
    let mut expanded = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(close) = rest.find("/>") {
        let (head, tail) = rest.split_at(close);
        rest = &tail[2..];

        let name = head.rfind('<').and_then(|open| {
            let tag = &head[open + 1..];
            let name = tag.split_whitespace().next()?;
            let is_name = name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'));
            (is_name && !tag.contains('>')).then_some(name)
        });

        expanded.push_str(head);
        match name {
            Some(name) => {
                expanded.push_str("></");
                expanded.push_str(name);
                expanded.push('>');
            }
            None => expanded.push_str("/>"),
        }
    }

    expanded.push_str(rest);
    expanded
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    bundle_id: String,
}

/// Extracts the ranked bundle ids from a search response
pub fn decode_search(body: &str) -> Result<Vec<String>, DecodeError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| DecodeError(format!("invalid search JSON: {}", e)))?;
    Ok(response.results.into_iter().map(|r| r.bundle_id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>title</key><string>Suggestions</string>
  <key>hints</key>
  <array>
    <dict>
      <key>term</key><string>cats &amp; dogs</string>
      <key>priority</key><integer>1200</integer>
      <key>url</key><string>https://search.itunes.apple.com/x?q=cats</string>
    </dict>
    <dict>
      <key>term</key><string>catan</string>
      <key>priority</key><integer>800</integer>
      <key>url</key><string>https://search.itunes.apple.com/x?q=catan</string>
    </dict>
  </array>
</dict>
</plist>"#;

    #[test]
    fn test_decode_hints_keeps_order_and_unescapes() {
        let hints = decode_hints("cat", ENVELOPE).unwrap();
        assert_eq!(
            hints,
            vec![
                Hint::new(1200, "cat", "cats & dogs"),
                Hint::new(800, "cat", "catan"),
            ]
        );
    }

    #[test]
    fn test_decode_empty_hints_array() {
        let body = "<plist><dict><key>title</key><string>Suggestions</string>\
                    <key>hints</key><array/></dict></plist>";
        assert!(decode_hints("zzz", body).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_truncated_body() {
        let cut = &ENVELOPE[..ENVELOPE.find("<dict>\n      <key>term</key><string>catan").unwrap()];
        assert!(decode_hints("cat", cut).is_err());
    }

    #[test]
    fn test_self_closing_element_does_not_swallow_siblings() {
        let body = "<plist><dict><key>extra</key><dict/>\
                    <key>title</key><string>Suggestions</string>\
                    <key>hints</key><array/></dict></plist>";
        assert!(decode_hints("q", body).unwrap().is_empty());
    }

    #[test]
    fn test_boolean_and_spaced_empty_elements_keep_siblings() {
        let body = "<plist><dict><key>explicit</key><true/>\
                    <key>extra</key><dict />\
                    <key>title</key><string>Suggestions</string>\
                    <key>hints</key><array><dict><key>term</key><string>a/>b</string>\
                    <key>priority</key><integer>7</integer><key>new</key><false/></dict>\
                    </array></dict></plist>";
        assert_eq!(decode_hints("q", body).unwrap(), vec![Hint::new(7, "q", "a/>b")]);
    }

    #[test]
    fn test_expand_empty_elements() {
        assert_eq!(expand_empty_elements("<true/>"), "<true></true>");
        assert_eq!(expand_empty_elements("<dict />"), "<dict ></dict>");
        assert_eq!(
            expand_empty_elements("<string>1/>2</string><array/>"),
            "<string>1/>2</string><array></array>"
        );
    }

    #[test]
    fn test_decode_rejects_html_error_page() {
        let body = "<html><body><b>Http/1.1 Service Unavailable</b></body> </html>";
        assert!(decode_hints("q", body).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_title() {
        let body = "<plist><dict><key>title</key><string>Other</string>\
                    <key>hints</key><array/></dict></plist>";
        let err = decode_hints("q", body).unwrap_err();
        assert!(err.0.contains("Suggestions"));
    }

    #[test]
    fn test_decode_rejects_hint_without_priority() {
        let body = "<plist><dict><key>title</key><string>Suggestions</string>\
                    <key>hints</key><array><dict><key>term</key><string>a</string></dict>\
                    </array></dict></plist>";
        let err = decode_hints("q", body).unwrap_err();
        assert!(err.0.contains("dict 0"));
    }

    #[test]
    fn test_decode_rejects_priority_out_of_range() {
        let body = "<plist><dict><key>title</key><string>Suggestions</string>\
                    <key>hints</key><array><dict><key>term</key><string>a</string>\
                    <key>priority</key><integer>40000</integer></dict>\
                    </array></dict></plist>";
        assert!(decode_hints("q", body).is_err());
    }

    #[test]
    fn test_decode_search_extracts_bundle_ids() {
        let body = r#"{"resultCount":2,"results":[
            {"bundleId":"com.example.one","trackName":"One"},
            {"bundleId":"com.example.two","kind":"software"}]}"#;
        assert_eq!(
            decode_search(body).unwrap(),
            vec!["com.example.one", "com.example.two"]
        );
    }

    #[test]
    fn test_decode_search_rejects_non_json() {
        assert!(decode_search("<html></html>").is_err());
    }
}
