//! Pure decoding: XML-RPC methodResponse document → Value.
//!
//! No I/O, no side effects. flrig only ever returns a single scalar (or a
//! fault struct), so this is a small tag scanner rather than a full XML
//! parser.

use crate::domain::{RigError, RigResult};

use super::Value;

/// Decode a methodResponse body into its single return value.
///
/// Returns `Err(Protocol)` for a `<fault>` response or anything that does
/// not look like a scalar methodResponse.
pub fn decode_response(xml: &str) -> RigResult<Value> {
    if let Some(fault) = section(xml, "fault") {
        let message = fault_string(fault).unwrap_or_else(|| "unknown fault".to_string());
        return Err(RigError::Protocol(format!("XML-RPC fault: {message}")));
    }

    let params = section(xml, "params")
        .ok_or_else(|| RigError::Protocol(format!("Missing <params> in response: '{xml}'")))?;
    let param = match section(params, "param") {
        Some(p) => p,
        // Methods with no return value (setters) may answer with empty params
        None => return Ok(Value::Nil),
    };
    let value = section(param, "value")
        .ok_or_else(|| RigError::Protocol(format!("Missing <value> in param: '{param}'")))?;
    parse_scalar(value)
}

/// Text between the first `<tag>` and the last `</tag>`.
/// A self-closing `<tag/>` yields an empty section.
fn section<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    if let Some(start) = xml.find(&open) {
        let body_start = start + open.len();
        let end = xml.rfind(&close)?;
        if end >= body_start {
            return Some(&xml[body_start..end]);
        }
        return None;
    }
    xml.find(&format!("<{tag}/>")).map(|_| "")
}

/// Pull `faultString` out of a fault struct
fn fault_string(fault: &str) -> Option<String> {
    let after = &fault[fault.find("<name>faultString</name>")?..];
    let start = after.find("<value>")? + "<value>".len();
    let end = start + after[start..].find("</value>")?;
    parse_scalar(&after[start..end]).ok()?.into_string().ok()
}

/// Parse the inside of a `<value>` element
fn parse_scalar(inner: &str) -> RigResult<Value> {
    let trimmed = inner.trim();
    if !trimmed.starts_with('<') {
        // Untyped values are strings
        return Ok(Value::Str(unescape(inner)));
    }

    let tag_end = trimmed
        .find('>')
        .ok_or_else(|| RigError::Protocol(format!("Malformed value: '{inner}'")))?;
    let tag = &trimmed[1..tag_end];

    if let Some(name) = tag.strip_suffix('/') {
        return match name.trim() {
            "string" => Ok(Value::Str(String::new())),
            "nil" => Ok(Value::Nil),
            other => Err(RigError::Protocol(format!("Empty <{other}/> value"))),
        };
    }

    let close = format!("</{tag}>");
    let body_end = trimmed
        .rfind(&close)
        .ok_or_else(|| RigError::Protocol(format!("Unterminated <{tag}> in '{inner}'")))?;
    let body = &trimmed[tag_end + 1..body_end];

    match tag {
        "i4" | "int" => body
            .trim()
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|e| RigError::Protocol(format!("Bad integer '{body}': {e}"))),
        "boolean" => match body.trim() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(RigError::Protocol(format!("Bad boolean '{other}'"))),
        },
        "double" => body
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|e| RigError::Protocol(format!("Bad double '{body}': {e}"))),
        "string" => Ok(Value::Str(unescape(body))),
        "nil" => Ok(Value::Nil),
        other => Err(RigError::Protocol(format!("Unsupported value type <{other}>"))),
    }
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?>\r\n<methodResponse><params><param>{value}</param></params></methodResponse>\r\n"
        )
    }

    #[test]
    fn decode_untyped_string() {
        assert_eq!(
            decode_response(&response("<value>USB</value>")).unwrap(),
            Value::Str("USB".into())
        );
    }

    #[test]
    fn decode_typed_string() {
        assert_eq!(
            decode_response(&response("<value><string>14070000</string></value>")).unwrap(),
            Value::Str("14070000".into())
        );
    }

    #[test]
    fn decode_i4_and_int() {
        assert_eq!(
            decode_response(&response("<value><i4>1</i4></value>")).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            decode_response(&response("<value><int>-3</int></value>")).unwrap(),
            Value::Int(-3)
        );
    }

    #[test]
    fn decode_double() {
        assert_eq!(
            decode_response(&response("<value><double>12.5</double></value>")).unwrap(),
            Value::Double(12.5)
        );
    }

    #[test]
    fn decode_boolean() {
        assert_eq!(
            decode_response(&response("<value><boolean>1</boolean></value>")).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn decode_empty_string() {
        assert_eq!(
            decode_response(&response("<value><string/></value>")).unwrap(),
            Value::Str(String::new())
        );
    }

    #[test]
    fn decode_unescapes_entities() {
        assert_eq!(
            decode_response(&response("<value>a&lt;b&amp;c</value>")).unwrap(),
            Value::Str("a<b&c".into())
        );
    }

    #[test]
    fn decode_empty_params_is_nil() {
        let xml = "<methodResponse><params></params></methodResponse>";
        assert_eq!(decode_response(xml).unwrap(), Value::Nil);
    }

    #[test]
    fn decode_fault_returns_err_with_message() {
        let xml = "<methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><int>4</int></value></member>\
            <member><name>faultString</name><value><string>Unknown method</string></value></member>\
            </struct></value></fault></methodResponse>";
        match decode_response(xml) {
            Err(RigError::Protocol(msg)) => assert!(msg.contains("Unknown method"), "{msg}"),
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn decode_garbage_is_err() {
        assert!(decode_response("HTTP/1.1 500 oops").is_err());
    }

    #[test]
    fn decode_unsupported_type_is_err() {
        assert!(decode_response(&response("<value><array><data/></array></value>")).is_err());
    }
}
