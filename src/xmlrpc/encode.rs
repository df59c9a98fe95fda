//! Pure encoding: method name + params → XML-RPC methodCall document.

use super::Value;

/// Build the request body for `method` with positional `params`.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut body = String::with_capacity(128);
    body.push_str("<?xml version=\"1.0\"?>\r\n<methodCall><methodName>");
    body.push_str(&escape(method));
    body.push_str("</methodName>\r\n<params>");
    for param in params {
        body.push_str("<param>");
        body.push_str(&encode_value(param));
        body.push_str("</param>");
    }
    body.push_str("</params></methodCall>\r\n");
    body
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::Int(i) => format!("<value><i4>{i}</i4></value>"),
        Value::Bool(b) => format!("<value><boolean>{}</boolean></value>", u8::from(*b)),
        Value::Double(d) => format!("<value><double>{d}</double></value>"),
        Value::Str(s) => format!("<value><string>{}</string></value>", escape(s)),
        Value::Nil => "<value><nil/></value>".to_string(),
    }
}

/// Escape the five XML special characters
pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_no_params() {
        let body = encode_call("rig.get_vfoA", &[]);
        assert!(body.contains("<methodName>rig.get_vfoA</methodName>"));
        assert!(body.contains("<params></params>"));
    }

    #[test]
    fn encode_string_param() {
        let body = encode_call("rig.set_mode", &[Value::Str("USB-D".into())]);
        assert!(body.contains("<param><value><string>USB-D</string></value></param>"));
    }

    #[test]
    fn encode_double_param() {
        let body = encode_call("main.set_frequency", &[Value::Double(14_150_000.0)]);
        assert!(body.contains("<double>14150000</double>"));
    }

    #[test]
    fn encode_int_and_bool() {
        let body = encode_call("x", &[Value::Int(1), Value::Bool(false)]);
        assert!(body.contains("<i4>1</i4>"));
        assert!(body.contains("<boolean>0</boolean>"));
    }

    #[test]
    fn encode_escapes_markup() {
        let body = encode_call("x", &[Value::Str("a<b & c".into())]);
        assert!(body.contains("a&lt;b &amp; c"));
    }
}
