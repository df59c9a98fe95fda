//! Minimal HTTP/1.1 framing for XML-RPC POSTs (pure, no I/O).

use crate::domain::{RigError, RigResult};

/// Path flrig serves XML-RPC on (it accepts any path)
pub const RPC_PATH: &str = "/RPC2";

/// A complete HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Build a POST request carrying an XML body.
pub fn encode_request(host: &str, port: u16, body: &str) -> String {
    format!(
        "POST {RPC_PATH} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         User-Agent: rigkey\r\n\
         Content-Type: text/xml\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    )
}

/// Try to split `raw` into a complete response.
///
/// Returns `Ok(None)` while more bytes are needed. `eof` tells us the peer
/// closed the connection, so a response without `Content-Length` ends here
/// and a short body is an error.
pub fn parse_response(raw: &[u8], eof: bool) -> RigResult<Option<HttpResponse>> {
    let Some(header_end) = find(raw, b"\r\n\r\n") else {
        if eof {
            return Err(RigError::Protocol(
                "Connection closed before HTTP headers completed".into(),
            ));
        }
        return Ok(None);
    };

    let headers = String::from_utf8_lossy(&raw[..header_end]);
    let mut lines = headers.lines();
    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| RigError::Protocol(format!("Bad HTTP status line: '{status_line}'")))?;

    let content_length = lines.find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse::<usize>().ok()
        } else {
            None
        }
    });

    let body = &raw[header_end + 4..];
    let body = match content_length {
        Some(len) if body.len() >= len => &body[..len],
        Some(len) if eof => {
            return Err(RigError::Protocol(format!(
                "HTTP body truncated: got {} of {len} bytes",
                body.len()
            )))
        }
        Some(_) => return Ok(None),
        None if eof => body,
        None => return Ok(None),
    };

    let body = std::str::from_utf8(body)
        .map_err(|e| RigError::Protocol(format!("Invalid UTF-8 response: {e}")))?;

    Ok(Some(HttpResponse {
        status,
        body: body.to_string(),
    }))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
