//! XmlRpcSession: owns the TCP round trip to flrig and its timeouts.
//!
//! Pure translation lives in `encode` / `decode` / `http`. The session only
//! handles I/O. Each call opens a fresh connection, so a daemon restart
//! between calls is invisible to callers.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::domain::{RigError, RigResult};

use super::http::{encode_request, parse_response, HttpResponse};
use super::{decode_response, encode_call, Value};

/// Chunk size for each socket read
const READ_CHUNK_SIZE: usize = 1024;

/// Blocking XML-RPC client bound to one host:port.
#[derive(Debug, Clone)]
pub struct XmlRpcSession {
    host: String,
    port: u16,
    timeout: Duration,
}

impl XmlRpcSession {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Call `method` and return its decoded result.
    ///
    /// Connection problems and timeouts become `RadioUnavailable`; faults
    /// and unparseable replies become `Protocol`.
    pub fn call(&self, method: &str, params: &[Value]) -> RigResult<Value> {
        let body = encode_call(method, params);
        log::debug!("XML-RPC TX: {method}{params:?}");

        let response = self.round_trip(method, &body)?;
        if response.status != 200 {
            return Err(RigError::Protocol(format!(
                "{method}: HTTP {} from flrig",
                response.status
            )));
        }

        let value = decode_response(&response.body)?;
        log::debug!("XML-RPC RX: {method} → {value:?}");
        Ok(value)
    }

    fn round_trip(&self, method: &str, body: &str) -> RigResult<HttpResponse> {
        let unavailable = |what: &str, e: std::io::Error| {
            RigError::RadioUnavailable(format!("{method}: {what} {}: {e}", self.endpoint()))
        };

        let addr = self.resolve()?;
        let mut stream =
            TcpStream::connect_timeout(&addr, self.timeout).map_err(|e| unavailable("connect", e))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| unavailable("configure", e))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| unavailable("configure", e))?;

        let request = encode_request(&self.host, self.port, body);
        stream
            .write_all(request.as_bytes())
            .map_err(|e| unavailable("write to", e))?;

        // Read until the response is complete, the peer closes, or the
        // overall deadline passes.
        let deadline = Instant::now() + self.timeout;
        let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK_SIZE);
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let eof = match stream.read(&mut chunk) {
                Ok(0) => true,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    false
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => false,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(RigError::RadioUnavailable(format!(
                        "{method}: no response from {} within {:?}",
                        self.endpoint(),
                        self.timeout
                    )));
                }
                Err(e) => return Err(unavailable("read from", e)),
            };

            if let Some(response) = parse_response(&buf, eof)? {
                return Ok(response);
            }
            if Instant::now() >= deadline {
                return Err(RigError::RadioUnavailable(format!(
                    "{method}: response from {} incomplete after {:?}",
                    self.endpoint(),
                    self.timeout
                )));
            }
        }
    }

    fn resolve(&self) -> RigResult<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| RigError::RadioUnavailable(format!("resolve {}: {e}", self.endpoint())))?
            .next()
            .ok_or_else(|| RigError::RadioUnavailable(format!("no address for {}", self.endpoint())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// One-shot fake server: accepts a single connection, captures the
    /// request and answers with `reply`.
    fn serve_once(reply: String) -> (u16, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            // Read until the XML body is complete
            while !String::from_utf8_lossy(&request).contains("</methodCall>") {
                let n = conn.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            conn.write_all(reply.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (port, handle)
    }

    fn http_ok(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn call_round_trips_over_tcp() {
        let (port, server) = serve_once(http_ok(
            "<methodResponse><params><param><value>USB</value></param></params></methodResponse>",
        ));
        let session = XmlRpcSession::new("127.0.0.1", port, Duration::from_secs(2));
        let value = session.call("rig.get_mode", &[]).unwrap();
        assert_eq!(value, Value::Str("USB".into()));
        let request = server.join().unwrap();
        assert!(request.contains("<methodName>rig.get_mode</methodName>"));
    }

    #[test]
    fn refused_connection_is_radio_unavailable() {
        // Bind then drop to get a port with nothing listening
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let session = XmlRpcSession::new("127.0.0.1", port, Duration::from_millis(200));
        assert!(matches!(
            session.call("rig.get_mode", &[]),
            Err(RigError::RadioUnavailable(_))
        ));
    }

    #[test]
    fn http_error_status_is_protocol_error() {
        let (port, _server) = serve_once("HTTP/1.1 500 Internal\r\nContent-Length: 0\r\n\r\n".to_string());
        let session = XmlRpcSession::new("127.0.0.1", port, Duration::from_secs(2));
        assert!(matches!(
            session.call("rig.get_mode", &[]),
            Err(RigError::Protocol(_))
        ));
    }
}
