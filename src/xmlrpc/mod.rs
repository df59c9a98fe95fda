//! XML-RPC client layer for talking to flrig.
//!
//! This module separates the concerns of an RPC round trip:
//! - `encode`: translate method + params → methodCall document (pure)
//! - `decode`: translate methodResponse document → Value (pure)
//! - `http`: frame a request / split a response (pure)
//! - `session`: own the TCP connection, drive timeouts and I/O
//!
//! Only the scalar subset flrig actually uses is supported.

pub mod decode;
pub mod encode;
pub mod http;
pub mod session;

pub use decode::decode_response;
pub use encode::encode_call;
pub use session::XmlRpcSession;

use crate::domain::{RigError, RigResult};

/// A scalar XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    Double(f64),
    Str(String),
    Nil,
}

impl Value {
    /// Numeric view. flrig answers many numeric queries with strings.
    pub fn as_f64(&self) -> RigResult<f64> {
        match self {
            Value::Int(i) => Ok(f64::from(*i)),
            Value::Double(d) => Ok(*d),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| RigError::Protocol(format!("Expected number, got '{s}': {e}"))),
            Value::Nil => Err(RigError::Protocol("Expected number, got nil".into())),
        }
    }

    pub fn as_bool(&self) -> RigResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Double(d) => Ok(*d != 0.0),
            Value::Str(s) => match s.trim() {
                "1" | "true" | "TRUE" => Ok(true),
                "0" | "false" | "FALSE" | "" => Ok(false),
                other => Err(RigError::Protocol(format!("Expected boolean, got '{other}'"))),
            },
            Value::Nil => Err(RigError::Protocol("Expected boolean, got nil".into())),
        }
    }

    pub fn into_string(self) -> RigResult<String> {
        match self {
            Value::Str(s) => Ok(s),
            Value::Int(i) => Ok(i.to_string()),
            Value::Double(d) => Ok(d.to_string()),
            Value::Bool(b) => Ok(if b { "1" } else { "0" }.to_string()),
            Value::Nil => Err(RigError::Protocol("Expected string, got nil".into())),
        }
    }
}
