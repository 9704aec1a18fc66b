// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Error types for the crate

use std::io;

use hickory_proto::error::ProtoError;
use thiserror::Error;

/// The error kind for errors that get returned in the crate
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An error with an arbitrary message, referenced as &'static str
    #[error("{0}")]
    Message(&'static str),

    /// An error with an arbitrary message, stored as String
    #[error("{0}")]
    Msg(String),

    /// A nameserver or resolver address that could not be parsed
    #[error("invalid nameserver address: {0}")]
    InvalidServerAddress(String),

    /// The resolver list handed to the ladder engine was empty
    #[error("no resolvers configured")]
    NoResolvers,

    /// A request timed out
    #[error("request timed out")]
    Timeout,

    /// An error got returned from IO
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// An error got returned by the hickory-proto crate
    #[error("proto error: {0}")]
    Proto(#[from] ProtoError),
}

/// The error type for errors that get returned in the crate
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    kind: Box<ErrorKind>,
}

impl Error {
    /// Get the kind of the error
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if the error is the expiry of a query deadline
    pub fn is_timeout(&self) -> bool {
        matches!(*self.kind, ErrorKind::Timeout)
    }
}

impl<E> From<E> for Error
where
    E: Into<ErrorKind>,
{
    fn from(error: E) -> Self {
        Self {
            kind: Box::new(error.into()),
        }
    }
}

impl From<&'static str> for ErrorKind {
    fn from(msg: &'static str) -> Self {
        Self::Message(msg)
    }
}

impl From<String> for ErrorKind {
    fn from(msg: String) -> Self {
        Self::Msg(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_detected() {
        let error = Error::from(ErrorKind::Timeout);
        assert!(error.is_timeout());
        assert_eq!(error.to_string(), "request timed out");
    }

    #[test]
    fn message_conversions() {
        let error = Error::from("static message");
        assert!(!error.is_timeout());
        assert_eq!(error.to_string(), "static message");

        let error = Error::from(format!("owned {}", "message"));
        assert_eq!(error.to_string(), "owned message");
    }
}
