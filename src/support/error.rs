//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Mailbridge.
//
// Mailbridge is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailbridge is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Mailbridge. If not, see <http://www.gnu.org/licenses/>.

use thiserror::Error;

/// Every failure the bridge can encounter.
///
/// None of the variants carry secret material. Library errors are converted
/// into one of these at the point where they occur so that callers only ever
/// need to distinguish the kinds below.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad key, passphrase, or ciphertext, or input the key cannot carry.
    #[error("Credential cryptography failed: {0}")]
    Crypto(&'static str),
    /// Part of the split credential is not available for this session.
    #[error("Credential material missing: {0}")]
    MissingCredential(&'static str),
    /// Connection, timeout, or TLS failure reaching the webmail server.
    #[error("Unable to reach webmail server: {0}")]
    Network(String),
    /// The webmail server answered with something we cannot work with.
    #[error("Unexpected webmail response: {0}")]
    Protocol(String),
    /// The webmail server re-displayed its login form.
    #[error("Webmail server rejected the login")]
    LoginRejected,
    #[error("User '{0}' has no usable e-mail address")]
    NotAnEmail(String),
    #[error("Request path '{0}' is a non-interactive API route")]
    ExcludedPath(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error is an expected outcome rather than a malfunction.
    ///
    /// Expected outcomes are logged at a lower level.
    pub fn is_benign(&self) -> bool {
        matches!(*self, Error::ExcludedPath(..))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        // reqwest includes the URL in its messages; the login URLs never
        // carry credentials since those travel in the POST body.
        Error::Network(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Config(format!("bad webmail address: {}", e))
    }
}
