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

//! The HTTP seam between the login state machine and the network.
//!
//! The state machine only ever sees `RawResponse`s, i.e. a status, the raw
//! header block and the body, which it picks apart itself with the `codec`
//! functions. That keeps the decision logic independent of the HTTP client
//! and lets the tests drive it from captured wire text.

use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{
    HeaderValue, ACCEPT, ACCEPT_ENCODING, CACHE_CONTROL, COOKIE, PRAGMA,
};

use secstr::SecStr;

use crate::codec::headers::split_response;
use crate::support::{error::Error, log_prefix::LogPrefix};

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound request to the webmail server.
///
/// This intentionally does not implement `Debug` since `form` may contain
/// the user's password.
pub struct Request {
    pub method: Method,
    pub url: String,
    /// Value of the `Cookie` header, if any.
    pub cookie: Option<String>,
    /// URL-encoded into the body of `POST` requests. Ignored for `GET`.
    pub form: Vec<(&'static str, String)>,
}

impl Drop for Request {
    fn drop(&mut self) {
        // Hand the form values to `SecStr` so the password copy is zeroed.
        for (_, value) in self.form.iter_mut() {
            drop(SecStr::new(std::mem::take(value).into_bytes()));
        }
    }
}

/// A response as it came off the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// The header block, including the status line.
    pub head: String,
    pub body: String,
}

impl RawResponse {
    /// Build a response from the full wire text of an HTTP response.
    pub fn from_wire(status: u16, raw: &str) -> Self {
        let (head, body) = split_response(raw);
        RawResponse {
            status,
            head: head.to_owned(),
            body: body.to_owned(),
        }
    }
}

pub trait Transport {
    fn execute(&mut self, request: &Request) -> Result<RawResponse, Error>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportOptions {
    /// Whether the server's TLS certificate and host name are checked.
    pub verify_tls: bool,
    /// Limit on each complete request/response exchange.
    pub timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        TransportOptions {
            verify_tls: true,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Creates transports.
///
/// Each login attempt gets its own transport, so nothing (connections,
/// cookies) is shared between attempts.
pub trait Connector {
    fn connect(
        &self,
        options: &TransportOptions,
        log_prefix: &LogPrefix,
    ) -> Result<Box<dyn Transport>, Error>;
}

/// Connects over real HTTP(S).
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(
        &self,
        options: &TransportOptions,
        log_prefix: &LogPrefix,
    ) -> Result<Box<dyn Transport>, Error> {
        // Cookies are handled explicitly by the login state machine, so the
        // client's own cookie store stays off. Redirects must not be followed
        // either, since the cookies we want are set on the redirect itself.
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_tls)
            .danger_accept_invalid_hostnames(!options.verify_tls)
            .build()?;

        Ok(Box::new(HttpTransport {
            client,
            verify_tls: options.verify_tls,
            log_prefix: log_prefix.clone(),
        }))
    }
}

struct HttpTransport {
    client: reqwest::blocking::Client,
    verify_tls: bool,
    log_prefix: LogPrefix,
}

impl Transport for HttpTransport {
    fn execute(&mut self, request: &Request) -> Result<RawResponse, Error> {
        if !self.verify_tls {
            warn!(
                "{} TLS certificate verification disabled for request to {}",
                self.log_prefix, request.url
            );
        }
        debug!(
            "{} {:?} {}",
            self.log_prefix, request.method, request.url
        );

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self
                .client
                .post(&request.url)
                .header(ACCEPT, HeaderValue::from_static(ACCEPT_HTML))
                .header(ACCEPT_ENCODING, HeaderValue::from_static("identity"))
                .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
                .header(PRAGMA, HeaderValue::from_static("no-cache"))
                .form(&request.form),
        };
        if let Some(ref cookie) = request.cookie {
            builder = builder.header(COOKIE, cookie.as_str());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        debug!("{} Got HTTP status {}", self.log_prefix, status);

        let mut head = format!("{:?} {}\r\n", response.version(), response.status());
        for (name, value) in response.headers() {
            head.push_str(name.as_str());
            head.push_str(": ");
            head.push_str(&String::from_utf8_lossy(value.as_bytes()));
            head.push_str("\r\n");
        }

        let body = response.text()?;
        Ok(RawResponse { status, head, body })
    }
}
