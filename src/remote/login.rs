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

//! The two-request login handshake.
//!
//! A login attempt goes through these steps:
//!
//! 1. Any webmail session cookies the browser holds are expired.
//!
//! 2. The login page is fetched. If it sets a session id cookie, that id is
//! carried into the next request.
//!
//! 3. The hidden `_token`, `_timezone` and `_url` fields are scraped from the
//! page. Missing fields are sent as empty strings.
//!
//! 4. The credentials are posted along with the scraped fields.
//!
//! 5. If the response sets a session auth cookie, the login succeeded and the
//! session cookies are handed to the browser. Otherwise, the response is
//! scanned for the login form; whether its absence counts as success is
//! decided by the `AmbiguousPolicy`.
//!
//! Every step can change the browser's webmail cookies, whatever the final
//! outcome.

use std::collections::HashMap;

use log::{info, warn};

use super::transport::{Method, Request, Transport};
use crate::codec::{
    cookies::{
        expired_cookie, parse_cookies, request_cookie_header, session_cookie,
        CookieNames, DELETED,
    },
    headers::{parse_response_headers, ResponseHeaders},
    inputs::LoginFormFields,
};
use crate::crypt::custody::Password;
use crate::host::CookieJar;
use crate::support::{error::Error, log_prefix::LogPrefix};

const LOGIN_PAGE_QUERY: &str = "?_task=login";
const LOGIN_ACTION_QUERY: &str = "?_task=login&_action=login";

/// Decides whether a login response that set no auth cookie still counts as
/// a successful login, given the input fields found on the response page.
pub type AmbiguousPolicy = fn(&LoginFormFields) -> bool;

/// The default `AmbiguousPolicy`: anything but the login form is success.
///
/// This is a guess. A server error page that happens not to contain the
/// login form is indistinguishable from a logged-in page here.
pub fn assume_success_without_login_form(fields: &LoginFormFields) -> bool {
    !fields.has_login_form()
}

/// An `AmbiguousPolicy` that only accepts an explicit auth cookie.
pub fn require_auth_cookie(_: &LoginFormFields) -> bool {
    false
}

/// The webmail server's view of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteSessionState {
    pub session_id: String,
    /// Only ever non-empty after a confirmed login.
    pub session_auth_token: String,
    pub internal_address: String,
    pub public_server: String,
}

impl RemoteSessionState {
    pub fn is_authenticated(&self) -> bool {
        !self.session_auth_token.is_empty()
    }
}

/// A single login attempt against one webmail server.
pub struct RemoteLogin {
    log_prefix: LogPrefix,
    transport: Box<dyn Transport>,
    names: CookieNames,
    state: RemoteSessionState,
    ambiguous_policy: AmbiguousPolicy,
}

struct Page {
    headers: ResponseHeaders,
    html: String,
}

impl RemoteLogin {
    pub fn new(
        log_prefix: LogPrefix,
        transport: Box<dyn Transport>,
        names: CookieNames,
        internal_address: String,
        public_server: String,
    ) -> Self {
        RemoteLogin {
            log_prefix,
            transport,
            names,
            state: RemoteSessionState {
                internal_address,
                public_server,
                ..RemoteSessionState::default()
            },
            ambiguous_policy: assume_success_without_login_form,
        }
    }

    pub fn with_ambiguous_policy(mut self, policy: AmbiguousPolicy) -> Self {
        self.ambiguous_policy = policy;
        self
    }

    /// Log `email` in with `password`, placing the resulting session cookies
    /// into `jar`.
    ///
    /// Returns the webmail session on success. A rejected login is reported
    /// as `Error::LoginRejected`.
    pub fn login(
        mut self,
        email: &str,
        password: &Password,
        jar: &mut dyn CookieJar,
    ) -> Result<RemoteSessionState, Error> {
        jar.set(expired_cookie(&self.names.session_id));
        jar.set(expired_cookie(&self.names.session_auth));

        let login_page = self.send(Method::Get, LOGIN_PAGE_QUERY, Vec::new())?;
        let cookies = parse_cookies(login_page.headers.get_all("set-cookie"));
        if let Some(session_id) = cookies.get(&self.names.session_id) {
            self.state.session_id = session_id.clone();
        }

        let fields = LoginFormFields::scrape(&login_page.html);
        let form = vec![
            ("_token", fields.value("_token").to_owned()),
            ("_task", "login".to_owned()),
            ("_action", "login".to_owned()),
            ("_timezone", fields.value("_timezone").to_owned()),
            ("_url", fields.value("_url").to_owned()),
            ("_user", email.to_owned()),
            ("_pass", password.to_form_value()),
        ];

        let answer = self.send(Method::Post, LOGIN_ACTION_QUERY, form)?;
        let cookies = parse_cookies(answer.headers.get_all("set-cookie"));
        let mut session_id_sent = false;
        if let Some(session_id) = live_value(&cookies, &self.names.session_id) {
            self.state.session_id = session_id.to_owned();
            jar.set(session_cookie(&self.names.session_id, session_id));
            session_id_sent = true;
        }

        if let Some(auth) = live_value(&cookies, &self.names.session_auth) {
            self.state.session_auth_token = auth.to_owned();
            jar.set(session_cookie(&self.names.session_auth, auth));
            if !session_id_sent {
                self.pass_on_session_id(jar);
            }
            info!("{} Logged in to webmail", self.log_prefix);
            return Ok(self.state);
        }

        let fields = LoginFormFields::scrape(&answer.html);
        if (self.ambiguous_policy)(&fields) {
            warn!(
                "{} Webmail set no auth cookie but showed no login form; \
                 assuming the login succeeded",
                self.log_prefix
            );
            if !session_id_sent {
                self.pass_on_session_id(jar);
            }
            Ok(self.state)
        } else {
            warn!("{} Webmail rejected the login", self.log_prefix);
            Err(Error::LoginRejected)
        }
    }

    fn pass_on_session_id(&self, jar: &mut dyn CookieJar) {
        if !self.state.session_id.is_empty() {
            jar.set(session_cookie(
                &self.names.session_id,
                &self.state.session_id,
            ));
        }
    }

    fn send(
        &mut self,
        method: Method,
        query: &str,
        form: Vec<(&'static str, String)>,
    ) -> Result<Page, Error> {
        let request = Request {
            method,
            url: format!("{}{}", self.state.internal_address, query),
            cookie: request_cookie_header(&[
                (self.names.session_id.as_str(), self.state.session_id.as_str()),
                (
                    self.names.session_auth.as_str(),
                    self.state.session_auth_token.as_str(),
                ),
            ]),
            form,
        };

        let response = self.transport.execute(&request).map_err(|e| {
            warn!("{} Request to {} failed: {}", self.log_prefix, request.url, e);
            e
        })?;

        if response.status >= 400 {
            warn!(
                "{} Request to {} failed with HTTP status {}",
                self.log_prefix, request.url, response.status
            );
            return Err(Error::Protocol(format!(
                "HTTP status {} from {}",
                response.status, request.url
            )));
        }

        Ok(Page {
            headers: parse_response_headers(&response.head),
            html: response.body,
        })
    }
}

fn live_value<'a>(
    cookies: &'a HashMap<String, String>,
    name: &str,
) -> Option<&'a str> {
    cookies
        .get(name)
        .map(|v| &**v)
        .filter(|&v| !v.is_empty() && v != DELETED)
}
