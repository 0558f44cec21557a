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

//! In-process implementations of the host interfaces.
//!
//! These back the CLI and the tests. `MemoryCookieJar` behaves like a browser
//! that immediately applies every `Set-Cookie` it is given, while also keeping
//! the rendered header lines so a host can forward them verbatim.

use std::collections::HashMap;

use cookie::Cookie;
use time::OffsetDateTime;

use super::*;

#[derive(Default)]
pub struct MemorySessionStore {
    values: HashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

#[derive(Default)]
pub struct MemoryCookieJar {
    values: HashMap<String, String>,
    issued: Vec<String>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `Set-Cookie` header value issued so far, oldest first.
    pub fn set_cookie_headers(&self) -> &[String] {
        &self.issued
    }

    /// Names of the cookies currently held.
    pub fn names(&self) -> Vec<&str> {
        let mut names = self.values.keys().map(|k| &**k).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn set(&mut self, cookie: Cookie<'static>) {
        self.issued.push(cookie.to_string());

        let expired = cookie
            .expires_datetime()
            .map_or(false, |at| at <= OffsetDateTime::now_utc());
        if expired {
            self.values.remove(cookie.name());
        } else {
            self.values
                .insert(cookie.name().to_owned(), cookie.value().to_owned());
        }
    }
}

/// A fixed user identity.
pub struct StaticUser {
    pub uid: String,
    pub email: Option<String>,
}

impl UserDirectory for StaticUser {
    fn current_user_id(&self) -> String {
        self.uid.clone()
    }

    fn current_user_email(&self) -> Option<String> {
        self.email.clone()
    }
}

/// A fixed request path.
pub struct StaticRequest(pub String);

impl RequestContext for StaticRequest {
    fn request_path(&self) -> String {
        self.0.clone()
    }
}
