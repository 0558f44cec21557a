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

//! Interfaces to the host web application.
//!
//! The bridge never reaches for ambient request, session, or configuration
//! state. Everything it needs from the host is passed in through the traits
//! defined here.
//!
//! The credential is split between two of them: the `SessionStore` holds the
//! passphrase-locked private key on the server, while the `CookieJar` carries
//! the passphrase and ciphertext in the browser. Either can be swapped out
//! independently of the other.

use cookie::Cookie;

pub mod memory;

/// Server-side storage scoped to one browser session.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// The browser's cookies as seen from the current request/response cycle.
pub trait CookieJar {
    /// Return the value of the named cookie as the browser sent it.
    fn get(&self, name: &str) -> Option<String>;
    /// Queue a `Set-Cookie` instruction for the response.
    fn set(&mut self, cookie: Cookie<'static>);
}

/// Identity of the user the current request belongs to.
pub trait UserDirectory {
    fn current_user_id(&self) -> String;
    /// The e-mail address configured in the user's profile, if any.
    fn current_user_email(&self) -> Option<String>;
}

pub trait RequestContext {
    /// The path (and query) of the request being handled.
    fn request_path(&self) -> String;
}

/// Access to the host's stored settings for this integration.
///
/// Names are those in `setting`.
pub trait ConfigProvider {
    fn bool_setting(&self, name: &str) -> Option<bool>;
    fn string_setting(&self, name: &str) -> Option<String>;
}

/// Setting names understood by the bridge.
pub mod setting {
    pub const ENABLE_SSL_VERIFY: &str = "enable_ssl_verify";
    pub const SHOW_TOP_LINE: &str = "show_top_line";
    pub const INTERNAL_ADDRESS: &str = "internal_address";
    pub const PUBLIC_SERVER: &str = "public_server";
    pub const REQUEST_TIMEOUT_SECS: &str = "request_timeout_secs";
    pub const RSA_BITS: &str = "rsa_bits";
    pub const SESSION_ID_COOKIE: &str = "session_id_cookie";
    pub const SESSION_AUTH_COOKIE: &str = "session_auth_cookie";
}
