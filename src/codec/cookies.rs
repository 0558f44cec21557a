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

//! Cookie handling in both directions.
//!
//! Inbound, `parse_cookies` reduces the webmail server's `Set-Cookie` lines
//! to bare name/value pairs. Outbound, `session_cookie` and `expired_cookie`
//! build the instructions given to the browser.

use std::collections::HashMap;

use cookie::Cookie;
use time::{Duration, OffsetDateTime};

use crate::host::{setting, ConfigProvider};

pub const DEFAULT_PASSPHRASE: &str = "passphrase-token";
pub const DEFAULT_CREDENTIAL: &str = "encrypted-credential";
pub const DEFAULT_SESSION_ID: &str = "remote-session-id";
pub const DEFAULT_SESSION_AUTH: &str = "remote-session-auth";

/// Value given to cookies that are being expired.
///
/// The webmail server uses the same convention when it ends a session.
pub const DELETED: &str = "-del-";

/// Values this short are placeholders (such as `DELETED`), not real session
/// identifiers.
const MAX_PLACEHOLDER_LEN: usize = 5;

/// The names of the four cookies the bridge manages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieNames {
    /// Carries the passphrase unlocking the session-held private key.
    pub passphrase: String,
    /// Carries the encrypted password.
    pub credential: String,
    /// The webmail server's pre-authentication session id.
    pub session_id: String,
    /// The webmail server's post-authentication token.
    pub session_auth: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        CookieNames {
            passphrase: DEFAULT_PASSPHRASE.to_owned(),
            credential: DEFAULT_CREDENTIAL.to_owned(),
            session_id: DEFAULT_SESSION_ID.to_owned(),
            session_auth: DEFAULT_SESSION_AUTH.to_owned(),
        }
    }
}

impl CookieNames {
    /// Default names, with the webmail session cookies overridden by the
    /// host's configuration where set.
    pub fn from_config(config: &dyn ConfigProvider) -> Self {
        let mut names = CookieNames::default();
        if let Some(name) = config.string_setting(setting::SESSION_ID_COOKIE) {
            names.session_id = name;
        }
        if let Some(name) = config.string_setting(setting::SESSION_AUTH_COOKIE)
        {
            names.session_auth = name;
        }
        names
    }

    pub fn all(&self) -> [&str; 4] {
        [
            &self.passphrase,
            &self.credential,
            &self.session_id,
            &self.session_auth,
        ]
    }
}

/// Extract `name=value` pairs from `Set-Cookie` header values.
///
/// Only the part before the first `;` of each line is considered. Entries
/// with an empty name, or whose value is 5 characters or fewer, are dropped;
/// the latter catches deletions and other placeholders. Later lines win over
/// earlier ones with the same name.
pub fn parse_cookies<S: AsRef<str>>(lines: &[S]) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for line in lines {
        let pair = match line.as_ref().find(';') {
            Some(ix) => &line.as_ref()[..ix],
            None => line.as_ref(),
        };

        let (name, value) = match pair.find('=') {
            Some(ix) => (&pair[..ix], &pair[ix + 1..]),
            None => continue,
        };

        if name.is_empty() || value.chars().count() <= MAX_PLACEHOLDER_LEN {
            continue;
        }

        cookies.insert(name.to_owned(), value.to_owned());
    }

    cookies
}

/// A `Secure`, `HttpOnly`, site-wide cookie lasting for the browser session.
pub fn session_cookie(name: &str, value: &str) -> Cookie<'static> {
    Cookie::build((name.to_owned(), value.to_owned()))
        .path("/")
        .secure(true)
        .http_only(true)
        .build()
}

/// An instruction to the browser to drop the named cookie.
pub fn expired_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_owned(), DELETED.to_owned()))
        .path("/")
        .secure(true)
        .http_only(true)
        .expires(OffsetDateTime::UNIX_EPOCH + Duration::SECOND)
        .build()
}

/// Format a `Cookie` request header from the non-empty pairs given.
///
/// Returns `None` if there is nothing to send.
pub fn request_cookie_header(pairs: &[(&str, &str)]) -> Option<String> {
    let header = pairs
        .iter()
        .filter(|&&(_, value)| !value.is_empty())
        .map(|&(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ");

    if header.is_empty() {
        None
    } else {
        Some(header)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn short_and_empty_values_dropped() {
        let cookies = parse_cookies(&["a=bcdefg; Path=/", "b=x; Path=/"]);
        assert_eq!(1, cookies.len());
        assert_eq!(Some(&"bcdefg".to_owned()), cookies.get("a"));

        // Exactly five characters is still a placeholder
        let cookies = parse_cookies(&["a=bcdef; Path=/", "b=x; Path=/"]);
        assert!(cookies.is_empty());

        let cookies = parse_cookies(&[
            "=orphaned-value; path=/",
            "noequals; path=/",
            "gone=-del-; expires=Thu, 01-Jan-1970 00:00:01 GMT",
            "empty=; path=/",
        ]);
        assert!(cookies.is_empty());
    }

    #[test]
    fn line_without_attributes_accepted() {
        let cookies = parse_cookies(&[
            "remote-session-id=abcdef123456",
            "remote-session-auth=xyz987654321;",
        ]);
        assert_eq!(2, cookies.len());
        assert_eq!("abcdef123456", cookies["remote-session-id"]);
        assert_eq!("xyz987654321", cookies["remote-session-auth"]);
    }

    #[test]
    fn webmail_cookies_extracted() {
        let cookies = parse_cookies(&[
            "remote-session-id=h5s3o6qasjhbd6bq4gfrl5amh2; path=/; secure; \
             HttpOnly",
            "remote-session-auth=-del-; expires=Thu, 01-Jan-1970 00:00:01 GMT",
            "remote-session-auth=xyz987654321; path=/; secure; HttpOnly",
            "language=en_US",
        ]);
        assert_eq!(2, cookies.len());
        assert_eq!("h5s3o6qasjhbd6bq4gfrl5amh2", cookies["remote-session-id"]);
        assert_eq!("xyz987654321", cookies["remote-session-auth"]);
        assert!(!cookies.contains_key("language"));
    }

    #[test]
    fn outbound_cookies() {
        let set = session_cookie("remote-session-id", "abcdef123456");
        let rendered = set.to_string();
        assert!(rendered.starts_with("remote-session-id=abcdef123456"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Path=/"));
        assert!(set.expires().is_none());

        let expired = expired_cookie("remote-session-id");
        assert_eq!(DELETED, expired.value());
        assert!(expired.expires_datetime().unwrap() < OffsetDateTime::now_utc());
        assert!(expired.to_string().contains("1970"));
    }

    #[test]
    fn request_header() {
        assert_eq!(None, request_cookie_header(&[("a", ""), ("b", "")]));
        assert_eq!(
            Some("a=123456".to_owned()),
            request_cookie_header(&[("a", "123456"), ("b", "")])
        );
        assert_eq!(
            Some("a=123456; b=654321".to_owned()),
            request_cookie_header(&[("a", "123456"), ("b", "654321")])
        );
    }

    #[test]
    fn names_from_config() {
        let config = crate::support::system_config::BridgeConfig::from_toml(
            "internal_address = \"https://x/\"\n\
             [cookies]\n\
             session_auth = \"roundcube_sessauth\"\n",
        )
        .unwrap();
        let names = CookieNames::from_config(&config);
        assert_eq!(DEFAULT_SESSION_ID, names.session_id);
        assert_eq!("roundcube_sessauth", names.session_auth);
        assert_eq!(DEFAULT_PASSPHRASE, names.all()[0]);
    }

    proptest! {
        #[test]
        fn kept_cookies_are_long_and_named(
            lines in prop::collection::vec("[a-z_]{0,8}(=[a-z0-9-]{0,12})?(; path=/)?", 0..8),
        ) {
            let cookies = parse_cookies(&lines);
            for (name, value) in &cookies {
                prop_assert!(!name.is_empty());
                prop_assert!(value.len() > MAX_PLACEHOLDER_LEN);
                prop_assert!(!value.contains(';'));
                let prefix = format!("{}={}", name, value);
                prop_assert!(lines.iter().any(|l| l.starts_with(&prefix)));
            }
        }
    }
}
