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

use std::collections::HashMap;

/// Response headers, keyed by lower-cased name.
///
/// Repeated headers keep every value in the order received.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseHeaders(HashMap<String, Vec<String>>);

impl ResponseHeaders {
    /// All values of the header `name`, which must be lower case.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get(name).map(|v| &v[..]).unwrap_or(&[])
    }

    /// The first value of the header `name`, which must be lower case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(|s| &**s)
    }

    pub fn push(&mut self, name: &str, value: String) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_insert_with(Vec::new)
            .push(value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse a raw header block into a `ResponseHeaders`.
///
/// Each line is split at the first `": "`. Lines without one (such as the
/// status line) are ignored.
pub fn parse_response_headers(raw: &str) -> ResponseHeaders {
    let mut headers = ResponseHeaders::default();
    for line in raw.trim().lines() {
        let line = line.trim_end_matches('\r');
        if let Some((name, value)) = split_once(line, ": ") {
            if !name.is_empty() {
                headers.push(name, value.to_owned());
            }
        }
    }

    headers
}

/// Split a complete HTTP response into its header block and body.
///
/// If there is no blank line, the whole input is taken to be headers.
pub fn split_response(raw: &str) -> (&str, &str) {
    if let Some((head, body)) = split_once(raw, "\r\n\r\n") {
        (head, body)
    } else if let Some((head, body)) = split_once(raw, "\n\n") {
        (head, body)
    } else {
        (raw, "")
    }
}

fn split_once<'a>(s: &'a str, delim: &str) -> Option<(&'a str, &'a str)> {
    s.find(delim).map(|ix| (&s[..ix], &s[ix + delim.len()..]))
}

#[cfg(test)]
mod test {
    use super::*;

    static LOGIN_PAGE_HEAD: &str = "HTTP/1.1 200 OK\r\n\
        Date: Tue, 19 Mar 2019 15:19:28 GMT\r\n\
        Server: Apache/2.2.22 (Debian)\r\n\
        Cache-Control: private, no-cache, no-store, must-revalidate\r\n\
        Content-Type: text/html; charset=UTF-8\r\n\
        Set-Cookie: remote-session-id=h5s3o6qasjhbd6bq4gfrl5amh2; path=/; secure; HttpOnly\r\n\
        set-cookie: remote-session-auth=-del-; expires=Thu, 01-Jan-1970 00:00:01 GMT; path=/\r\n\
        Transfer-Encoding: chunked\r\n";

    #[test]
    fn parse_login_page_headers() {
        let headers = parse_response_headers(LOGIN_PAGE_HEAD);
        assert_eq!(6, headers.len());
        assert_eq!(
            Some("text/html; charset=UTF-8"),
            headers.get("content-type")
        );
        assert_eq!(
            &[
                "remote-session-id=h5s3o6qasjhbd6bq4gfrl5amh2; path=/; \
                 secure; HttpOnly"
                    .to_owned(),
                "remote-session-auth=-del-; expires=Thu, 01-Jan-1970 \
                 00:00:01 GMT; path=/"
                    .to_owned(),
            ][..],
            headers.get_all("set-cookie")
        );
        assert!(headers.get_all("x-missing").is_empty());
    }

    #[test]
    fn value_split_at_first_separator() {
        let headers = parse_response_headers("X-Thing: a: b\nBroken\n:x\n");
        assert_eq!(Some("a: b"), headers.get("x-thing"));
        assert_eq!(1, headers.len());
    }

    #[test]
    fn split_raw_response() {
        assert_eq!(
            ("HTTP/1.1 200 OK\r\nA: b", "<html>\r\n\r\n</html>"),
            split_response("HTTP/1.1 200 OK\r\nA: b\r\n\r\n<html>\r\n\r\n</html>")
        );
        assert_eq!(("H: v", "body"), split_response("H: v\n\nbody"));
        assert_eq!(("H: v", ""), split_response("H: v"));
    }
}
