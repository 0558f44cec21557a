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

//! Decides what the host's webmail page shows.

use super::SessionBridge;
use crate::support::error::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    /// The user has nothing resembling an e-mail address to log in with.
    NoEmail { user: String },
    /// The webmail login failed; details are in the log.
    LoginFailed,
    /// Frame the webmail UI.
    Embed {
        url: String,
        /// Origin the host must permit as a frame source, if known.
        frame_domain: Option<String>,
        show_top_line: bool,
    },
}

/// Log in to the webmail server for the current user and decide how the page
/// should be rendered.
pub fn render(bridge: &mut SessionBridge<'_>) -> PageOutcome {
    if let Err(Error::NotAnEmail(user)) = bridge.email() {
        return PageOutcome::NoEmail { user };
    }

    match bridge.try_login() {
        Err(_) => PageOutcome::LoginFailed,
        Ok(state) => PageOutcome::Embed {
            url: state.internal_address,
            frame_domain: Some(state.public_server).filter(|s| !s.is_empty()),
            show_top_line: bridge.show_top_line(),
        },
    }
}

#[cfg(test)]
mod test {
    use super::super::test::Env;
    use super::*;
    use crate::remote::login::test::{html_response, redirect_response};
    use crate::test_data::{LOGIN_FAILED_HTML, LOGIN_PAGE_HTML};

    #[test]
    fn user_without_email_gets_placeholder() {
        let mut env = Env::new("alice", None);
        assert_eq!(
            PageOutcome::NoEmail {
                user: "alice".to_owned()
            },
            render(&mut env.bridge())
        );
        assert!(env.connector.options.borrow().is_empty());
    }

    #[test]
    fn successful_login_embeds_webmail() {
        let mut env = Env::new("alice", Some("alice@example.com"));
        env.config.show_top_line = true;
        assert!(env.bridge().on_host_login("alice", &Env::password()));
        env.script(vec![
            Ok(html_response(
                &["remote-session-id=abcdef123456; path=/"],
                LOGIN_PAGE_HTML,
            )),
            Ok(redirect_response(&[
                "remote-session-auth=xyz987654321; path=/",
            ])),
        ]);

        assert_eq!(
            PageOutcome::Embed {
                url: "https://mail.example.com/rc/".to_owned(),
                frame_domain: Some("https://mail.example.com".to_owned()),
                show_top_line: true,
            },
            render(&mut env.bridge())
        );
    }

    #[test]
    fn failed_login_shows_placeholder() {
        let mut env = Env::new("alice@example.com", None);
        assert!(env
            .bridge()
            .on_host_login("alice@example.com", &Env::password()));
        env.script(vec![
            Ok(html_response(&[], LOGIN_PAGE_HTML)),
            Ok(html_response(&[], LOGIN_FAILED_HTML)),
        ]);

        assert_eq!(PageOutcome::LoginFailed, render(&mut env.bridge()));
    }

    #[test]
    fn missing_credential_shows_placeholder() {
        let mut env = Env::new("alice@example.com", None);
        assert_eq!(PageOutcome::LoginFailed, render(&mut env.bridge()));
    }
}
