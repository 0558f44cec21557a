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

use crate::bridge::page::{self, PageOutcome};
use crate::bridge::{Host, SessionBridge};
use crate::crypt::custody::Password;
use crate::host::memory::*;
use crate::remote::transport::HttpConnector;
use crate::support::sysexits::*;

use super::main::*;

/// The request path host logins are attributed to.
const PROBE_PATH: &str = "/index.php/login";

pub(super) fn probe(cmd: ProbeSubcommand) {
    let config = load_config(&cmd.common.config);
    init_logging(cmd.log_config.as_deref(), cmd.verbose);

    let password = match rpassword::read_password_from_tty(Some("Password: "))
    {
        Ok(p) => Password::new(p),
        Err(e) => die!(EX_NOINPUT, "Failed to read password: {}", e),
    };

    let mut session = MemorySessionStore::new();
    let mut cookies = MemoryCookieJar::new();
    let user = StaticUser {
        uid: cmd.user.clone(),
        email: cmd.email.clone(),
    };
    let request = StaticRequest(PROBE_PATH.to_owned());
    let connector = HttpConnector;

    let mut bridge = SessionBridge::new(
        Host {
            session: &mut session,
            cookies: &mut cookies,
            users: &user,
            request: &request,
            config: &config,
        },
        &connector,
    );

    if !bridge.on_host_login(&cmd.user, &password) {
        die!(EX_CONFIG, "Could not prepare the login; see the log for details");
    }

    match page::render(&mut bridge) {
        PageOutcome::NoEmail { user } => {
            die!(EX_NOUSER, "User '{}' has no e-mail address", user)
        }
        PageOutcome::LoginFailed => {
            die!(EX_NOPERM, "Webmail login failed; see the log for details")
        }
        PageOutcome::Embed {
            url, frame_domain, ..
        } => {
            println!("Logged in to {}", url);
            if let Some(frame_domain) = frame_domain {
                println!("Frame source: {}", frame_domain);
            }
        }
    }

    println!("Cookies held by the browser:");
    for name in cookies.names() {
        println!("  {}", name);
    }
}
