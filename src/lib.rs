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

//! Single sign-on from a host web application into a Roundcube-style
//! webmail server.
//!
//! When the user logs in to the host, `bridge::SessionBridge` stashes their
//! password in split custody: an RSA-encrypted copy and the passphrase
//! unlocking the private key go to the browser as cookies, while the locked
//! private key stays in the host's session. When the webmail page is later
//! requested, the password is recovered and replayed against the webmail
//! login form, and the webmail session cookies are handed to the browser.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod bridge;
pub mod cli;
pub mod codec;
pub mod crypt;
pub mod host;
pub mod remote;
pub mod support;

#[cfg(test)]
mod test_data;
