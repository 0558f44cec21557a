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

//! The Session Bridge ties the host application's login lifecycle to the
//! webmail server's.
//!
//! - On host login, the password is put into split custody (see
//! `crypt::custody`) and the webmail addresses are resolved and cached.
//!
//! - When the webmail page is requested, the password is recovered and a
//! login against the webmail server is performed.
//!
//! - On host logout, the custody material and the webmail session cookies are
//! discarded.
//!
//! Failures never propagate out of here. Every public operation reports
//! success as a `bool` and logs whatever went wrong.

use std::time::Duration;

use lazy_static::lazy_static;
use log::{debug, error, info, warn};
use regex::Regex;
use url::Url;

use crate::codec::cookies::{expired_cookie, session_cookie, CookieNames};
use crate::crypt::custody::{
    self, generate_key_pair_with_bits, generate_token, public_encrypt,
    Passphrase, Password,
};
use crate::host::{
    setting, ConfigProvider, CookieJar, RequestContext, SessionStore,
    UserDirectory,
};
use crate::remote::login::{
    assume_success_without_login_form, AmbiguousPolicy, RemoteLogin,
    RemoteSessionState,
};
use crate::remote::transport::{Connector, TransportOptions};
use crate::support::{error::Error, log_prefix::LogPrefix};

pub mod page;

/// Host session key of the passphrase-locked private key.
pub const SESSION_PRIVATE_KEY: &str = "webmail-private-key";
/// Host session key of the webmail address as seen from the host's server.
pub const SESSION_INTERNAL_ADDRESS: &str = "webmail-internal-address";
/// Host session key of the webmail origin as seen from the browser.
pub const SESSION_SERVER: &str = "webmail-server";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

lazy_static! {
    /// Routes used by sync clients and other automation. Logins through
    /// these never lead to an interactive webmail session.
    static ref EXCLUDED_PATH: Regex = Regex::new(
        r"(/ocs/v\d\.php|/apps/calendar/caldav\.php|/apps/contacts/carddav\.php|/remote\.php/webdav)/"
    )
    .unwrap();
}

/// Whether `path` is a non-interactive API route.
pub fn is_excluded_path(path: &str) -> bool {
    EXCLUDED_PATH.is_match(path)
}

/// The origin browsers use to reach the webmail server, absent explicit
/// configuration.
pub fn derive_public_server(internal_address: &str) -> Result<String, Error> {
    let origin = Url::parse(internal_address)?.origin();
    if origin.is_tuple() {
        Ok(origin.ascii_serialization())
    } else {
        Err(Error::Config(format!(
            "cannot derive webmail origin from '{}'",
            internal_address
        )))
    }
}

/// Split-custody material for one password.
struct Stash {
    passphrase: Passphrase,
    ciphertext: String,
    private_key: String,
}

impl Stash {
    fn recover(&self) -> Result<Password, Error> {
        custody::private_decrypt(
            &self.ciphertext,
            &self.private_key,
            &self.passphrase,
        )
    }
}

/// Everything the bridge needs from the host for one request.
pub struct Host<'a> {
    pub session: &'a mut dyn SessionStore,
    pub cookies: &'a mut dyn CookieJar,
    pub users: &'a dyn UserDirectory,
    pub request: &'a dyn RequestContext,
    pub config: &'a dyn ConfigProvider,
}

pub struct SessionBridge<'a> {
    log_prefix: LogPrefix,
    host: Host<'a>,
    connector: &'a dyn Connector,
    names: CookieNames,
    ambiguous_policy: AmbiguousPolicy,
}

impl<'a> SessionBridge<'a> {
    pub fn new(host: Host<'a>, connector: &'a dyn Connector) -> Self {
        let names = CookieNames::from_config(host.config);
        SessionBridge {
            log_prefix: LogPrefix::new("webmail".to_owned()),
            host,
            connector,
            names,
            ambiguous_policy: assume_success_without_login_form,
        }
    }

    /// Override how a login response without an auth cookie is judged.
    pub fn set_ambiguous_policy(&mut self, policy: AmbiguousPolicy) {
        self.ambiguous_policy = policy;
    }

    /// Handle the host's post-login event.
    ///
    /// Returns `false` without touching any state if the login came through
    /// an API route, and `false` after logging if anything else prevents the
    /// credential from being stashed.
    pub fn on_host_login(&mut self, user_id: &str, password: &Password) -> bool {
        self.log_prefix.set_user(user_id.to_owned());
        match self.prepare(user_id, password) {
            Ok(_) => true,
            Err(e) => {
                self.report("Preparing webmail login", &e);
                false
            }
        }
    }

    fn prepare(
        &mut self,
        user_id: &str,
        password: &Password,
    ) -> Result<Stash, Error> {
        let path = self.host.request.request_path();
        if is_excluded_path(&path) {
            return Err(Error::ExcludedPath(path));
        }

        if !user_id.contains('@') {
            debug!(
                "{} User name is not an e-mail address; \
                 the user needs an e-mail address configured",
                self.log_prefix
            );
        }

        debug!("{} Preparing webmail login", self.log_prefix);
        let (internal, server) = self.resolve_addresses()?;
        let stash = self.stash_credential(password)?;
        self.host.session.set(SESSION_INTERNAL_ADDRESS, internal);
        self.host.session.set(SESSION_SERVER, server);
        Ok(stash)
    }

    /// Put `password` into split custody under a fresh passphrase and key.
    ///
    /// The cookies are only queued for the response, so the returned `Stash`
    /// is the only way to reach the new material within this request.
    fn stash_credential(&mut self, password: &Password) -> Result<Stash, Error> {
        let passphrase = generate_token();
        let pair = generate_key_pair_with_bits(&passphrase, self.rsa_bits())?;
        let ciphertext = public_encrypt(password, &pair.public_key)?;

        self.host
            .session
            .set(SESSION_PRIVATE_KEY, pair.private_key.clone());
        self.host.cookies.set(session_cookie(
            &self.names.passphrase,
            &passphrase.to_cookie_value(),
        ));
        self.host
            .cookies
            .set(session_cookie(&self.names.credential, &ciphertext));

        Ok(Stash {
            passphrase,
            ciphertext,
            private_key: pair.private_key,
        })
    }

    /// Log in to the webmail server with the stashed credential.
    ///
    /// On success, the browser holds the webmail session cookies.
    pub fn login(&mut self) -> bool {
        self.try_login().is_ok()
    }

    /// Like `login()`, but returns the webmail session.
    ///
    /// Errors have already been logged.
    pub fn try_login(&mut self) -> Result<RemoteSessionState, Error> {
        self.do_login().map_err(|e| {
            self.report("Webmail login", &e);
            e
        })
    }

    fn do_login(&mut self) -> Result<RemoteSessionState, Error> {
        let password = self.recover_password()?;
        self.login_as(&password)
    }

    fn login_as(
        &mut self,
        password: &Password,
    ) -> Result<RemoteSessionState, Error> {
        let email = self.user_email();
        self.log_prefix.set_user(email.clone());

        let (internal, server) = self.cached_addresses()?;
        let options = self.transport_options();
        let transport = self.connector.connect(&options, &self.log_prefix)?;

        RemoteLogin::new(
            self.log_prefix.clone(),
            transport,
            self.names.clone(),
            internal,
            server,
        )
        .with_ambiguous_policy(self.ambiguous_policy)
        .login(&email, password, &mut *self.host.cookies)
    }

    fn recover_password(&self) -> Result<Password, Error> {
        let passphrase = self
            .host
            .cookies
            .get(&self.names.passphrase)
            .ok_or(Error::MissingCredential("passphrase cookie"))?;
        let ciphertext = self
            .host
            .cookies
            .get(&self.names.credential)
            .ok_or(Error::MissingCredential("credential cookie"))?;
        let private_key = self
            .host
            .session
            .get(SESSION_PRIVATE_KEY)
            .ok_or(Error::MissingCredential("session private key"))?;

        Stash {
            passphrase: Passphrase::from_cookie(passphrase),
            ciphertext,
            private_key,
        }
        .recover()
    }

    /// End the webmail session along with the host session.
    pub fn logout(&mut self) -> bool {
        let email = self.user_email();
        self.log_prefix.set_user(email);

        self.host.session.remove(SESSION_PRIVATE_KEY);
        for name in &self.names.all() {
            self.host.cookies.set(expired_cookie(name));
        }

        info!("{} Webmail logout done", self.log_prefix);
        true
    }

    /// Handle a password change of `user_id` within the host.
    ///
    /// If `user_id` is the current user, the new password replaces the
    /// stashed one and a fresh webmail login is made with it. The login uses
    /// the material just stashed, since the browser has not yet seen the new
    /// cookies. Changes to other users' passwords (e.g. by an administrator)
    /// are ignored, since the current session is not theirs.
    pub fn on_host_password_changed(
        &mut self,
        user_id: &str,
        new_password: &Password,
    ) -> bool {
        if self.host.users.current_user_id() != user_id {
            debug!(
                "{} Ignoring password change of another user",
                self.log_prefix
            );
            return false;
        }

        self.log_prefix.set_user(user_id.to_owned());
        let result = self
            .prepare(user_id, new_password)
            .and_then(|stash| stash.recover())
            .and_then(|password| self.login_as(&password));
        match result {
            Ok(_) => true,
            Err(e) => {
                self.report("Refreshing webmail login", &e);
                false
            }
        }
    }

    /// The address to log in to the webmail server with.
    ///
    /// A user id that looks like an e-mail address wins; then the e-mail
    /// address from the user's profile; failing both, the bare user id.
    pub fn user_email(&self) -> String {
        let uid = self.host.users.current_user_id();
        if uid.contains('@') {
            return uid;
        }

        match self.host.users.current_user_email() {
            Some(email) if email.contains('@') => email,
            _ => uid,
        }
    }

    /// Like `user_email()`, but fails if the result does not even look like
    /// an e-mail address.
    pub fn email(&self) -> Result<String, Error> {
        let email = self.user_email();
        if email.contains('@') {
            Ok(email)
        } else {
            Err(Error::NotAnEmail(email))
        }
    }

    pub fn session_state(&self) -> Option<(String, String)> {
        let internal = self.host.session.get(SESSION_INTERNAL_ADDRESS)?;
        let server = self.host.session.get(SESSION_SERVER).unwrap_or_default();
        Some((internal, server))
    }

    pub fn show_top_line(&self) -> bool {
        self.host
            .config
            .bool_setting(setting::SHOW_TOP_LINE)
            .unwrap_or(false)
    }

    /// The addresses cached at host login, or freshly resolved ones if the
    /// session predates this bridge.
    fn cached_addresses(&mut self) -> Result<(String, String), Error> {
        if let Some(cached) = self.session_state() {
            return Ok(cached);
        }

        let (internal, server) = self.resolve_addresses()?;
        self.host
            .session
            .set(SESSION_INTERNAL_ADDRESS, internal.clone());
        self.host.session.set(SESSION_SERVER, server.clone());
        Ok((internal, server))
    }

    fn resolve_addresses(&self) -> Result<(String, String), Error> {
        let internal = self
            .host
            .config
            .string_setting(setting::INTERNAL_ADDRESS)
            .ok_or_else(|| Error::Config("internal_address not set".to_owned()))?;
        let derived = derive_public_server(&internal)?;
        let server = self
            .host
            .config
            .string_setting(setting::PUBLIC_SERVER)
            .unwrap_or(derived);

        Ok((internal, server))
    }

    fn transport_options(&self) -> TransportOptions {
        let verify_tls = self
            .host
            .config
            .bool_setting(setting::ENABLE_SSL_VERIFY)
            .unwrap_or(true);
        let timeout_secs = self
            .host
            .config
            .string_setting(setting::REQUEST_TIMEOUT_SECS)
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        TransportOptions {
            verify_tls,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn rsa_bits(&self) -> u32 {
        let configured = match self.host.config.string_setting(setting::RSA_BITS)
        {
            Some(s) => s,
            None => return custody::RSA_BITS,
        };

        match configured.parse::<u32>() {
            Ok(bits)
                if bits >= custody::MIN_RSA_BITS
                    && bits <= custody::MAX_RSA_BITS =>
            {
                bits
            }
            _ => {
                warn!(
                    "{} Ignoring rsa_bits '{}' outside {}..={}; using {}",
                    self.log_prefix,
                    configured,
                    custody::MIN_RSA_BITS,
                    custody::MAX_RSA_BITS,
                    custody::RSA_BITS
                );
                custody::RSA_BITS
            }
        }
    }

    fn report(&self, what: &str, e: &Error) {
        if e.is_benign() {
            debug!("{} {} skipped: {}", self.log_prefix, what, e);
            return;
        }

        match *e {
            Error::MissingCredential(..) => {
                info!("{} {} not possible: {}", self.log_prefix, what, e)
            }
            Error::LoginRejected | Error::NotAnEmail(..) => {
                warn!("{} {} failed: {}", self.log_prefix, what, e)
            }
            _ => error!("{} {} failed: {}", self.log_prefix, what, e),
        }
    }
}
