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

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;
use crate::codec::cookies::{DEFAULT_SESSION_AUTH, DEFAULT_SESSION_ID};
use crate::crypt::custody::{MAX_RSA_BITS, MIN_RSA_BITS};
use crate::host::{setting, ConfigProvider};

const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// Configuration for the webmail bridge.
///
/// This is typically stored in a file named `mailbridge.toml`. Hosts that
/// keep their own settings store can instead implement `ConfigProvider`
/// directly; this struct is simply one such provider.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// The URL of the webmail installation as reachable from the host
    /// application's server, e.g. `https://mail.example.com/roundcube/`.
    ///
    /// The login queries are appended verbatim, so this should end with `/`
    /// or name the webmail entry script.
    pub internal_address: String,

    /// The origin under which browsers reach the webmail server.
    ///
    /// The host must allow this origin to be framed. If empty, the origin of
    /// `internal_address` is used.
    #[serde(default)]
    pub public_server: String,

    /// Whether to verify the webmail server's TLS certificate.
    ///
    /// Turning this off is only reasonable for servers reached over a trusted
    /// internal network. Every request made with verification disabled is
    /// logged as a warning.
    #[serde(default = "default_true")]
    pub enable_ssl_verify: bool,

    /// Whether the embedding page shows the host's top navigation line.
    #[serde(default)]
    pub show_top_line: bool,

    /// Timeout for each request to the webmail server.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Size of the one-time RSA keys protecting the stashed password.
    #[serde(default = "default_rsa_bits")]
    pub rsa_bits: u32,

    #[serde(default)]
    pub cookies: CookieConfig,
}

/// Names of the cookies the webmail server uses for its own session.
///
/// These must match the webmail server's configuration, since the browser
/// presents the very same cookies to it once the bridge has logged in.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    pub session_id: String,
    pub session_auth: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        CookieConfig {
            session_id: DEFAULT_SESSION_ID.to_owned(),
            session_auth: DEFAULT_SESSION_AUTH.to_owned(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    60
}

fn default_rsa_bits() -> u32 {
    2048
}

impl BridgeConfig {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let config: BridgeConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let mut text = String::new();
        fs::File::open(path)
            .and_then(|f| f.take(MAX_CONFIG_FILE_SIZE).read_to_string(&mut text))
            .map_err(|e| {
                Error::Config(format!("reading '{}': {}", path.display(), e))
            })?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<(), Error> {
        url::Url::parse(&self.internal_address)?;
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be positive".to_owned(),
            ));
        }
        if self.rsa_bits < MIN_RSA_BITS || self.rsa_bits > MAX_RSA_BITS {
            return Err(Error::Config(format!(
                "rsa_bits must be between {} and {}",
                MIN_RSA_BITS, MAX_RSA_BITS
            )));
        }
        if self.cookies.session_id.is_empty()
            || self.cookies.session_auth.is_empty()
        {
            return Err(Error::Config("cookie names must not be empty".to_owned()));
        }

        Ok(())
    }
}

impl ConfigProvider for BridgeConfig {
    fn bool_setting(&self, name: &str) -> Option<bool> {
        match name {
            setting::ENABLE_SSL_VERIFY => Some(self.enable_ssl_verify),
            setting::SHOW_TOP_LINE => Some(self.show_top_line),
            _ => None,
        }
    }

    fn string_setting(&self, name: &str) -> Option<String> {
        let value = match name {
            setting::INTERNAL_ADDRESS => self.internal_address.clone(),
            setting::PUBLIC_SERVER => self.public_server.clone(),
            setting::REQUEST_TIMEOUT_SECS => {
                self.request_timeout_secs.to_string()
            }
            setting::RSA_BITS => self.rsa_bits.to_string(),
            setting::SESSION_ID_COOKIE => self.cookies.session_id.clone(),
            setting::SESSION_AUTH_COOKIE => self.cookies.session_auth.clone(),
            _ => return None,
        };

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_applied() {
        let config = BridgeConfig::from_toml(
            "internal_address = \"https://mail.example.com/rc/\"\n",
        )
        .unwrap();
        assert!(config.enable_ssl_verify);
        assert!(!config.show_top_line);
        assert_eq!(60, config.request_timeout_secs);
        assert_eq!(2048, config.rsa_bits);
        assert_eq!(DEFAULT_SESSION_ID, config.cookies.session_id);
        assert_eq!(None, config.string_setting(setting::PUBLIC_SERVER));
        assert_eq!(
            Some("60".to_owned()),
            config.string_setting(setting::REQUEST_TIMEOUT_SECS)
        );
        assert_eq!(Some(true), config.bool_setting(setting::ENABLE_SSL_VERIFY));
        assert_eq!(None, config.bool_setting("nonsense"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "internal_address = \"http://127.0.0.1:8080/\"\n\
             enable_ssl_verify = false\n\
             [cookies]\n\
             session_id = \"roundcube_sessid\"\n"
        )
        .unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert!(!config.enable_ssl_verify);
        assert_eq!("roundcube_sessid", config.cookies.session_id);
        assert_eq!(DEFAULT_SESSION_AUTH, config.cookies.session_auth);
    }

    #[test]
    fn invalid_configs_rejected() {
        assert_matches!(
            Err(Error::Config(..)),
            BridgeConfig::from_toml("internal_address = \"not a url\"\n")
        );
        assert_matches!(
            Err(Error::Config(..)),
            BridgeConfig::from_toml("enable_ssl_verify = true\n")
        );
        assert_matches!(
            Err(Error::Config(..)),
            BridgeConfig::from_toml(
                "internal_address = \"https://x/\"\nrequest_timeout_secs = 0\n"
            )
        );
        assert_matches!(
            Err(Error::Config(..)),
            BridgeConfig::from_toml(
                "internal_address = \"https://x/\"\nrsa_bits = 512\n"
            )
        );
        assert_matches!(
            Err(Error::Config(..)),
            BridgeConfig::from_toml(
                "internal_address = \"https://x/\"\nrsa_bits = 65536\n"
            )
        );
        assert_matches!(
            Err(Error::Config(..)),
            BridgeConfig::load(Path::new("/nonexistent/mailbridge.toml"))
        );
    }
}
