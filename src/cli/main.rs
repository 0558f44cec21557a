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

use std::path::{Path, PathBuf};

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use structopt::clap;
use structopt::StructOpt;

use crate::bridge::derive_public_server;
use crate::support::sysexits::*;
use crate::support::system_config::BridgeConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Log in to the webmail server the way the bridge does for a browser.
    ///
    /// This prompts for the user's password, stashes it exactly as a host
    /// login would, then recovers it and performs the webmail login. Only the
    /// names of the cookies the browser would receive are printed.
    Probe(ProbeSubcommand),
    /// Validate a configuration file and show the effective settings.
    CheckConfig(CommonOptions),
}

#[derive(StructOpt)]
pub(super) struct CommonOptions {
    /// Path to `mailbridge.toml`
    #[structopt(long, short, parse(from_os_str))]
    pub(super) config: PathBuf,
}

#[derive(StructOpt)]
pub(super) struct ProbeSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// The host user id to log in as
    #[structopt(long, short)]
    pub(super) user: String,

    /// The e-mail address in the user's profile, if any
    #[structopt(long, short)]
    pub(super) email: Option<String>,

    /// log4rs configuration file [default: log to stderr]
    #[structopt(long, parse(from_os_str))]
    pub(super) log_config: Option<PathBuf>,

    /// Log at debug level when logging to stderr
    #[structopt(long, short)]
    pub(super) verbose: bool,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    match cmd {
        Command::Probe(cmd) => super::probe::probe(cmd),
        Command::CheckConfig(cmd) => check_config(cmd),
    }
}

fn check_config(cmd: CommonOptions) {
    let config = load_config(&cmd.config);
    let server = if config.public_server.is_empty() {
        match derive_public_server(&config.internal_address) {
            Ok(server) => server,
            Err(e) => die!(EX_CONFIG, "Error in '{}': {}", cmd.config.display(), e),
        }
    } else {
        config.public_server.clone()
    };

    println!("Internal address: {}", config.internal_address);
    println!("Public server:    {}", server);
    if !config.enable_ssl_verify {
        println!("WARNING: TLS certificate verification is disabled");
    }

    match toml::to_string(&config) {
        Ok(text) => print!("\n{}", text),
        Err(e) => die!(EX_SOFTWARE, "Failed to render configuration: {}", e),
    }
}

pub(super) fn load_config(path: &Path) -> BridgeConfig {
    match BridgeConfig::load(path) {
        Ok(config) => config,
        Err(e) => die!(EX_CONFIG, "Error in config file at '{}': {}", path.display(), e),
    }
}

pub(super) fn init_logging(log_config: Option<&Path>, verbose: bool) {
    if let Some(path) = log_config {
        if let Err(e) =
            log4rs::init_file(path, log4rs::file::Deserializers::new())
        {
            die!(
                EX_CONFIG,
                "Failed to initialise logging from '{}': {}",
                path.display(),
                e
            );
        }
        return;
    }

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S%.3f)} [{l}][{t}] {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level));

    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                die!(EX_SOFTWARE, "Failed to initialise logging: {}", e);
            }
        }
        Err(e) => die!(EX_SOFTWARE, "Failed to initialise logging: {}", e),
    }
}
