//-
// Copyright (c) 2026, Jason Lingle
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
// You should have received a copy of the GNU General Public License along
// with Mailbridge. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::git::ProcessGit;
use crate::support::error::Error;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Parse one raw message and print its structured form as JSON.
    ///
    /// This has no side effects and needs no configuration. It is useful for
    /// checking how a message from the archive will be understood.
    ParseMessage(ParseMessageSubcommand),
    Sync(SyncSubcommand),
    /// Inspect or update the note store.
    Note(NoteSubcommand),
}

#[derive(StructOpt)]
pub(super) struct ParseMessageSubcommand {
    /// The file holding the message. "-" reads from stdin.
    #[structopt(parse(from_os_str), default_value = "-")]
    pub(super) input: PathBuf,
}

#[derive(StructOpt)]
pub(super) struct CommonOptions {
    /// The configuration file. `logging.toml` in the same directory, if
    /// present, configures logging when not running on a terminal.
    #[structopt(long, parse(from_os_str), default_value = "mailbridge.toml")]
    pub(super) config: PathBuf,

    /// Also log debug messages.
    #[structopt(short, long)]
    pub(super) verbose: bool,
}

/// Mirror mail archived since the last run onto pull requests.
///
/// Each new message in the archive which replies to a known cover letter,
/// patch, or previously mirrored reply is posted as a comment on the
/// corresponding pull request, and the checkpoint is advanced past
/// everything that was examined.
///
/// No hosting-platform client is built in, so this currently requires
/// --dry-run: comments are only logged, and nothing is written to the note
/// store.
#[derive(StructOpt)]
pub(super) struct SyncSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Log the comments that would be posted instead of posting them, and
    /// keep all note writes in memory.
    #[structopt(long)]
    pub(super) dry_run: bool,
}

#[derive(StructOpt)]
pub(super) enum NoteSubcommand {
    /// Print the value stored under a key.
    Get(NoteKeySubcommand),
    /// Print every fragment of a multi-valued key as a JSON array.
    Fragments(NoteKeySubcommand),
    /// Fast-forward the configured notes ref from another ref or remote.
    ///
    /// Only refs/notes/mail-sync, refs/notes/commit-to-mail, and
    /// refs/notes/mail-to-commit can be updated this way.
    Update(NoteUpdateSubcommand),
}

impl NoteSubcommand {
    fn common(&self) -> &CommonOptions {
        match *self {
            NoteSubcommand::Get(ref c) | NoteSubcommand::Fragments(ref c) => {
                &c.common
            }
            NoteSubcommand::Update(ref c) => &c.common,
        }
    }
}

#[derive(StructOpt)]
pub(super) struct NoteKeySubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// The key, e.g. a message id without angle brackets.
    pub(super) key: String,
}

#[derive(StructOpt)]
pub(super) struct NoteUpdateSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// The repository (path, URL, or remote name) to fetch the notes ref
    /// from.
    pub(super) source: String,
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
        Command::ParseMessage(cmd) => {
            init_logging(None, false);
            super::parse::parse_message(cmd);
        }
        Command::Sync(cmd) => {
            let config = load_config(&cmd.common);
            super::sync::sync(config, cmd);
        }
        Command::Note(cmd) => {
            let config = load_config(cmd.common());
            super::note::note(config, cmd);
        }
    }
}

fn load_config(common: &CommonOptions) -> SystemConfig {
    let mut config_toml = Vec::new();
    if let Err(e) = fs::File::open(&common.config)
        .and_then(|mut f| f.read_to_end(&mut config_toml))
    {
        eprintln!("Error reading '{}': {}", common.config.display(), e);
        EX_CONFIG.exit();
    }

    let config: SystemConfig = match toml::from_slice(&config_toml) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Error in config file at '{}': {}",
                common.config.display(),
                e
            );
            EX_CONFIG.exit()
        }
    };

    let config_dir = common
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    init_logging(Some(config_dir), common.verbose);

    config
}

/// Where log output goes.
#[derive(Clone, Debug, PartialEq, Eq)]
enum LogTarget {
    Console,
    File(PathBuf),
    Syslog,
}

/// Choose the log target. Commands without a configuration (`config_dir`
/// is `None`) and interactive runs always log to stderr.
fn log_target(config_dir: Option<&Path>, interactive: bool) -> LogTarget {
    let config_dir = match config_dir {
        Some(dir) if !interactive => dir,
        _ => return LogTarget::Console,
    };

    // Either log4rs or syslog, since there is no maintained log4rs syslog
    // appender
    let log_config_file = config_dir.join("logging.toml");
    if log_config_file.is_file() {
        LogTarget::File(log_config_file)
    } else {
        LogTarget::Syslog
    }
}

fn init_logging(config_dir: Option<&Path>, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let interactive = Ok(true) == nix::unistd::isatty(2);
    match log_target(config_dir, interactive) {
        LogTarget::Console => crate::init_simple_log(level),
        LogTarget::File(log_config_file) => {
            log4rs::init_file(
                log_config_file,
                log4rs::file::Deserializers::new(),
            )
            .expect("Failed to initialise logging");
        }
        LogTarget::Syslog => {
            let formatter = syslog::Formatter3164 {
                facility: syslog::Facility::LOG_MAIL,
                hostname: None,
                process: env!("CARGO_PKG_NAME").to_owned(),
                pid: nix::unistd::getpid().as_raw(),
            };

            match syslog::unix(formatter) {
                Ok(logger) => {
                    log::set_boxed_logger(Box::new(syslog::BasicLogger::new(
                        logger,
                    )))
                    .map(|_| log::set_max_level(level))
                    .expect("Failed to initialise logging");
                }
                Err(e) => {
                    crate::init_simple_log(level);
                    log::warn!(
                        "Failed to connect to syslog ({}); logging to stderr",
                        e
                    );
                }
            }
        }
    }
}

/// Open the repository holding the note store, recording note commits under
/// the configured identity if there is one.
pub(super) fn notes_git(config: &SystemConfig) -> ProcessGit {
    let git = ProcessGit::new(config.notes_path());
    match (&config.notes.author_name, &config.notes.author_email) {
        (Some(name), Some(email)) => {
            git.with_identity(name.clone(), email.clone())
        }
        _ => git,
    }
}

/// Report `e` and exit with the matching status.
pub(super) fn die(e: Error) -> ! {
    log::error!("{}", e);
    eprintln!("{}", e);
    Sysexit::for_error(&e).exit()
}
