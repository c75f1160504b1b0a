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

//! Thin boundary around the `git` executable.
//!
//! Everything that touches the object store (the note store, the mail
//! archive) goes through the `Git` trait so that tests can interpose on
//! individual commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use crate::support::error::Error;

/// The captured result of one `git` invocation.
#[derive(Clone, Debug, Default)]
pub struct GitOutput {
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        Some(0) == self.status
    }

    /// Standard output as text with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_owned()
    }

    /// Convert a non-zero exit into `Error::GitCommand`.
    pub fn check(self, args: &[&str]) -> Result<Self, Error> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::GitCommand {
                command: args.join(" "),
                status: self.status,
                stderr: self.stderr.trim().to_owned(),
            })
        }
    }
}

/// Runs `git` subcommands against one repository.
pub trait Git {
    /// Run `git <args>`, feeding `stdin` if given.
    ///
    /// A non-zero exit status is not an error at this level; callers inspect
    /// `GitOutput::status` or use `GitOutput::check()`. Only failure to run
    /// the process at all is reported as `Err`.
    fn run(&self, args: &[&str], stdin: Option<&[u8]>)
        -> Result<GitOutput, Error>;

    /// Run `git <args>` and require it to succeed.
    fn run_ok(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<GitOutput, Error> {
        self.run(args, stdin)?.check(args)
    }
}

/// `Git` implementation which spawns the system `git` binary.
#[derive(Clone, Debug)]
pub struct ProcessGit {
    dir: PathBuf,
    identity: Option<(String, String)>,
    env: Vec<(String, String)>,
}

impl ProcessGit {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        ProcessGit {
            dir: dir.as_ref().to_owned(),
            identity: None,
            env: Vec::new(),
        }
    }

    /// Record commits (e.g. note commits) under the given name and email
    /// rather than whatever the repository configuration says.
    pub fn with_identity(mut self, name: String, email: String) -> Self {
        self.identity = Some((name, email));
        self
    }

    /// Set an extra environment variable for every command. Locale
    /// variables are overridden regardless.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Git for ProcessGit {
    fn run(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<GitOutput, Error> {
        debug!("git {} (in {})", args.join(" "), self.dir.display());

        let mut command = Command::new("git");
        command
            .args(args)
            .current_dir(&self.dir)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some((ref name, ref email)) = self.identity {
            command
                .env("GIT_AUTHOR_NAME", name)
                .env("GIT_AUTHOR_EMAIL", email)
                .env("GIT_COMMITTER_NAME", name)
                .env("GIT_COMMITTER_EMAIL", email);
        }

        for (key, value) in &self.env {
            command.env(key, value);
        }
        // Diagnostics are matched on, so they must not be translated
        command
            .env("LC_ALL", "C")
            .env("LANG", "C")
            .env_remove("LANGUAGE");

        let mut child = command.spawn()?;
        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input)?;
            }
        }

        let output = child.wait_with_output()?;
        Ok(GitOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub mod test_support {
    use std::path::Path;

    use super::*;

    /// Create a fresh repository in `dir` with a fixed identity.
    pub fn init_repo(dir: &Path, bare: bool) -> ProcessGit {
        let git = ProcessGit::new(dir)
            .with_identity("Test".to_owned(), "test@example.com".to_owned());
        let mut args = vec!["init", "-q"];
        if bare {
            args.push("--bare");
        }
        git.run_ok(&args, None).unwrap();
        git
    }

    /// Commit `content` as `file` on the current branch of a non-bare
    /// repository and return the new commit id.
    pub fn commit_file(
        git: &ProcessGit,
        file: &str,
        content: &[u8],
        message: &str,
    ) -> String {
        std::fs::write(git.dir().join(file), content).unwrap();
        git.run_ok(&["add", file], None).unwrap();
        git.run_ok(&["commit", "-q", "-m", message], None).unwrap();
        git.run_ok(&["rev-parse", "HEAD"], None)
            .unwrap()
            .stdout_trimmed()
    }
}

#[cfg(test)]
mod test {
    use super::test_support::*;
    use super::*;

    #[test]
    fn runs_commands_with_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let git = init_repo(dir.path(), false);

        let first = git
            .run_ok(&["hash-object", "--stdin"], Some(b"hello\n"))
            .unwrap()
            .stdout_trimmed();
        // Well-known blob id for "hello\n"
        assert_eq!("ce013625030ba8dba906f756967f9e9ca394464a", first);
    }

    #[test]
    fn nonzero_exit_is_reported_by_check() {
        let dir = tempfile::tempdir().unwrap();
        let git = init_repo(dir.path(), false);

        let output = git
            .run(&["rev-parse", "--verify", "-q", "refs/heads/nope"], None)
            .unwrap();
        assert!(!output.success());
        assert_matches!(
            Err(Error::GitCommand { .. }),
            git.run_ok(&["rev-parse", "--verify", "refs/heads/nope"], None)
        );
    }

    #[test]
    fn diagnostics_are_untranslated() {
        let dir = tempfile::tempdir().unwrap();
        let git = init_repo(dir.path(), false)
            .with_env("LANGUAGE", "de")
            .with_env("LC_ALL", "de_DE.UTF-8")
            .with_env("LANG", "de_DE.UTF-8");

        let output = git
            .run(&["rev-parse", "--verify", "refs/heads/nope"], None)
            .unwrap();
        assert!(!output.success());
        assert!(
            output.stderr.contains("Needed a single revision"),
            "stderr: {}",
            output.stderr
        );
    }

    #[test]
    fn commits_use_configured_identity() {
        let dir = tempfile::tempdir().unwrap();
        let git = init_repo(dir.path(), false);
        commit_file(&git, "f", b"x", "first");

        let author = git
            .run_ok(&["log", "-1", "--format=%an <%ae>"], None)
            .unwrap()
            .stdout_trimmed();
        assert_eq!("Test <test@example.com>", author);
    }
}
