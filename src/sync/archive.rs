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

//! Access to the mail archive: a repository with one message per commit.

use log::debug;

use crate::git::Git;
use crate::support::error::Error;
use crate::support::system_config::ArchiveConfig;

/// A linear history of archived messages.
pub trait MailArchive {
    /// The newest commit of the archive.
    fn tip(&self) -> Result<String, Error>;

    /// The commits after `since` up to and including `tip`, oldest first.
    ///
    /// With no `since`, the whole history up to `tip` is returned.
    fn commits_since(
        &self,
        since: Option<&str>,
        tip: &str,
    ) -> Result<Vec<String>, Error>;

    /// The raw message added by `commit`, or `None` if the commit does not
    /// carry one (e.g. it deleted a spam message).
    fn read_message(&self, commit: &str) -> Result<Option<Vec<u8>>, Error>;
}

/// `MailArchive` backed by a public-inbox style git repository.
pub struct GitArchive<G> {
    git: G,
    branch: String,
    message_file: String,
}

impl<G: Git> GitArchive<G> {
    pub fn new(git: G, config: &ArchiveConfig) -> Self {
        GitArchive {
            git,
            branch: config.branch.clone(),
            message_file: config.message_file.clone(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, Error> {
        self.git
            .run_ok(args, None)
            .map(|output| output.stdout)
            .map_err(|e| Error::FatalEnumeration(e.to_string()))
    }
}

impl<G: Git> MailArchive for GitArchive<G> {
    fn tip(&self) -> Result<String, Error> {
        let rev = format!("{}^{{commit}}", self.branch);
        let out = self.run(&["rev-parse", "--verify", &rev])?;
        Ok(String::from_utf8_lossy(&out).trim().to_owned())
    }

    fn commits_since(
        &self,
        since: Option<&str>,
        tip: &str,
    ) -> Result<Vec<String>, Error> {
        let range = match since {
            Some(since) => format!("{}..{}", since, tip),
            None => tip.to_owned(),
        };
        let out = self.run(&["rev-list", "--reverse", &range])?;
        Ok(String::from_utf8_lossy(&out)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn read_message(&self, commit: &str) -> Result<Option<Vec<u8>>, Error> {
        let object = format!("{}:{}", commit, self.message_file);
        let exists = self
            .git
            .run(&["cat-file", "-e", &object], None)
            .map_err(|e| Error::FatalEnumeration(e.to_string()))?;
        if !exists.success() {
            debug!("Commit {} has no {}", commit, self.message_file);
            return Ok(None);
        }

        self.run(&["cat-file", "blob", &object]).map(Some)
    }
}
