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

//! The boundary to the code-hosting platform.

use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

/// Identifies a comment on the hosting platform.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One commit of a pull request as the host currently sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestCommit {
    /// The patch identity, stable across rebases.
    pub identity: String,
    /// The commit currently carrying that patch.
    pub position: String,
}

/// The operations on pull requests needed to mirror mail onto them.
///
/// Any failure is treated as a transport problem affecting only the message
/// being mirrored.
pub trait PullRequestHost {
    fn post_top_level_comment(
        &mut self,
        pull_request: &str,
        text: &str,
    ) -> Result<CommentId, Error>;

    fn post_threaded_reply(
        &mut self,
        pull_request: &str,
        parent: CommentId,
        text: &str,
    ) -> Result<CommentId, Error>;

    /// The commits currently in `pull_request`, oldest first.
    fn pull_request_commits(
        &mut self,
        pull_request: &str,
    ) -> Result<Vec<PullRequestCommit>, Error>;
}

/// A host which only logs what would have been posted.
///
/// Comment ids are handed out sequentially from 1. Pull requests have no
/// known commits, so no patch reply is ever considered outdated.
pub struct DryRunHost {
    log_prefix: LogPrefix,
    next_id: u64,
}

impl DryRunHost {
    pub fn new(log_prefix: LogPrefix) -> Self {
        DryRunHost {
            log_prefix,
            next_id: 1,
        }
    }

    fn allocate(&mut self) -> CommentId {
        let id = CommentId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl PullRequestHost for DryRunHost {
    fn post_top_level_comment(
        &mut self,
        pull_request: &str,
        text: &str,
    ) -> Result<CommentId, Error> {
        let id = self.allocate();
        info!(
            "{} [dry-run] Would comment on {} (as #{}):\n{}",
            self.log_prefix, pull_request, id, text
        );
        Ok(id)
    }

    fn post_threaded_reply(
        &mut self,
        pull_request: &str,
        parent: CommentId,
        text: &str,
    ) -> Result<CommentId, Error> {
        let id = self.allocate();
        info!(
            "{} [dry-run] Would reply to comment #{} on {} (as #{}):\n{}",
            self.log_prefix, parent, pull_request, id, text
        );
        Ok(id)
    }

    fn pull_request_commits(
        &mut self,
        _pull_request: &str,
    ) -> Result<Vec<PullRequestCommit>, Error> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dry_run_allocates_sequential_ids() {
        crate::init_test_log();

        let mut host = DryRunHost::new(LogPrefix::new("test".to_owned()));
        assert_eq!(
            CommentId(1),
            host.post_top_level_comment("pr", "hello").unwrap()
        );
        assert_eq!(
            CommentId(2),
            host.post_threaded_reply("pr", CommentId(1), "hi").unwrap()
        );
        assert!(host.pull_request_commits("pr").unwrap().is_empty());
    }
}
