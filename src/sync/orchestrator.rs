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

//! Mirrors newly archived mail onto the pull requests it replies to.

use log::{debug, error, info, warn};

use super::archive::MailArchive;
use super::host::PullRequestHost;
use super::metadata::{
    thread_key, MailMetadata, MirrorState, PatchMailMetadata, PatchRef,
    ReplyMetadata,
};
use crate::mime::message::{parse_message, MailRecord};
use crate::mime::threading::nearest_known;
use crate::notes::NoteStore;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::SystemConfig;

/// Counts from one archive walk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Messages read from the archive.
    pub examined: usize,
    /// Messages mirrored onto a pull request.
    pub mirrored: usize,
    /// Messages which had already been handled.
    pub duplicates: usize,
    /// Messages not belonging to any known pull request.
    pub unrelated: usize,
    /// Messages dropped because of an error.
    pub skipped: usize,
    /// The archive commit the mirror state now points to.
    pub checkpoint: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Classification {
    NoIdentifier,
    AlreadySeen,
    Unrelated,
    CoverLetterReply { pull_request: String },
    PatchReply(PatchMailMetadata),
    ReplyToReply(ReplyMetadata),
}

enum Outcome {
    Mirrored,
    Duplicate,
    Unrelated,
    Skipped,
}

/// Walks the mail archive from the last checkpoint and mirrors replies to
/// known cover letters, patches, and previously mirrored replies.
pub struct MailSync<A, H, S> {
    archive: A,
    host: H,
    notes: S,
    list_name: String,
    archive_url: String,
    branch: String,
    state_key: String,
    log_prefix: LogPrefix,
}

impl<A: MailArchive, H: PullRequestHost, S: NoteStore> MailSync<A, H, S> {
    pub fn new(
        config: &SystemConfig,
        archive: A,
        host: H,
        notes: S,
        log_prefix: LogPrefix,
    ) -> Self {
        log_prefix.set_branch(config.archive.branch.clone());
        MailSync {
            archive,
            host,
            notes,
            list_name: config.project.list_name.clone(),
            archive_url: config.project.archive_url.clone(),
            branch: config.archive.branch.clone(),
            state_key: config.state_key(),
            log_prefix,
        }
    }

    pub fn into_parts(self) -> (A, H, S) {
        (self.archive, self.host, self.notes)
    }

    /// Process every message archived since the checkpoint.
    ///
    /// Messages are handled strictly in archive order. A message which
    /// cannot be parsed, or whose mirroring fails at the host, is logged and
    /// skipped for good; the walk carries on. Anything else aborts the walk
    /// without moving the checkpoint.
    ///
    /// The checkpoint is written and published once, after the last
    /// message.
    pub fn sync(&mut self) -> Result<SyncSummary, Error> {
        let mut state: MirrorState =
            self.notes.get(&self.state_key)?.unwrap_or_default();
        let tip = self.archive.tip()?;

        let mut summary = SyncSummary {
            checkpoint: state.latest_revision.clone(),
            ..SyncSummary::default()
        };

        if Some(&tip) == state.latest_revision.as_ref() {
            info!("{} Already up to date at {}", self.log_prefix, tip);
            return Ok(summary);
        }

        match state.latest_revision {
            Some(ref since) => info!(
                "{} Mirroring mail from {} to {}",
                self.log_prefix, since, tip
            ),
            None => info!(
                "{} No checkpoint; mirroring the whole archive up to {}",
                self.log_prefix, tip
            ),
        }

        let commits = self
            .archive
            .commits_since(state.latest_revision.as_deref(), &tip)?;
        for commit in &commits {
            self.log_prefix.set_commit(commit);

            let outcome = match self.handle_commit(commit) {
                Ok(None) => continue,
                Ok(Some(outcome)) => outcome,
                Err(e) if e.is_transient() => {
                    warn!("{} Skipping message: {}", self.log_prefix, e);
                    Outcome::Skipped
                }
                Err(e) => {
                    error!("{} Aborting: {}", self.log_prefix, e);
                    self.log_prefix.clear_message();
                    return Err(e);
                }
            };

            summary.examined += 1;
            match outcome {
                Outcome::Mirrored => summary.mirrored += 1,
                Outcome::Duplicate => summary.duplicates += 1,
                Outcome::Unrelated => summary.unrelated += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }
        self.log_prefix.clear_message();

        state.latest_revision = Some(tip.clone());
        state.branch = Some(self.branch.clone());
        self.notes.set_published(&self.state_key, &state, true)?;
        summary.checkpoint = Some(tip);

        info!(
            "{} Examined {} message(s): {} mirrored, {} already seen, \
             {} unrelated, {} skipped",
            self.log_prefix,
            summary.examined,
            summary.mirrored,
            summary.duplicates,
            summary.unrelated,
            summary.skipped
        );
        Ok(summary)
    }

    /// Handle the message in one archive commit.
    ///
    /// Returns `None` if the commit carries no message.
    fn handle_commit(&mut self, commit: &str) -> Result<Option<Outcome>, Error> {
        let raw = match self.archive.read_message(commit)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let mail = parse_message(&raw)?;
        self.log_prefix.set_message_id(mail.message_id.as_deref());

        let outcome = match self.classify(&mail)? {
            Classification::NoIdentifier => {
                warn!("{} Message has no Message-ID; skipping", self.log_prefix);
                Outcome::Skipped
            }
            Classification::AlreadySeen => {
                info!("{} Already handled; skipping", self.log_prefix);
                Outcome::Duplicate
            }
            Classification::Unrelated => {
                info!(
                    "{} Not a reply to any known pull request",
                    self.log_prefix
                );
                Outcome::Unrelated
            }
            classification => {
                self.mirror(&mail, classification)?;
                Outcome::Mirrored
            }
        };

        Ok(Some(outcome))
    }

    fn classify(&self, mail: &MailRecord) -> Result<Classification, Error> {
        let message_id = match mail.message_id {
            Some(ref id) => id,
            None => return Ok(Classification::NoIdentifier),
        };

        if self.mail_metadata(message_id)?.is_some() {
            return Ok(Classification::AlreadySeen);
        }

        let nearest =
            nearest_known(&mail.references, |id| self.mail_metadata(id))?;
        Ok(match nearest {
            None => Classification::Unrelated,
            Some((parent, metadata)) => {
                debug!("{} Nearest known ancestor is {}", self.log_prefix, parent);
                match metadata {
                    MailMetadata::CoverLetter { pull_request } => {
                        Classification::CoverLetterReply { pull_request }
                    }
                    MailMetadata::Patch(patch) => {
                        Classification::PatchReply(patch)
                    }
                    MailMetadata::Reply(reply) => {
                        Classification::ReplyToReply(reply)
                    }
                }
            }
        })
    }

    /// Look up what is known about `message_id`.
    ///
    /// A note which is not mail metadata at all (which could only happen if
    /// a message id collided with some other key) counts as unknown.
    fn mail_metadata(
        &self,
        message_id: &str,
    ) -> Result<Option<MailMetadata>, Error> {
        match self.notes.get(message_id) {
            Err(Error::Json(e)) => {
                warn!(
                    "{} Note for {} is not mail metadata: {}",
                    self.log_prefix, message_id, e
                );
                Ok(None)
            }
            r => r,
        }
    }

    fn mirror(
        &mut self,
        mail: &MailRecord,
        classification: Classification,
    ) -> Result<(), Error> {
        let message_id = mail.message_id.as_deref().unwrap_or_default();

        let reply = match classification {
            Classification::CoverLetterReply { pull_request } => {
                let text = self.render(mail, None);
                let comment_id = self
                    .host
                    .post_top_level_comment(&pull_request, &text)
                    .map_err(host_failure)?;
                ReplyMetadata {
                    pull_request,
                    patch: None,
                    comment_id,
                }
            }

            Classification::PatchReply(patch) => {
                let outdated = self.is_outdated(&patch)?;
                let text = self.render(
                    mail,
                    if outdated {
                        Some(patch.commit.as_str())
                    } else {
                        None
                    },
                );
                let comment_id = match patch.review_comment_id {
                    Some(parent) if !outdated => self
                        .host
                        .post_threaded_reply(&patch.pull_request, parent, &text),
                    _ => self
                        .host
                        .post_top_level_comment(&patch.pull_request, &text),
                }
                .map_err(host_failure)?;
                ReplyMetadata {
                    pull_request: patch.pull_request,
                    patch: Some(PatchRef {
                        identity: patch.identity,
                        commit: patch.commit,
                    }),
                    comment_id,
                }
            }

            Classification::ReplyToReply(parent) => {
                let text = self.render(mail, None);
                let comment_id = self
                    .host
                    .post_threaded_reply(
                        &parent.pull_request,
                        parent.comment_id,
                        &text,
                    )
                    .map_err(host_failure)?;
                ReplyMetadata {
                    pull_request: parent.pull_request,
                    patch: parent.patch,
                    comment_id,
                }
            }

            Classification::NoIdentifier
            | Classification::AlreadySeen
            | Classification::Unrelated => return Ok(()),
        };

        info!(
            "{} Mirrored as comment {} on {}",
            self.log_prefix, reply.comment_id, reply.pull_request
        );

        let thread = thread_key(&reply.pull_request);
        self.notes
            .set(message_id, &MailMetadata::Reply(reply), false)?;
        self.notes.append(&thread, message_id)?;
        Ok(())
    }

    /// Whether the pull request has moved on from the iteration of `patch`
    /// the reply was written against.
    ///
    /// If the host reports no commits at all, the current state is unknown
    /// and the patch is taken to be current.
    fn is_outdated(&mut self, patch: &PatchMailMetadata) -> Result<bool, Error> {
        let commits = self
            .host
            .pull_request_commits(&patch.pull_request)
            .map_err(host_failure)?;
        if commits.is_empty() {
            debug!(
                "{} No commits known for {}; assuming current",
                self.log_prefix, patch.pull_request
            );
            return Ok(false);
        }

        Ok(!commits
            .iter()
            .any(|c| c.identity == patch.identity && c.position == patch.commit))
    }

    fn render(&self, mail: &MailRecord, outdated_commit: Option<&str>) -> String {
        render_comment(&self.list_name, &self.archive_url, mail, outdated_commit)
    }
}

/// Every host failure only affects the message being mirrored.
fn host_failure(e: Error) -> Error {
    if e.is_transient() {
        e
    } else {
        Error::TransientExternalFailure(e.to_string())
    }
}

/// Render the comment text mirroring `mail`.
///
/// If `outdated_commit` is given, the text starts with a note that the mail
/// replies to that superseded commit.
pub fn render_comment(
    list_name: &str,
    archive_url: &str,
    mail: &MailRecord,
    outdated_commit: Option<&str>,
) -> String {
    let mut text = String::new();

    if let Some(commit) = outdated_commit {
        let short: String = commit.chars().take(12).collect();
        text.push_str(&format!(
            "**Note:** this reply refers to an outdated iteration of this \
             patch (commit `{}`).\n\n",
            short
        ));
    }

    let name = mail.from.display_name();
    let author = match (archive_url.trim_end_matches('/'), &mail.message_id) {
        ("", _) | (_, None) => name.to_owned(),
        (url, Some(id)) => format!("[{}]({}/{})", name, url, id),
    };
    text.push_str(&format!(
        "On the {} mailing list, {} wrote:\n\n",
        list_name, author
    ));

    // The fence must be longer than any run of backticks in the body
    let longest_run = mail
        .body
        .split(|c| '`' != c)
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    text.push_str(&fence);
    text.push('\n');
    text.push_str(mail.body.trim_end());
    text.push('\n');
    text.push_str(&fence);
    text.push('\n');

    text
}
