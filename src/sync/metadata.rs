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

//! The records kept in the note store about pull requests and the mails
//! which mirror them.

use serde::{Deserialize, Serialize};

use super::host::CommentId;
use crate::notes::NoteStore;
use crate::support::error::Error;

/// What the note store knows about one message id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MailMetadata {
    /// The mail introducing a pull request's patch series.
    CoverLetter { pull_request: String },
    /// The mail carrying one patch of a series.
    Patch(PatchMailMetadata),
    /// A reply which has been mirrored onto the pull request.
    Reply(ReplyMetadata),
}

impl MailMetadata {
    pub fn pull_request(&self) -> &str {
        match *self {
            MailMetadata::CoverLetter { ref pull_request } => pull_request,
            MailMetadata::Patch(ref p) => &p.pull_request,
            MailMetadata::Reply(ref r) => &r.pull_request,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchMailMetadata {
    pub pull_request: String,
    /// The patch identity, stable across iterations of the series.
    pub identity: String,
    /// The pull request commit the mail was generated from.
    pub commit: String,
    /// The commit the patch became upstream, once applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_commit: Option<String>,
    /// The review comment replies to this patch are threaded under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comment_id: Option<CommentId>,
}

/// Identifies the patch a reply refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRef {
    pub identity: String,
    pub commit: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMetadata {
    pub pull_request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<PatchRef>,
    /// The comment which mirrors the reply.
    pub comment_id: CommentId,
}

/// The state of one iteration of a pull request's patch series, stored
/// under the pull request URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSeriesMetadata {
    pub pull_request: String,
    pub base_commit: String,
    pub head_commit: String,
    pub iteration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter_message_id: Option<String>,
    #[serde(default)]
    pub patches: Vec<PatchMetadata>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchMetadata {
    pub identity: String,
    pub commit: String,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comment_id: Option<CommentId>,
}

/// How far the mailing list has been mirrored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorState {
    /// The last archive commit fully processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// The key of the multi-valued note listing every message mirrored onto
/// `pull_request`.
pub fn thread_key(pull_request: &str) -> String {
    format!("thread:{}", pull_request)
}

/// Record a newly submitted iteration of a patch series.
///
/// The series itself is stored under its pull request URL, and the cover
/// letter and every patch mail get `MailMetadata` so that replies to them
/// can be routed back to the pull request.
pub fn record_series<S: NoteStore>(
    notes: &mut S,
    series: &PatchSeriesMetadata,
    force_create_store: bool,
) -> Result<(), Error> {
    notes.set(&series.pull_request, series, force_create_store)?;

    if let Some(ref cover_letter) = series.cover_letter_message_id {
        notes.set(
            cover_letter,
            &MailMetadata::CoverLetter {
                pull_request: series.pull_request.clone(),
            },
            false,
        )?;
    }

    for patch in &series.patches {
        notes.set(
            &patch.message_id,
            &MailMetadata::Patch(PatchMailMetadata {
                pull_request: series.pull_request.clone(),
                identity: patch.identity.clone(),
                commit: patch.commit.clone(),
                upstream_commit: patch.upstream_commit.clone(),
                review_comment_id: patch.review_comment_id,
            }),
            false,
        )?;
    }

    Ok(())
}
