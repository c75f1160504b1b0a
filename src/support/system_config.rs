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

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The configuration for one mailing-list/project pairing.
///
/// This is stored in a TOML file, by default `mailbridge.toml` in the current
/// directory.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// The hosting-platform project the mailing list is mirrored onto.
    pub project: ProjectConfig,

    /// Where the mail archive lives.
    pub archive: ArchiveConfig,

    /// Where the note store lives and how it is shared.
    #[serde(default)]
    pub notes: NotesConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct ProjectConfig {
    /// The owner (user or organisation) of the project.
    pub owner: String,
    /// The name of the project repository.
    pub name: String,
    /// Human-readable name of the mailing list, used in mirrored comments.
    pub list_name: String,
    /// The posting address of the mailing list.
    pub list_address: String,
    /// Base URL of the web archive. A message is linked to as
    /// `<archive_url>/<message-id>`.
    #[serde(default)]
    pub archive_url: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Path to the repository holding the mail archive, one message per
    /// commit.
    pub path: PathBuf,
    /// The branch of the archive to walk.
    pub branch: String,
    /// The name of the file within each commit holding the raw message.
    pub message_file: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig {
            path: PathBuf::new(),
            branch: "master".to_owned(),
            message_file: "m".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Path to the repository holding the note store.
    ///
    /// If empty, the archive repository is used.
    pub path: PathBuf,
    /// The notes ref holding all metadata.
    pub notes_ref: String,
    /// The remote the notes ref is shared through.
    ///
    /// If unset, notes are only ever written locally.
    pub remote: Option<String>,
    /// How many times publishing is attempted before giving up with a
    /// concurrent write conflict.
    pub max_push_attempts: u32,
    /// Identity recorded on note commits.
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

impl Default for NotesConfig {
    fn default() -> Self {
        NotesConfig {
            path: PathBuf::new(),
            notes_ref: "refs/notes/mail-sync".to_owned(),
            remote: None,
            max_push_attempts: 5,
            author_name: None,
            author_email: None,
        }
    }
}

impl SystemConfig {
    /// The note store key under which the mirror state is kept.
    pub fn state_key(&self) -> String {
        format!(
            "{} <-> {}/{}",
            self.project.list_address, self.project.owner, self.project.name
        )
    }

    pub fn notes_path(&self) -> &PathBuf {
        if self.notes.path.as_os_str().is_empty() {
            &self.archive.path
        } else {
            &self.notes.path
        }
    }
}
