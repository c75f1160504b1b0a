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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    #[error("Note store {0} does not exist yet")]
    NotInitialized(String),
    #[error("Refusing to update unknown notes ref {0}")]
    UnknownRef(String),
    #[error("Gave up publishing {notes_ref} after {attempts} attempts")]
    ConcurrentWriteConflict { notes_ref: String, attempts: u32 },
    #[error("External call failed: {0}")]
    TransientExternalFailure(String),
    #[error("Cannot enumerate mail archive: {0}")]
    FatalEnumeration(String),
    #[error("`git {command}` exited with {status:?}: {stderr}")]
    GitCommand {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    /// A push was refused because the remote moved on. Only ever observed
    /// inside the publish retry loop.
    #[error("Push of {0} rejected as non-fast-forward")]
    PushRejected(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error only affects the message currently being handled,
    /// as opposed to the whole archive walk.
    pub fn is_transient(&self) -> bool {
        matches!(
            *self,
            Error::TransientExternalFailure(..) | Error::MalformedMessage(..)
        )
    }
}
