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

//! Constants from `sysexits.h`
//!
//! The command-line tools report failures with these so that callers such
//! as cron wrappers and CI jobs can tell retryable failures from
//! misconfiguration.

use super::error::Error;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Sysexit(pub i32);

pub const EX_USAGE: Sysexit = Sysexit(64);
pub const EX_DATAERR: Sysexit = Sysexit(65);
pub const EX_NOINPUT: Sysexit = Sysexit(66);
pub const EX_SOFTWARE: Sysexit = Sysexit(70);
pub const EX_TEMPFAIL: Sysexit = Sysexit(75);
pub const EX_CONFIG: Sysexit = Sysexit(78);

impl Sysexit {
    pub fn exit(self) -> ! {
        std::process::exit(self.0)
    }

    /// The status to exit with when a command fails with `e`.
    pub fn for_error(e: &Error) -> Self {
        match *e {
            Error::MalformedMessage(..) | Error::Json(..) => EX_DATAERR,
            Error::NotInitialized(..) | Error::UnknownRef(..) => EX_USAGE,
            Error::ConcurrentWriteConflict { .. }
            | Error::TransientExternalFailure(..)
            | Error::PushRejected(..) => EX_TEMPFAIL,
            Error::FatalEnumeration(..)
            | Error::GitCommand { .. }
            | Error::Io(..) => EX_SOFTWARE,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conflicts_are_temporary() {
        assert_eq!(
            EX_TEMPFAIL,
            Sysexit::for_error(&Error::ConcurrentWriteConflict {
                notes_ref: "refs/notes/mail-sync".to_owned(),
                attempts: 5,
            })
        );
        assert_eq!(
            EX_USAGE,
            Sysexit::for_error(&Error::UnknownRef("refs/heads/x".to_owned()))
        );
        assert_eq!(
            EX_DATAERR,
            Sysexit::for_error(&Error::MalformedMessage(String::new()))
        );
    }
}
