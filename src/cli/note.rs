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

use super::main::{die, notes_git, NoteSubcommand};
use crate::notes::{GitNotes, NoteStore};
use crate::support::log_prefix::LogPrefix;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

pub(super) fn note(config: SystemConfig, cmd: NoteSubcommand) {
    let log_prefix = LogPrefix::new("note".to_owned());
    let mut notes =
        GitNotes::new(notes_git(&config), &config.notes, log_prefix);

    match cmd {
        NoteSubcommand::Get(cmd) => match notes.get_raw(&cmd.key) {
            Ok(Some(value)) => print!("{}", value),
            Ok(None) => {
                eprintln!("No note for '{}' in {}", cmd.key, notes.notes_ref());
                EX_NOINPUT.exit()
            }
            Err(e) => die(e),
        },

        NoteSubcommand::Fragments(cmd) => {
            let fragments = notes.fragments(&cmd.key).unwrap_or_else(|e| die(e));
            match serde_json::to_string_pretty(&fragments) {
                Ok(json) => println!("{}", json),
                Err(e) => die(e.into()),
            }
        }

        NoteSubcommand::Update(cmd) => {
            if let Err(e) = notes.update(&cmd.source) {
                die(e);
            }
        }
    }
}
