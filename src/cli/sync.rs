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

use log::info;

use super::main::{die, notes_git, SyncSubcommand};
use crate::git::ProcessGit;
use crate::notes::{GitNotes, NoteStore, OverlayNotes};
use crate::support::log_prefix::LogPrefix;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;
use crate::sync::archive::GitArchive;
use crate::sync::host::DryRunHost;
use crate::sync::orchestrator::MailSync;

pub(super) fn sync(config: SystemConfig, cmd: SyncSubcommand) {
    if !cmd.dry_run {
        eprintln!(
            "No hosting-platform client is configured; \
             only --dry-run is supported"
        );
        EX_USAGE.exit();
    }

    let log_prefix = LogPrefix::new("mail-sync".to_owned());
    let archive = GitArchive::new(
        ProcessGit::new(&config.archive.path),
        &config.archive,
    );
    let notes =
        GitNotes::new(notes_git(&config), &config.notes, log_prefix.clone());
    let host = DryRunHost::new(log_prefix.clone());

    let mut sync = MailSync::new(
        &config,
        archive,
        host,
        OverlayNotes::new(notes),
        log_prefix.clone(),
    );
    let summary = sync.sync().unwrap_or_else(|e| die(e));

    let (_, _, notes) = sync.into_parts();
    info!(
        "{} [dry-run] {} note(s) would have been written to {}",
        log_prefix,
        notes.overlay().len(),
        notes.base().notes_ref()
    );
    println!(
        "examined={} mirrored={} already-seen={} unrelated={} skipped={} \
         checkpoint={}",
        summary.examined,
        summary.mirrored,
        summary.duplicates,
        summary.unrelated,
        summary.skipped,
        summary.checkpoint.as_deref().unwrap_or("none")
    );
}
