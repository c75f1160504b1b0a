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

//! A versioned key-value store layered on git notes.
//!
//! Each key is hashed into a blob; the value is the note attached to that
//! blob under one notes ref. Since the notes ref is an ordinary commit
//! history, it can be shared through a remote and concurrent writers are
//! reconciled by fetch-merge-push rather than by any lock.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::git::Git;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::NotesConfig;

/// The notes refs which `GitNotes::update()` is permitted to move.
pub const UPDATABLE_REFS: &[&str] = &[
    "refs/notes/mail-sync",
    "refs/notes/commit-to-mail",
    "refs/notes/mail-to-commit",
];

/// Separates the fragments of a multi-valued key.
///
/// This is what `git notes append` itself puts between notes.
const FRAGMENT_SEPARATOR: &str = "\n\n";

pub trait NoteStore {
    /// The notes ref this store reads and writes.
    fn notes_ref(&self) -> &str;

    /// Whether the store has been created yet.
    fn exists(&self) -> Result<bool, Error>;

    /// Look up the raw value stored for `key`.
    ///
    /// A missing key, or a store that does not exist yet, yields `None`.
    fn get_raw(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key`, replacing any prior value.
    ///
    /// Fails with `NotInitialized` if the store does not exist yet, unless
    /// `force_create_store` is set.
    fn set_raw(
        &mut self,
        key: &str,
        value: &str,
        force_create_store: bool,
    ) -> Result<(), Error>;

    /// Add a fragment to the multi-valued `key`, creating the key (and the
    /// store) if needed.
    ///
    /// `fragment` should already be normalised with `normalise_fragment()`.
    fn append_raw(&mut self, key: &str, fragment: &str) -> Result<(), Error>;

    /// Share local writes with other writers.
    fn publish(&mut self) -> Result<(), Error>;

    /// Look up and deserialise the value stored for `key`.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.get_raw(key)? {
            None => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_str(raw.trim())?)),
        }
    }

    /// Serialise `value` and store it under `key`.
    fn set<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
        force_create_store: bool,
    ) -> Result<(), Error> {
        let mut raw = serde_json::to_string(value)?;
        raw.push('\n');
        self.set_raw(key, &raw, force_create_store)
    }

    /// `set()` followed by `publish()`.
    fn set_published<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
        force_create_store: bool,
    ) -> Result<(), Error> {
        self.set(key, value, force_create_store)?;
        self.publish()
    }

    /// Append a fragment to the multi-valued `key`.
    ///
    /// The fragment is normalised so that it cannot contain the fragment
    /// separator. Fragments which are empty after normalisation are dropped.
    fn append(&mut self, key: &str, fragment: &str) -> Result<(), Error> {
        let fragment = normalise_fragment(fragment);
        if fragment.is_empty() {
            return Ok(());
        }

        self.append_raw(key, &fragment)
    }

    /// All fragments stored under `key`, oldest first.
    fn fragments(&self, key: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .get_raw(key)?
            .map(|raw| split_fragments(&raw))
            .unwrap_or_default())
    }

    /// The most recently appended fragment under `key`.
    fn last_fragment(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.fragments(key)?.pop())
    }
}

/// Normalise a fragment of a multi-valued key: line endings become LF, blank
/// lines are removed, and surrounding whitespace is trimmed.
pub fn normalise_fragment(fragment: &str) -> String {
    fragment
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_fragments(raw: &str) -> Vec<String> {
    raw.replace("\r\n", "\n")
        .split(FRAGMENT_SEPARATOR)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_owned)
        .collect()
}

fn check_updatable(notes_ref: &str) -> Result<(), Error> {
    if UPDATABLE_REFS.contains(&notes_ref) {
        Ok(())
    } else {
        Err(Error::UnknownRef(notes_ref.to_owned()))
    }
}

/// `NoteStore` backed by a git notes ref.
pub struct GitNotes<G> {
    git: G,
    notes_ref: String,
    remote: Option<String>,
    max_push_attempts: u32,
    log_prefix: LogPrefix,
}

impl<G: Git> GitNotes<G> {
    pub fn new(git: G, config: &NotesConfig, log_prefix: LogPrefix) -> Self {
        GitNotes {
            git,
            notes_ref: config.notes_ref.clone(),
            remote: config.remote.clone(),
            max_push_attempts: config.max_push_attempts.max(1),
            log_prefix,
        }
    }

    pub fn git(&self) -> &G {
        &self.git
    }

    /// Fast-forward the notes ref to the tip of the same ref in `source` (a
    /// remote name or URL).
    ///
    /// Only refs in `UPDATABLE_REFS` may be moved this way.
    pub fn update(&mut self, source: &str) -> Result<(), Error> {
        check_updatable(&self.notes_ref)?;

        let refspec = format!("{0}:{0}", self.notes_ref);
        self.git
            .run_ok(&["fetch", "-q", source, &refspec], None)?;
        info!("{} Updated {} from {}", self.log_prefix, self.notes_ref, source);
        Ok(())
    }

    /// Hash `key` into the object the note hangs off, optionally writing the
    /// blob into the object store.
    fn key_object(&self, key: &str, write: bool) -> Result<String, Error> {
        let args: &[&str] = if write {
            &["hash-object", "-w", "--stdin"]
        } else {
            &["hash-object", "--stdin"]
        };

        Ok(self
            .git
            .run_ok(args, Some(key.as_bytes()))?
            .stdout_trimmed())
    }

    fn push_once(&self, remote: &str) -> Result<(), Error> {
        let refspec = format!("{0}:{0}", self.notes_ref);
        let args = ["push", "--porcelain", remote, &refspec];
        let output = self.git.run(&args, None)?;
        if output.success() {
            return Ok(());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let rejected = [&*stdout, &*output.stderr].iter().any(|text| {
            text.contains("[rejected]")
                || text.contains("non-fast-forward")
                || text.contains("fetch first")
        });

        if rejected {
            Err(Error::PushRejected(self.notes_ref.clone()))
        } else {
            output.check(&args).map(|_| ())
        }
    }

    /// Bring the remote tip into the local notes ref, keeping local values
    /// where both sides wrote the same key.
    fn merge_remote(&self, remote: &str) -> Result<(), Error> {
        let tracking = format!("{}-remote", self.notes_ref);
        let refspec = format!("+{}:{}", self.notes_ref, tracking);
        self.git.run_ok(&["fetch", "-q", remote, &refspec], None)?;
        self.git.run_ok(
            &[
                "notes",
                "--ref",
                &self.notes_ref,
                "merge",
                "-q",
                "-s",
                "ours",
                &tracking,
            ],
            None,
        )?;
        Ok(())
    }
}

impl<G: Git> NoteStore for GitNotes<G> {
    fn notes_ref(&self) -> &str {
        &self.notes_ref
    }

    fn exists(&self) -> Result<bool, Error> {
        Ok(self
            .git
            .run(&["rev-parse", "--verify", "-q", &self.notes_ref], None)?
            .success())
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>, Error> {
        if !self.exists()? {
            return Ok(None);
        }

        let object = self.key_object(key, false)?;
        let args = ["notes", "--ref", &self.notes_ref, "show", &object];
        let output = self.git.run(&args, None)?;
        if output.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
        } else if output.stderr.contains("no note found") {
            Ok(None)
        } else {
            output.check(&args).map(|_| None)
        }
    }

    fn set_raw(
        &mut self,
        key: &str,
        value: &str,
        force_create_store: bool,
    ) -> Result<(), Error> {
        if !force_create_store && !self.exists()? {
            return Err(Error::NotInitialized(self.notes_ref.clone()));
        }

        let object = self.key_object(key, true)?;
        self.git.run_ok(
            &["notes", "--ref", &self.notes_ref, "add", "-f", "-F", "-", &object],
            Some(value.as_bytes()),
        )?;
        Ok(())
    }

    fn append_raw(&mut self, key: &str, fragment: &str) -> Result<(), Error> {
        let object = self.key_object(key, true)?;
        self.git.run_ok(
            &["notes", "--ref", &self.notes_ref, "append", "-F", "-", &object],
            Some(fragment.as_bytes()),
        )?;
        Ok(())
    }

    fn publish(&mut self) -> Result<(), Error> {
        let remote = match self.remote {
            Some(ref remote) => remote.clone(),
            None => return Ok(()),
        };

        if !self.exists()? {
            return Ok(());
        }

        for attempt in 1..=self.max_push_attempts {
            match self.push_once(&remote) {
                Ok(()) => {
                    if attempt > 1 {
                        info!(
                            "{} Published {} on attempt {}",
                            self.log_prefix, self.notes_ref, attempt
                        );
                    }
                    return Ok(());
                }
                Err(Error::PushRejected(_)) => {
                    warn!(
                        "{} Push of {} to {} rejected (attempt {}/{}), \
                         merging remote changes",
                        self.log_prefix,
                        self.notes_ref,
                        remote,
                        attempt,
                        self.max_push_attempts
                    );
                    self.merge_remote(&remote)?;
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::ConcurrentWriteConflict {
            notes_ref: self.notes_ref.clone(),
            attempts: self.max_push_attempts,
        })
    }
}

/// `NoteStore` held entirely in memory.
#[derive(Clone, Debug)]
pub struct MemoryNotes {
    notes_ref: String,
    initialised: bool,
    entries: BTreeMap<String, String>,
}

impl MemoryNotes {
    pub fn new(notes_ref: impl Into<String>) -> Self {
        MemoryNotes {
            notes_ref: notes_ref.into(),
            initialised: false,
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl NoteStore for MemoryNotes {
    fn notes_ref(&self) -> &str {
        &self.notes_ref
    }

    fn exists(&self) -> Result<bool, Error> {
        Ok(self.initialised)
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set_raw(
        &mut self,
        key: &str,
        value: &str,
        force_create_store: bool,
    ) -> Result<(), Error> {
        if !force_create_store && !self.initialised {
            return Err(Error::NotInitialized(self.notes_ref.clone()));
        }

        self.initialised = true;
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn append_raw(&mut self, key: &str, fragment: &str) -> Result<(), Error> {
        self.initialised = true;
        let entry = self.entries.entry(key.to_owned()).or_default();
        if !entry.trim().is_empty() {
            let trimmed_len = entry.trim_end().len();
            entry.truncate(trimmed_len);
            entry.push_str(FRAGMENT_SEPARATOR);
        } else {
            entry.clear();
        }
        entry.push_str(fragment);
        entry.push('\n');
        Ok(())
    }

    fn publish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// `NoteStore` which reads through to `base` but never writes to it.
///
/// Writes land in an in-memory overlay which shadows `base` for subsequent
/// reads. Used for dry runs.
pub struct OverlayNotes<S> {
    base: S,
    overlay: MemoryNotes,
}

impl<S: NoteStore> OverlayNotes<S> {
    pub fn new(base: S) -> Self {
        let overlay = MemoryNotes::new(base.notes_ref());
        OverlayNotes { base, overlay }
    }

    /// The writes which would have been made to the base store.
    pub fn overlay(&self) -> &MemoryNotes {
        &self.overlay
    }

    pub fn base(&self) -> &S {
        &self.base
    }
}

impl<S: NoteStore> NoteStore for OverlayNotes<S> {
    fn notes_ref(&self) -> &str {
        self.base.notes_ref()
    }

    fn exists(&self) -> Result<bool, Error> {
        Ok(self.overlay.initialised || self.base.exists()?)
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>, Error> {
        match self.overlay.get_raw(key)? {
            Some(value) => Ok(Some(value)),
            None => self.base.get_raw(key),
        }
    }

    fn set_raw(
        &mut self,
        key: &str,
        value: &str,
        force_create_store: bool,
    ) -> Result<(), Error> {
        if !force_create_store && !self.exists()? {
            return Err(Error::NotInitialized(self.notes_ref().to_owned()));
        }

        self.overlay.set_raw(key, value, true)
    }

    fn append_raw(&mut self, key: &str, fragment: &str) -> Result<(), Error> {
        if self.overlay.get_raw(key)?.is_none() {
            if let Some(existing) = self.base.get_raw(key)? {
                self.overlay.set_raw(key, &existing, true)?;
            }
        }

        self.overlay.append_raw(key, fragment)
    }

    fn publish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use serde::Deserialize;

    use super::*;
    use crate::git::test_support::*;
    use crate::git::{GitOutput, ProcessGit};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Record {
        name: String,
        count: u32,
    }

    fn config(notes_ref: &str, remote: Option<&str>) -> NotesConfig {
        NotesConfig {
            notes_ref: notes_ref.to_owned(),
            remote: remote.map(str::to_owned),
            max_push_attempts: 3,
            ..NotesConfig::default()
        }
    }

    fn store(git: ProcessGit, remote: Option<&str>) -> GitNotes<ProcessGit> {
        GitNotes::new(
            git,
            &config("refs/notes/mail-sync", remote),
            LogPrefix::new("test".to_owned()),
        )
    }

    /// Passes everything through to `inner`, except that the first
    /// `rejections` pushes fail as if the remote had moved on.
    struct RejectingGit {
        inner: ProcessGit,
        rejections: Cell<u32>,
        pushes: Cell<u32>,
    }

    impl Git for RejectingGit {
        fn run(
            &self,
            args: &[&str],
            stdin: Option<&[u8]>,
        ) -> Result<GitOutput, Error> {
            if Some(&"push") == args.first() {
                self.pushes.set(self.pushes.get() + 1);
                if self.rejections.get() > 0 {
                    self.rejections.set(self.rejections.get() - 1);
                    return Ok(GitOutput {
                        status: Some(1),
                        stdout: b"!\trefs/notes/mail-sync:refs/notes/mail-sync\t\
                                  [rejected] (fetch first)\nDone\n"
                            .to_vec(),
                        stderr: "error: failed to push some refs".to_owned(),
                    });
                }
            }

            self.inner.run(args, stdin)
        }
    }

    #[test]
    fn missing_note_under_foreign_locale() {
        let dir = tempfile::tempdir().unwrap();
        let git = init_repo(dir.path(), false)
            .with_env("LANGUAGE", "de")
            .with_env("LC_ALL", "de_DE.UTF-8")
            .with_env("LC_MESSAGES", "fr_FR.UTF-8");
        let mut notes = store(git, None);

        notes.set_raw("a@x", "first\n", true).unwrap();
        assert_eq!(None, notes.get_raw("b@x").unwrap());
        assert_eq!(None, notes.get::<String>("b@x").unwrap());
        assert_eq!(Some("first\n".to_owned()), notes.get_raw("a@x").unwrap());
    }

    #[test]
    fn get_and_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut notes = store(init_repo(dir.path(), false), None);

        assert!(!notes.exists().unwrap());
        assert_eq!(None, notes.get_raw("a@x").unwrap());
        assert_matches!(
            Err(Error::NotInitialized(_)),
            notes.set_raw("a@x", "first\n", false)
        );

        notes.set_raw("a@x", "first\n", true).unwrap();
        assert!(notes.exists().unwrap());
        assert_eq!(Some("first\n".to_owned()), notes.get_raw("a@x").unwrap());

        // Existing store, so no force needed; overwrites
        notes.set_raw("a@x", "second\n", false).unwrap();
        assert_eq!(Some("second\n".to_owned()), notes.get_raw("a@x").unwrap());

        notes.set_raw("b@x", "other\n", false).unwrap();
        assert_eq!(Some("other\n".to_owned()), notes.get_raw("b@x").unwrap());
        assert_eq!(None, notes.get_raw("c@x").unwrap());
    }

    #[test]
    fn typed_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut notes = store(init_repo(dir.path(), false), None);

        let record = Record {
            name: "Keld Jørn".to_owned(),
            count: 3,
        };
        notes.set("https://example.com/pr/1", &record, true).unwrap();
        assert_eq!(
            Some(record),
            notes.get::<Record>("https://example.com/pr/1").unwrap()
        );
        assert_eq!(
            Some("{\"name\":\"Keld Jørn\",\"count\":3}\n".to_owned()),
            notes.get_raw("https://example.com/pr/1").unwrap()
        );
        assert_eq!(None, notes.get::<Record>("nx").unwrap());
    }

    #[test]
    fn fragments() {
        let dir = tempfile::tempdir().unwrap();
        let mut notes = store(init_repo(dir.path(), false), None);

        assert_eq!(Vec::<String>::new(), notes.fragments("k").unwrap());
        assert_eq!(None, notes.last_fragment("k").unwrap());

        notes.append("k", "one").unwrap();
        notes.append("k", "two\r\n\r\n\r\ntwo and a half\n").unwrap();
        notes.append("k", "  \n\n").unwrap();
        notes.append("k", "three").unwrap();

        assert_eq!(
            vec!["one", "two\ntwo and a half", "three"],
            notes.fragments("k").unwrap()
        );
        assert_eq!(Some("three".to_owned()), notes.last_fragment("k").unwrap());
    }

    #[test]
    fn normalise() {
        assert_eq!("a\nb", normalise_fragment("\n  \r\na  \r\n\r\n\tb\n\n"));
        assert_eq!("", normalise_fragment(" \n\t\n"));
    }

    #[test]
    fn update_refuses_unknown_refs() {
        let dir = tempfile::tempdir().unwrap();
        let mut notes = GitNotes::new(
            init_repo(dir.path(), false),
            &config("refs/notes/commits", None),
            LogPrefix::new("test".to_owned()),
        );
        assert_matches!(Err(Error::UnknownRef(_)), notes.update("origin"));
    }

    #[test]
    fn update_fast_forwards_from_source() {
        let upstream_dir = tempfile::tempdir().unwrap();
        let mut upstream = store(init_repo(upstream_dir.path(), false), None);
        upstream.set_raw("k", "v1\n", true).unwrap();

        let local_dir = tempfile::tempdir().unwrap();
        let mut local = store(init_repo(local_dir.path(), false), None);
        let source = upstream_dir.path().to_str().unwrap().to_owned();

        local.update(&source).unwrap();
        assert_eq!(Some("v1\n".to_owned()), local.get_raw("k").unwrap());

        upstream.set_raw("k", "v2\n", false).unwrap();
        local.update(&source).unwrap();
        assert_eq!(Some("v2\n".to_owned()), local.get_raw("k").unwrap());
    }

    #[test]
    fn publish_without_remote_is_local_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut notes = store(init_repo(dir.path(), false), None);
        notes.publish().unwrap();
        notes.set_published("k", &1u32, true).unwrap();
        assert_eq!(Some(1u32), notes.get("k").unwrap());
    }

    fn clone_of(remote: &std::path::Path) -> (tempfile::TempDir, ProcessGit) {
        let dir = tempfile::tempdir().unwrap();
        let git = init_repo(dir.path(), false);
        git.run_ok(
            &["remote", "add", "origin", remote.to_str().unwrap()],
            None,
        )
        .unwrap();
        (dir, git)
    }

    #[test]
    fn concurrent_publishers_merge() {
        let remote_dir = tempfile::tempdir().unwrap();
        init_repo(remote_dir.path(), true);

        let (_a_dir, a_git) = clone_of(remote_dir.path());
        let (_b_dir, b_git) = clone_of(remote_dir.path());
        let mut a = store(a_git, Some("origin"));
        let mut b = store(b_git, Some("origin"));

        a.set_published("x", &"from a", true).unwrap();
        // b never saw a's write, so this push is genuinely rejected and must
        // be merged
        b.set("y", &"from b", true).unwrap();
        b.set("shared", &"b wins locally", true).unwrap();
        b.publish().unwrap();

        assert_eq!(Some("from a".to_owned()), b.get::<String>("x").unwrap());
        assert_eq!(Some("from b".to_owned()), b.get::<String>("y").unwrap());

        a.update("origin").unwrap();
        assert_eq!(Some("from b".to_owned()), a.get::<String>("y").unwrap());
        assert_eq!(
            Some("b wins locally".to_owned()),
            a.get::<String>("shared").unwrap()
        );
    }

    #[test]
    fn publish_retries_then_succeeds() {
        let remote_dir = tempfile::tempdir().unwrap();
        init_repo(remote_dir.path(), true);
        let (_dir, git) = clone_of(remote_dir.path());

        let mut notes = GitNotes::new(
            RejectingGit {
                inner: git,
                rejections: Cell::new(1),
                pushes: Cell::new(0),
            },
            &config("refs/notes/mail-sync", Some("origin")),
            LogPrefix::new("test".to_owned()),
        );

        // The first (real) push must exist remotely for the merge step to
        // find something to fetch.
        notes.git().rejections.set(0);
        notes.set_published("k", &1u32, true).unwrap();
        notes.git().rejections.set(1);
        notes.set_published("k", &2u32, false).unwrap();

        assert_eq!(3, notes.git().pushes.get());
        assert_eq!(Some(2u32), notes.get("k").unwrap());
    }

    #[test]
    fn publish_gives_up_after_max_attempts() {
        let remote_dir = tempfile::tempdir().unwrap();
        init_repo(remote_dir.path(), true);
        let (_dir, git) = clone_of(remote_dir.path());

        let mut notes = GitNotes::new(
            RejectingGit {
                inner: git,
                rejections: Cell::new(0),
                pushes: Cell::new(0),
            },
            &config("refs/notes/mail-sync", Some("origin")),
            LogPrefix::new("test".to_owned()),
        );
        notes.set_published("k", &1u32, true).unwrap();

        notes.git().rejections.set(u32::MAX);
        notes.git().pushes.set(0);
        assert_matches!(
            Err(Error::ConcurrentWriteConflict { attempts: 3, .. }),
            notes.set_published("k", &2u32, false)
        );
        assert_eq!(3, notes.git().pushes.get());
    }

    #[test]
    fn memory_notes() {
        let mut notes = MemoryNotes::new("refs/notes/mail-sync");
        assert!(!notes.exists().unwrap());
        assert_matches!(
            Err(Error::NotInitialized(_)),
            notes.set("k", &1u32, false)
        );
        notes.set("k", &1u32, true).unwrap();
        notes.set("j", &2u32, false).unwrap();
        assert_eq!(Some(1u32), notes.get("k").unwrap());

        notes.append("log", "a").unwrap();
        notes.append("log", "b\n\nc").unwrap();
        assert_eq!(vec!["a", "b\nc"], notes.fragments("log").unwrap());
        assert_eq!(vec!["j", "k", "log"], notes.keys().collect::<Vec<_>>());
    }

    #[test]
    fn overlay_never_writes_through() {
        let mut base = MemoryNotes::new("refs/notes/mail-sync");
        base.set("k", &1u32, true).unwrap();
        base.append("log", "a").unwrap();

        let mut overlay = OverlayNotes::new(base);
        assert_eq!(Some(1u32), overlay.get("k").unwrap());
        overlay.set("k", &2u32, false).unwrap();
        overlay.append("log", "b").unwrap();
        overlay.publish().unwrap();

        assert_eq!(Some(2u32), overlay.get("k").unwrap());
        assert_eq!(vec!["a", "b"], overlay.fragments("log").unwrap());
        assert_eq!(Some(1u32), overlay.base.get("k").unwrap());
        assert_eq!(vec!["a"], overlay.base.fragments("log").unwrap());
        assert_eq!(2, overlay.overlay().len());

        let mut empty = OverlayNotes::new(MemoryNotes::new("refs/notes/x"));
        assert_matches!(
            Err(Error::NotInitialized(_)),
            empty.set("k", &1u32, false)
        );
    }
}
