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

use std::fmt;
use std::sync::{Arc, Mutex};

/// Tracks text that should be included at the start of every log statement
/// made during an archive walk.
///
/// Clones of a `LogPrefix` share the same underlying data, so the
/// orchestrator can update the message context while collaborators holding a
/// clone pick it up automatically.
#[derive(Clone)]
pub struct LogPrefix {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Clone)]
struct Inner {
    component: String,
    branch: Option<String>,
    commit: Option<String>,
    message_id: Option<String>,
}

impl LogPrefix {
    pub fn new(component: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                component,
                branch: None,
                commit: None,
                message_id: None,
            })),
        }
    }

    pub fn set_branch(&self, branch: String) {
        self.lock().branch = Some(sanitise(branch));
    }

    /// Set the archive commit being handled, clearing any message id from a
    /// previous commit.
    pub fn set_commit(&self, commit: &str) {
        let mut inner = self.lock();
        inner.commit = Some(sanitise(commit.chars().take(12).collect()));
        inner.message_id = None;
    }

    pub fn set_message_id(&self, message_id: Option<&str>) {
        self.lock().message_id = message_id.map(|m| sanitise(m.to_owned()));
    }

    /// Forget the per-message context.
    pub fn clear_message(&self) {
        let mut inner = self.lock();
        inner.commit = None;
        inner.message_id = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned prefix still holds perfectly usable strings
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.lock();
        write!(f, "{}", inner.component)?;

        let parts = [
            ("branch", &inner.branch),
            ("commit", &inner.commit),
            ("msg", &inner.message_id),
        ];
        let mut first = true;
        for (label, value) in parts.iter() {
            if let Some(ref value) = **value {
                f.write_str(if first { "[" } else { " " })?;
                first = false;
                write!(f, "{}={}", label, value)?;
            }
        }

        if !first {
            f.write_str("]")?;
        }

        Ok(())
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(128) {
        s.truncate(truncate_len);
    }

    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn renders_context() {
        let prefix = LogPrefix::new("mail-sync".to_owned());
        assert_eq!("mail-sync", prefix.to_string());

        prefix.set_branch("master".to_owned());
        assert_eq!("mail-sync[branch=master]", prefix.to_string());

        let clone = prefix.clone();
        clone.set_commit("0123456789abcdef0123");
        clone.set_message_id(Some("a@x\r\n"));
        assert_eq!(
            "mail-sync[branch=master commit=0123456789ab msg=a@x]",
            prefix.to_string()
        );

        prefix.clear_message();
        assert_eq!("mail-sync[branch=master]", clone.to_string());
    }
}
