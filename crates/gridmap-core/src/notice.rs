//! Transient banners.

use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    /// `None` for errors: they stay until dismissed or superseded.
    pub expires_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct Notices {
    ttl: Duration,
    next_id: u64,
    items: Vec<Notice>,
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 0,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        self.push_at(kind, message, Instant::now())
    }

    /// A new error replaces any earlier error.
    pub fn push_at(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        if kind == NoticeKind::Error {
            self.items.retain(|n| n.kind != NoticeKind::Error);
        }
        let expires_at = match kind {
            NoticeKind::Error => None,
            _ => Some(now + self.ttl),
        };
        self.items.push(Notice {
            id,
            kind,
            message: message.into(),
            expires_at,
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    /// Drops expired notices. Returns how many were removed.
    pub fn prune_at(&mut self, now: Instant) -> usize {
        let before = self.items.len();
        self.items
            .retain(|n| n.expires_at.is_none_or(|deadline| deadline > now));
        before - self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn latest_error(&self) -> Option<&Notice> {
        self.items.iter().rev().find(|n| n.kind == NoticeKind::Error)
    }
}
