// src/models/reaction.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The fixed set of reactions a reader can leave on a blog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
    Applaud,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 7] = [
        ReactionKind::Like,
        ReactionKind::Love,
        ReactionKind::Haha,
        ReactionKind::Wow,
        ReactionKind::Sad,
        ReactionKind::Angry,
        ReactionKind::Applaud,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Love => "love",
            ReactionKind::Haha => "haha",
            ReactionKind::Wow => "wow",
            ReactionKind::Sad => "sad",
            ReactionKind::Angry => "angry",
            ReactionKind::Applaud => "applaud",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ReactionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("Unknown reaction '{}'", s))
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveReactionRequest {
    pub reaction: String,
}

/// What `save_reaction` did to the caller's reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionOutcome {
    Created,
    Updated,
    Removed,
}

impl ReactionOutcome {
    /// Decides the transition from the caller's existing reaction (if any)
    /// to the requested one. Choosing the same reaction again removes it.
    pub fn decide(existing: Option<ReactionKind>, requested: ReactionKind) -> Self {
        match existing {
            None => ReactionOutcome::Created,
            Some(current) if current == requested => ReactionOutcome::Removed,
            Some(_) => ReactionOutcome::Updated,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReactionCount {
    pub reaction: ReactionKind,
    pub count: i64,
}

/// Per-kind reaction counts for a blog. Every kind is present, zero-filled.
#[derive(Debug, Clone, Serialize)]
pub struct ReactionSummary {
    pub counts: Vec<ReactionCount>,
    pub total: i64,
    /// The caller's own reaction, when known.
    pub mine: Option<ReactionKind>,
}

impl ReactionSummary {
    /// Builds a summary from grouped `(reaction_type, count)` rows.
    /// Rows with unknown reaction types are ignored.
    pub fn from_counts(rows: &[(String, i64)], mine: Option<ReactionKind>) -> Self {
        let counts: Vec<ReactionCount> = ReactionKind::ALL
            .into_iter()
            .map(|kind| ReactionCount {
                reaction: kind,
                count: rows
                    .iter()
                    .filter(|(name, _)| name == kind.as_str())
                    .map(|(_, n)| *n)
                    .sum(),
            })
            .collect();
        let total = counts.iter().map(|c| c.count).sum();

        Self { counts, total, mine }
    }

    #[cfg(test)]
    pub fn count_of(&self, kind: ReactionKind) -> i64 {
        self.counts
            .iter()
            .find(|c| c.reaction == kind)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}
