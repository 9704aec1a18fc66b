// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The outcome taxonomy shared by both engines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The final classification of a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// An answer of the queried type was obtained.
    #[serde(rename = "SUCCESS")]
    Success,
    /// An authoritative server denied the name exists.
    #[serde(rename = "NXDOMAIN")]
    Nxdomain,
    /// The name exists but carries no records of the queried type.
    #[serde(rename = "NODATA")]
    Nodata,
    /// A delegation whose nameservers have no reachable addresses.
    #[serde(rename = "BROKEN_DELEGATION")]
    BrokenDelegation,
    /// A delegated server that does not consider itself authoritative.
    #[serde(rename = "LAME_DELEGATION")]
    LameDelegation,
    /// Server failures, refusals, timeouts, loops, and other dead ends.
    #[default]
    #[serde(rename = "SERVFAIL_TIMEOUT")]
    ServfailTimeout,
}

impl OutcomeKind {
    /// The canonical uppercase name of the classification.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Nxdomain => "NXDOMAIN",
            Self::Nodata => "NODATA",
            Self::BrokenDelegation => "BROKEN_DELEGATION",
            Self::LameDelegation => "LAME_DELEGATION",
            Self::ServfailTimeout => "SERVFAIL_TIMEOUT",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An engine verdict before it is attached to a trace.
#[derive(Clone, Debug)]
pub struct Outcome {
    /// The classification.
    pub kind: OutcomeKind,
    /// A short one-line explanation.
    pub summary: String,
    /// The step that justifies the verdict, when one exists.
    pub evidence_step: Option<usize>,
    /// Operator-actionable advice.
    pub hints: Vec<String>,
}

/// The diagnosis carried by a [`crate::model::TraceResult`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// The single classification for the trace.
    pub classification: OutcomeKind,
    /// A short one-line explanation.
    pub summary: String,
    /// Indices of the steps that justify the verdict.
    pub evidence_steps: Vec<usize>,
    /// Operator-actionable advice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

/// Map an [`Outcome`] to the [`Diagnosis`] recorded on the trace.
pub fn diagnose(outcome: Outcome) -> Diagnosis {
    Diagnosis {
        classification: outcome.kind,
        summary: outcome.summary,
        evidence_steps: outcome.evidence_step.into_iter().collect(),
        hints: outcome.hints,
    }
}
