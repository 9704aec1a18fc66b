// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The trace document produced by both engines.
//!
//! The JSON serialization of [`TraceResult`] is the only stable external
//! contract of the core: snake_case keys, durations pre-rendered as short
//! human strings, timestamps as RFC 3339.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnose::Diagnosis;

/// An immutable record of one query/response event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Sequence index, dense and monotonic within a trace.
    pub index: usize,
    /// Server endpoint in canonical `ip:port` form.
    pub server: String,
    /// Display name for the server, when one is known (root hints, glue).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_name: String,
    /// The name as queried; differs from the original while chasing CNAME/DNAME.
    pub query_name: String,
    /// The queried record type.
    pub query_type: String,
    /// Transport actually used, `udp` or `tcp`.
    pub transport: String,
    /// Response code name; empty when the exchange failed.
    pub rcode: String,
    /// Whether the response carried the AA bit.
    pub authoritative: bool,
    /// Answer section records in presentation format.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<String>,
    /// NS targets found in the authority section.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ns: Vec<String>,
    /// The first SOA record of the authority section, when present.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub soa: String,
    /// Measured round-trip time.
    pub rtt: String,
    /// Exchange failure, when the query never produced a response.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Human-readable annotation, e.g. `referral=com.`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    /// When the step was recorded.
    #[serde(default = "epoch")]
    pub timestamp: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Default for TraceStep {
    fn default() -> Self {
        Self {
            index: 0,
            server: String::new(),
            server_name: String::new(),
            query_name: String::new(),
            query_type: String::new(),
            transport: String::new(),
            rcode: String::new(),
            authoritative: false,
            answers: Vec::new(),
            ns: Vec::new(),
            soa: String::new(),
            rtt: String::new(),
            error: String::new(),
            note: String::new(),
            timestamp: epoch(),
        }
    }
}

/// Per-step timing record, parallel to [`TraceStep`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// Index of the step this timing belongs to.
    pub step_index: usize,
    /// Server endpoint the step queried.
    pub server: String,
    /// Measured round-trip time.
    pub rtt: String,
    /// Whether the exchange expired against its deadline.
    pub timed_out: bool,
    /// Transport actually used.
    pub transport: String,
}

/// The data record produced by a single engine invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    /// Ordered query/response steps.
    pub steps: Vec<TraceStep>,
    /// One timing per step.
    pub timings: Vec<Timing>,
    /// The single classification for the trace.
    pub diagnosis: Diagnosis,
}

/// Render a duration the way steps and timings expect it: `0s`, `850µs`,
/// `12.3ms`, `1.20s`.
pub(crate) fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    if duration >= Duration::from_secs(1) {
        format!("{:.2}s", duration.as_secs_f64())
    } else if duration >= Duration::from_millis(1) {
        format!("{:.1}ms", duration.as_secs_f64() * 1_000.0)
    } else {
        format!("{}µs", duration.as_micros())
    }
}
