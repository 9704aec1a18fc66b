// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The resolver ladder: query recursive resolvers in order and classify by
//! the first decisive answer.

use std::time::Duration;

use chrono::Utc;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;
use tokio::time::Instant;
use tracing::debug;

use crate::client::{normalize_server, Client};
use crate::diagnose::{diagnose, Diagnosis, Outcome, OutcomeKind};
use crate::error::{Error, ErrorKind};
use crate::model::{format_duration, TraceResult, TraceStep, Timing};
use crate::response::{
    canonical_name, is_referral, ns_target_strings, rcode_name, rr_strings, soa_string,
};

/// Ladder engine configuration.
#[derive(Clone, Copy, Debug)]
pub struct LadderConfig {
    /// Time budget per resolver query.
    pub timeout: Duration,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
        }
    }
}

/// First-seen step indices for each decisive shape, in classification
/// priority order.
#[derive(Clone, Copy, Debug, Default)]
struct Decisive {
    answer: Option<usize>,
    nxdomain: Option<usize>,
    nodata: Option<usize>,
    servfail: Option<usize>,
}

fn record_first(slot: &mut Option<usize>, index: usize) {
    if slot.is_none() {
        *slot = Some(index);
    }
}

/// Query every resolver in order with RD=1, recording one step per resolver,
/// then classify the trace.
///
/// Every resolver is tried regardless of earlier outcomes; classification
/// uses the first-seen index per shape under the fixed precedence
/// answer > NXDOMAIN > NODATA > SERVFAIL-class.
pub async fn run(
    client: &Client,
    resolvers: &[String],
    fqdn: &str,
    qtype: RecordType,
    config: LadderConfig,
) -> Result<TraceResult, Error> {
    if resolvers.is_empty() {
        return Err(ErrorKind::NoResolvers.into());
    }
    let name = canonical_name(fqdn)?;

    let mut result = TraceResult::default();
    let mut decisive = Decisive::default();

    for (index, resolver) in resolvers.iter().enumerate() {
        let server = match normalize_server(resolver) {
            Ok(server) => server,
            Err(error) => {
                debug!(%resolver, %error, "skipping unparseable resolver");
                result.steps.push(TraceStep {
                    index,
                    server: resolver.clone(),
                    query_name: name.to_string(),
                    query_type: qtype.to_string(),
                    rtt: format_duration(Duration::ZERO),
                    error: error.to_string(),
                    timestamp: Utc::now(),
                    ..TraceStep::default()
                });
                result.timings.push(Timing {
                    step_index: index,
                    server: resolver.clone(),
                    rtt: format_duration(Duration::ZERO),
                    timed_out: true,
                    transport: String::new(),
                });
                record_first(&mut decisive.servfail, index);
                continue;
            }
        };

        let mut query = client.build_query(name.clone(), qtype);
        query.set_recursion_desired(true);

        let deadline = Instant::now() + config.timeout;
        let (protocol, outcome) = client.exchange(server, &query, deadline).await;

        let mut step = TraceStep {
            index,
            server: server.to_string(),
            query_name: name.to_string(),
            query_type: qtype.to_string(),
            transport: protocol.to_string(),
            rtt: format_duration(Duration::ZERO),
            timestamp: Utc::now(),
            ..TraceStep::default()
        };

        match outcome {
            Err(error) => {
                step.error = error.to_string();
                result.timings.push(Timing {
                    step_index: index,
                    server: server.to_string(),
                    rtt: step.rtt.clone(),
                    timed_out: true,
                    transport: protocol.to_string(),
                });
                record_first(&mut decisive.servfail, index);
            }
            Ok((response, rtt)) => {
                step.rtt = format_duration(rtt);
                step.authoritative = response.authoritative();
                step.rcode = rcode_name(response.response_code());
                step.answers = rr_strings(response.answers());
                step.ns = ns_target_strings(response.name_servers());
                step.soa = soa_string(&response).unwrap_or_default();
                if is_referral(&response) {
                    step.note = "referral (expected at delegation level)".to_string();
                }

                if !response.answers().is_empty() {
                    record_first(&mut decisive.answer, index);
                }
                match response.response_code() {
                    ResponseCode::NXDomain => record_first(&mut decisive.nxdomain, index),
                    ResponseCode::NoError if response.answers().is_empty() => {
                        record_first(&mut decisive.nodata, index)
                    }
                    ResponseCode::ServFail | ResponseCode::Refused => {
                        record_first(&mut decisive.servfail, index)
                    }
                    _ => {}
                }

                result.timings.push(Timing {
                    step_index: index,
                    server: server.to_string(),
                    rtt: step.rtt.clone(),
                    timed_out: false,
                    transport: protocol.to_string(),
                });
            }
        }

        result.steps.push(step);
    }

    result.diagnosis = classify(decisive);
    Ok(result)
}

fn classify(decisive: Decisive) -> Diagnosis {
    let outcome = if let Some(index) = decisive.answer {
        Outcome {
            kind: OutcomeKind::Success,
            summary: "resolver returned answer".to_string(),
            evidence_step: Some(index),
            hints: Vec::new(),
        }
    } else if let Some(index) = decisive.nxdomain {
        Outcome {
            kind: OutcomeKind::Nxdomain,
            summary: "resolver returned NXDOMAIN".to_string(),
            evidence_step: Some(index),
            hints: Vec::new(),
        }
    } else if let Some(index) = decisive.nodata {
        Outcome {
            kind: OutcomeKind::Nodata,
            summary: "resolver returned NOERROR without data".to_string(),
            evidence_step: Some(index),
            hints: Vec::new(),
        }
    } else if let Some(index) = decisive.servfail {
        Outcome {
            kind: OutcomeKind::ServfailTimeout,
            summary: "resolver failure or timeout".to_string(),
            evidence_step: Some(index),
            hints: Vec::new(),
        }
    } else {
        Outcome {
            kind: OutcomeKind::ServfailTimeout,
            summary: "no resolver responses".to_string(),
            evidence_step: None,
            hints: Vec::new(),
        }
    };
    diagnose(outcome)
}
