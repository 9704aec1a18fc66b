// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The authoritative delegation tracer.
//!
//! Iterative resolution from the root hints: every hop fans the current
//! query out to all candidate nameservers in parallel, picks the single
//! best response, and either terminates with a classification or follows
//! the referral / CNAME / DNAME it contains. Nameserver names delegated
//! without glue are resolved through recursive sub-traces, bounded by a
//! depth counter.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_recursion::async_recursion;
use chrono::Utc;
use futures_util::{stream, StreamExt};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use tokio::time::Instant;
use tracing::debug;

use crate::client::{Client, Protocol};
use crate::diagnose::{diagnose, Outcome, OutcomeKind};
use crate::error::{Error, ErrorKind};
use crate::model::{format_duration, TraceResult, TraceStep, Timing};
use crate::response::{
    canonical, canonical_name, first_cname, first_dname, has_answer_of_type, has_delegation,
    rcode_name, rr_strings, ns_target_strings, soa_string,
};
use crate::root_hints;

/// Depth limit for nameserver-address sub-traces.
const MAX_NS_RESOLUTION_DEPTH: usize = 4;

/// Tracer configuration.
#[derive(Clone, Copy, Debug)]
pub struct TracerConfig {
    /// Maximum delegation hops before giving up.
    pub max_hops: usize,
    /// Time budget per hop.
    pub max_time: Duration,
    /// Upper bound on in-flight exchanges within a hop.
    pub parallelism: usize,
    /// Record one step per server response instead of one aggregated step
    /// per hop.
    pub verbose: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            max_hops: 32,
            max_time: Duration::from_secs(2),
            parallelism: 6,
            verbose: false,
        }
    }
}

/// One server's contribution to a hop's fan-out.
struct ServerResponse {
    server: SocketAddr,
    protocol: Protocol,
    rtt: Duration,
    result: Result<Message, Error>,
    step_index: Option<usize>,
}

/// The authoritative delegation tracer.
pub struct Tracer {
    client: Arc<Client>,
    config: TracerConfig,
    roots: Vec<SocketAddr>,
    root_labels: HashMap<SocketAddr, String>,
}

impl Tracer {
    /// Create a tracer seeded with the well-known root hints.
    pub fn new(client: Arc<Client>, config: TracerConfig) -> Self {
        Self::with_roots(client, config, root_hints::endpoints(), root_hints::labels())
    }

    /// Create a tracer seeded with caller-supplied root endpoints.
    pub fn with_roots(
        client: Arc<Client>,
        config: TracerConfig,
        roots: Vec<SocketAddr>,
        root_labels: HashMap<SocketAddr, String>,
    ) -> Self {
        Self {
            client,
            config,
            roots,
            root_labels,
        }
    }

    /// Trace `fqdn`/`qtype` from the roots and classify the outcome.
    ///
    /// Only configuration problems return `Err`; every network or protocol
    /// failure folds into the diagnosis of the returned trace.
    pub async fn trace(&self, fqdn: &str, qtype: RecordType) -> Result<TraceResult, Error> {
        let mut name = canonical_name(fqdn)?;
        let mut servers = self.roots.clone();
        let mut labels = self.root_labels.clone();
        let mut visited: HashSet<Name> = HashSet::new();

        let mut result = TraceResult::default();

        for hop in 0..self.config.max_hops {
            debug!(%name, %qtype, hop, servers = servers.len(), "tracing hop");
            let mut responses = self
                .query_servers(
                    &servers,
                    &name,
                    qtype,
                    &mut result,
                    self.config.verbose,
                    &labels,
                )
                .await;

            let Some(best_index) = select_best(&responses, qtype) else {
                result.diagnosis = diagnose(Outcome {
                    kind: OutcomeKind::ServfailTimeout,
                    summary: "no reachable nameservers for delegation".to_string(),
                    evidence_step: latest_step_index(&result.steps),
                    hints: vec![
                        "check network reachability or nameserver availability".to_string()
                    ],
                });
                return Ok(result);
            };

            if !self.config.verbose {
                let step_index = result.steps.len();
                let mut step = build_step(step_index, &name, qtype, &responses[best_index], &labels);
                let mut note = summarize_responses(&responses);
                if let Ok(message) = &responses[best_index].result {
                    if has_delegation(message) {
                        if let (_, Some(zone)) = ns_names_and_zone(message) {
                            note = append_note(note, format!("referral={zone}"));
                        }
                    }
                }
                step.note = note;
                result.steps.push(step);
                result
                    .timings
                    .push(build_timing(step_index, &responses[best_index]));
                responses[best_index].step_index = Some(step_index);
            }

            let best = &responses[best_index];
            let evidence_step = best.step_index;
            let response = match &best.result {
                Ok(response) => response,
                Err(error) => {
                    result.diagnosis = diagnose(Outcome {
                        kind: OutcomeKind::ServfailTimeout,
                        summary: error.to_string(),
                        evidence_step,
                        hints: vec![
                            "retry with --transport tcp".to_string(),
                            "verify nameserver reachability".to_string(),
                        ],
                    });
                    return Ok(result);
                }
            };

            if response.response_code() == ResponseCode::NXDomain && response.authoritative() {
                result.diagnosis = diagnose(Outcome {
                    kind: OutcomeKind::Nxdomain,
                    summary: "authoritative NXDOMAIN".to_string(),
                    evidence_step,
                    hints: Vec::new(),
                });
                return Ok(result);
            }

            if response.response_code() == ResponseCode::NoError {
                if response.authoritative() && has_answer_of_type(response, qtype) {
                    result.diagnosis = diagnose(Outcome {
                        kind: OutcomeKind::Success,
                        summary: "authoritative answer returned".to_string(),
                        evidence_step,
                        hints: Vec::new(),
                    });
                    return Ok(result);
                }

                if let Some(target) = first_cname(response) {
                    if visited.contains(&target) {
                        result.diagnosis = diagnose(Outcome {
                            kind: OutcomeKind::ServfailTimeout,
                            summary: "CNAME loop detected".to_string(),
                            evidence_step,
                            hints: vec!["verify CNAME chain".to_string()],
                        });
                        return Ok(result);
                    }
                    debug!(%name, %target, "following CNAME");
                    visited.insert(target.clone());
                    name = target;
                    continue;
                }

                if let Some((owner, target)) = first_dname(response) {
                    let renamed = match apply_dname(&name, &owner, &target) {
                        Ok(renamed) => renamed,
                        Err(error) => {
                            result.diagnosis = diagnose(Outcome {
                                kind: OutcomeKind::ServfailTimeout,
                                summary: error.to_string(),
                                evidence_step,
                                hints: Vec::new(),
                            });
                            return Ok(result);
                        }
                    };
                    if visited.contains(&renamed) {
                        result.diagnosis = diagnose(Outcome {
                            kind: OutcomeKind::ServfailTimeout,
                            summary: "DNAME loop detected".to_string(),
                            evidence_step,
                            hints: vec!["verify DNAME chain".to_string()],
                        });
                        return Ok(result);
                    }
                    debug!(%name, %renamed, "following DNAME");
                    visited.insert(renamed.clone());
                    name = renamed;
                    continue;
                }

                if response.authoritative()
                    && soa_string(response).is_some()
                    && !has_answer_of_type(response, qtype)
                {
                    result.diagnosis = diagnose(Outcome {
                        kind: OutcomeKind::Nodata,
                        summary: "authoritative no data for RRtype".to_string(),
                        evidence_step,
                        hints: Vec::new(),
                    });
                    return Ok(result);
                }

                if has_delegation(response) {
                    let next_servers = extract_glue_servers(response);
                    let next_labels = extract_glue_labels(response);
                    if next_servers.is_empty() {
                        let (ns_names, zone) = ns_names_and_zone(response);
                        let (in_bailiwick, out_of_bailiwick) =
                            split_bailiwick(&ns_names, zone.as_ref());

                        let mut resolved = Vec::new();
                        if !out_of_bailiwick.is_empty() {
                            match self
                                .resolve_nameserver_addresses(
                                    &out_of_bailiwick,
                                    &mut result,
                                    0,
                                    false,
                                )
                                .await
                            {
                                Ok(addresses) => resolved = addresses,
                                Err(error) => {
                                    debug!(%error, "out-of-bailiwick nameserver resolution failed")
                                }
                            }
                        }
                        if !resolved.is_empty() {
                            servers = resolved;
                            if !next_labels.is_empty() {
                                labels = next_labels;
                            }
                            continue;
                        }

                        let mut hints = Vec::new();
                        if !in_bailiwick.is_empty() {
                            hints.push(
                                "missing glue records for in-bailiwick nameservers".to_string(),
                            );
                        }
                        if !out_of_bailiwick.is_empty() {
                            hints.push(
                                "unable to resolve out-of-bailiwick nameserver addresses"
                                    .to_string(),
                            );
                        }
                        result.diagnosis = diagnose(Outcome {
                            kind: OutcomeKind::BrokenDelegation,
                            summary: "delegation without glue".to_string(),
                            evidence_step,
                            hints,
                        });
                        return Ok(result);
                    }
                    servers = next_servers;
                    if !next_labels.is_empty() {
                        labels = next_labels;
                    }
                    continue;
                }

                if !response.authoritative() {
                    result.diagnosis = diagnose(Outcome {
                        kind: OutcomeKind::LameDelegation,
                        summary: "nameserver not authoritative for zone".to_string(),
                        evidence_step,
                        hints: vec![
                            "verify NS delegation and authoritative configuration".to_string()
                        ],
                    });
                    return Ok(result);
                }
            }

            if matches!(
                response.response_code(),
                ResponseCode::ServFail | ResponseCode::Refused
            ) {
                result.diagnosis = diagnose(Outcome {
                    kind: OutcomeKind::ServfailTimeout,
                    summary: rcode_name(response.response_code()),
                    evidence_step,
                    hints: vec!["check authoritative server health".to_string()],
                });
                return Ok(result);
            }
        }

        result.diagnosis = diagnose(Outcome {
            kind: OutcomeKind::ServfailTimeout,
            summary: "max hops exceeded".to_string(),
            evidence_step: latest_step_index(&result.steps),
            hints: vec![
                "increase --max-hops".to_string(),
                "check for CNAME loops".to_string(),
            ],
        });
        Ok(result)
    }

    /// Resolve the addresses of out-of-bailiwick nameserver names through
    /// recursive sub-traces, A then AAAA per name, unioned and deduplicated.
    #[async_recursion]
    async fn resolve_nameserver_addresses(
        &self,
        names: &[Name],
        result: &mut TraceResult,
        depth: usize,
        record: bool,
    ) -> Result<Vec<SocketAddr>, Error> {
        if depth > MAX_NS_RESOLUTION_DEPTH {
            return Err(ErrorKind::Message("nameserver resolution depth exceeded").into());
        }
        let mut addresses = Vec::new();
        for name in names {
            match self
                .resolve_host(name, RecordType::A, result, depth, record)
                .await
            {
                Ok(resolved) => addresses.extend(resolved),
                Err(error) => debug!(%name, %error, "nameserver A resolution failed"),
            }
            match self
                .resolve_host(name, RecordType::AAAA, result, depth, record)
                .await
            {
                Ok(resolved) => addresses.extend(resolved),
                Err(error) => debug!(%name, %error, "nameserver AAAA resolution failed"),
            }
        }
        let addresses = dedup_servers(addresses);
        if addresses.is_empty() {
            return Err(ErrorKind::Message("unable to resolve nameserver addresses").into());
        }
        Ok(addresses)
    }

    /// The inner iterative resolver: same hop rules as [`Tracer::trace`],
    /// but returns an address list on an authoritative answer and
    /// propagates every dead end as an error.
    #[async_recursion]
    async fn resolve_host(
        &self,
        host: &Name,
        qtype: RecordType,
        result: &mut TraceResult,
        depth: usize,
        record: bool,
    ) -> Result<Vec<SocketAddr>, Error> {
        let mut name = canonical(host);
        let mut servers = self.roots.clone();
        let mut labels = self.root_labels.clone();
        let mut visited: HashSet<Name> = HashSet::new();

        for _hop in 0..self.config.max_hops {
            let responses = self
                .query_servers(&servers, &name, qtype, result, record, &labels)
                .await;
            let Some(best_index) = select_best(&responses, qtype) else {
                return Err(ErrorKind::Msg(format!("no reachable nameservers for {name}")).into());
            };
            let Ok(response) = &responses[best_index].result else {
                return Err(ErrorKind::Msg(format!("no reachable nameservers for {name}")).into());
            };

            if response.response_code() == ResponseCode::NXDomain && response.authoritative() {
                return Err(ErrorKind::Msg(format!("nxdomain for {name}")).into());
            }

            if response.response_code() == ResponseCode::NoError {
                if response.authoritative() && has_answer_of_type(response, qtype) {
                    return Ok(extract_addresses(response, qtype));
                }

                if let Some(target) = first_cname(response) {
                    if visited.contains(&target) {
                        return Err(ErrorKind::Msg(format!("cname loop for {target}")).into());
                    }
                    visited.insert(target.clone());
                    name = target;
                    continue;
                }

                if let Some((owner, target)) = first_dname(response) {
                    let renamed = apply_dname(&name, &owner, &target)?;
                    if visited.contains(&renamed) {
                        return Err(ErrorKind::Msg(format!("dname loop for {renamed}")).into());
                    }
                    visited.insert(renamed.clone());
                    name = renamed;
                    continue;
                }

                if has_delegation(response) {
                    let next_servers = extract_glue_servers(response);
                    let next_labels = extract_glue_labels(response);
                    if next_servers.is_empty() {
                        let (ns_names, zone) = ns_names_and_zone(response);
                        let (in_bailiwick, out_of_bailiwick) =
                            split_bailiwick(&ns_names, zone.as_ref());
                        if out_of_bailiwick.is_empty() && !in_bailiwick.is_empty() {
                            let zone_name = zone
                                .map(|zone| zone.to_string())
                                .unwrap_or_else(|| name.to_string());
                            return Err(ErrorKind::Msg(format!(
                                "delegation without glue for {zone_name}"
                            ))
                            .into());
                        }
                        servers = self
                            .resolve_nameserver_addresses(
                                &out_of_bailiwick,
                                result,
                                depth + 1,
                                record,
                            )
                            .await?;
                        labels = next_labels;
                        continue;
                    }
                    servers = next_servers;
                    if !next_labels.is_empty() {
                        labels = next_labels;
                    }
                    continue;
                }
            }

            if matches!(
                response.response_code(),
                ResponseCode::ServFail | ResponseCode::Refused
            ) {
                return Err(ErrorKind::Msg(format!("server failure for {name}")).into());
            }
        }

        Err(ErrorKind::Msg(format!("max hops exceeded for {name}")).into())
    }

    /// Fan the query out to every server, at most `parallelism` in flight,
    /// all bounded by one hop deadline. Responses come back in server order.
    async fn query_servers(
        &self,
        servers: &[SocketAddr],
        name: &Name,
        qtype: RecordType,
        result: &mut TraceResult,
        record: bool,
        labels: &HashMap<SocketAddr, String>,
    ) -> Vec<ServerResponse> {
        let deadline = Instant::now() + self.config.max_time;
        let parallelism = self.config.parallelism.max(1);

        let queries: Vec<Pin<Box<dyn Future<Output = ServerResponse> + Send>>> = servers
            .iter()
            .map(|&server| {
                let client = self.client.clone();
                let name = name.clone();
                Box::pin(async move {
                    let message = client.build_query(name, qtype);
                    let (protocol, outcome) = client.exchange(server, &message, deadline).await;
                    match outcome {
                        Ok((message, rtt)) => ServerResponse {
                            server,
                            protocol,
                            rtt,
                            result: Ok(message),
                            step_index: None,
                        },
                        Err(error) => ServerResponse {
                            server,
                            protocol,
                            rtt: Duration::ZERO,
                            result: Err(error),
                            step_index: None,
                        },
                    }
                }) as Pin<Box<dyn Future<Output = ServerResponse> + Send>>
            })
            .collect();

        let mut responses: Vec<ServerResponse> = stream::iter(queries)
            .buffered(parallelism)
            .collect()
            .await;

        if record {
            for response in &mut responses {
                let step_index = result.steps.len();
                result
                    .steps
                    .push(build_step(step_index, name, qtype, response, labels));
                result.timings.push(build_timing(step_index, response));
                response.step_index = Some(step_index);
            }
        }

        responses
    }
}

fn build_step(
    index: usize,
    name: &Name,
    qtype: RecordType,
    response: &ServerResponse,
    labels: &HashMap<SocketAddr, String>,
) -> TraceStep {
    let mut step = TraceStep {
        index,
        server: response.server.to_string(),
        server_name: labels.get(&response.server).cloned().unwrap_or_default(),
        query_name: name.to_string(),
        query_type: qtype.to_string(),
        transport: response.protocol.to_string(),
        rtt: format_duration(response.rtt),
        timestamp: Utc::now(),
        ..TraceStep::default()
    };
    match &response.result {
        Err(error) => step.error = error.to_string(),
        Ok(message) => {
            step.authoritative = message.authoritative();
            step.rcode = rcode_name(message.response_code());
            step.answers = rr_strings(message.answers());
            step.ns = ns_target_strings(message.name_servers());
            step.soa = soa_string(message).unwrap_or_default();
        }
    }
    step
}

fn build_timing(index: usize, response: &ServerResponse) -> Timing {
    Timing {
        step_index: index,
        server: response.server.to_string(),
        rtt: format_duration(response.rtt),
        timed_out: matches!(&response.result, Err(error) if error.is_timeout()),
        transport: response.protocol.to_string(),
    }
}

/// Pick the single best response of a hop: authoritative answers first,
/// then authoritative responses, then delegations, then NXDOMAIN, then the
/// rest; ties broken by lower RTT, then by server endpoint string.
fn select_best(responses: &[ServerResponse], qtype: RecordType) -> Option<usize> {
    fn rank(message: &Message, qtype: RecordType) -> u8 {
        if message.authoritative()
            && message.response_code() == ResponseCode::NoError
            && has_answer_of_type(message, qtype)
        {
            return 0;
        }
        if message.authoritative() && message.response_code() == ResponseCode::NoError {
            return 1;
        }
        if message.authoritative() {
            return 2;
        }
        if has_delegation(message) {
            return 3;
        }
        if message.response_code() == ResponseCode::NXDomain {
            return 4;
        }
        5
    }

    let mut best: Option<(usize, u8)> = None;
    for (index, response) in responses.iter().enumerate() {
        let Ok(message) = &response.result else {
            continue;
        };
        let candidate_rank = rank(message, qtype);
        match best {
            None => best = Some((index, candidate_rank)),
            Some((best_index, best_rank)) => {
                let better = candidate_rank < best_rank
                    || (candidate_rank == best_rank
                        && response.rtt < responses[best_index].rtt)
                    || (candidate_rank == best_rank
                        && response.rtt == responses[best_index].rtt
                        && response.server.to_string() < responses[best_index].server.to_string());
                if better {
                    best = Some((index, candidate_rank));
                }
            }
        }
    }
    best.map(|(index, _)| index)
}

fn summarize_responses(responses: &[ServerResponse]) -> String {
    if responses.is_empty() {
        return String::new();
    }
    let mut ok = 0;
    let mut timeout = 0;
    let mut error = 0;
    for response in responses {
        match &response.result {
            Ok(_) => ok += 1,
            Err(e) if e.is_timeout() => timeout += 1,
            Err(_) => error += 1,
        }
    }
    format!(
        "responses={} ok={ok} timeout={timeout} error={error}",
        responses.len()
    )
}

fn append_note(note: String, extra: String) -> String {
    if note.is_empty() {
        return extra;
    }
    if extra.is_empty() {
        return note;
    }
    format!("{note} {extra}")
}

/// The NS targets of a referral and the zone they delegate, both canonical.
fn ns_names_and_zone(message: &Message) -> (Vec<Name>, Option<Name>) {
    let mut names = Vec::new();
    let mut zone = None;
    for record in message.name_servers() {
        if let Some(RData::NS(target)) = record.data() {
            if zone.is_none() {
                zone = Some(canonical(record.name()));
            }
            let target = canonical(&target.0);
            if !names.contains(&target) {
                names.push(target);
            }
        }
    }
    (names, zone)
}

/// Split nameserver names into in-bailiwick (must have glue) and
/// out-of-bailiwick (resolvable from the roots) relative to `zone`.
fn split_bailiwick(names: &[Name], zone: Option<&Name>) -> (Vec<Name>, Vec<Name>) {
    let Some(zone) = zone else {
        return (Vec::new(), names.to_vec());
    };
    let mut in_bailiwick = Vec::new();
    let mut out_of_bailiwick = Vec::new();
    for name in names {
        if zone.zone_of(name) {
            in_bailiwick.push(name.clone());
        } else {
            out_of_bailiwick.push(name.clone());
        }
    }
    (in_bailiwick, out_of_bailiwick)
}

/// Addresses of answer records matching the queried type, as `:53` endpoints.
fn extract_addresses(message: &Message, qtype: RecordType) -> Vec<SocketAddr> {
    let mut addresses = Vec::new();
    for record in message.answers() {
        match record.data() {
            Some(RData::A(a)) if qtype == RecordType::A => {
                addresses.push(SocketAddr::new(IpAddr::V4(a.0), 53));
            }
            Some(RData::AAAA(aaaa)) if qtype == RecordType::AAAA => {
                addresses.push(SocketAddr::new(IpAddr::V6(aaaa.0), 53));
            }
            _ => {}
        }
    }
    dedup_servers(addresses)
}

/// Glue endpoints: additional-section A/AAAA records owned by a referral's
/// NS targets, deduplicated and sorted by endpoint string.
fn extract_glue_servers(message: &Message) -> Vec<SocketAddr> {
    let targets: HashSet<Name> = message
        .name_servers()
        .iter()
        .filter_map(|record| match record.data() {
            Some(RData::NS(target)) => Some(canonical(&target.0)),
            _ => None,
        })
        .collect();

    let mut servers = Vec::new();
    for record in message.additionals() {
        if !targets.contains(&canonical(record.name())) {
            continue;
        }
        match record.data() {
            Some(RData::A(a)) => servers.push(SocketAddr::new(IpAddr::V4(a.0), 53)),
            Some(RData::AAAA(aaaa)) => servers.push(SocketAddr::new(IpAddr::V6(aaaa.0), 53)),
            _ => {}
        }
    }
    let mut servers = dedup_servers(servers);
    servers.sort_by_key(ToString::to_string);
    servers
}

/// Display labels for glue endpoints, keyed by endpoint.
fn extract_glue_labels(message: &Message) -> HashMap<SocketAddr, String> {
    let targets: HashMap<Name, String> = message
        .name_servers()
        .iter()
        .filter_map(|record| match record.data() {
            Some(RData::NS(target)) => {
                let target = canonical(&target.0);
                Some((target.clone(), target.to_string()))
            }
            _ => None,
        })
        .collect();

    let mut labels = HashMap::new();
    for record in message.additionals() {
        let Some(label) = targets.get(&canonical(record.name())) else {
            continue;
        };
        match record.data() {
            Some(RData::A(a)) => {
                labels.insert(SocketAddr::new(IpAddr::V4(a.0), 53), label.clone());
            }
            Some(RData::AAAA(aaaa)) => {
                labels.insert(SocketAddr::new(IpAddr::V6(aaaa.0), 53), label.clone());
            }
            _ => {}
        }
    }
    labels
}

/// Substitute a DNAME: the owner suffix of `name` is replaced by `target`.
/// All three names must be canonical; errors when `owner` is not a suffix of
/// `name`.
fn apply_dname(name: &Name, owner: &Name, target: &Name) -> Result<Name, Error> {
    if !owner.zone_of(name) {
        return Err(ErrorKind::Msg(format!("dname owner {owner} not suffix of {name}")).into());
    }
    let keep = usize::from(name.num_labels() - owner.num_labels());
    if keep == 0 {
        return Ok(canonical(target));
    }
    let prefix: Vec<&[u8]> = name.iter().take(keep).collect();
    let renamed = Name::from_labels(prefix)?.append_domain(target)?;
    Ok(canonical(&renamed))
}

fn dedup_servers(servers: Vec<SocketAddr>) -> Vec<SocketAddr> {
    let mut unique = Vec::new();
    for server in servers {
        if !unique.contains(&server) {
            unique.push(server);
        }
    }
    unique
}

fn latest_step_index(steps: &[TraceStep]) -> Option<usize> {
    steps.last().map(|step| step.index)
}
