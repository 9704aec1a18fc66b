// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Section inspection helpers shared by the ladder and tracer engines.

use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::{Name, RData, Record, RecordType};

use crate::error::Error;

/// Canonical form of a name: lowercase with the trailing dot present.
pub(crate) fn canonical(name: &Name) -> Name {
    let mut canonical = name.to_lowercase();
    canonical.set_fqdn(true);
    canonical
}

/// Parse operator input into a canonical name.
pub(crate) fn canonical_name(input: &str) -> Result<Name, Error> {
    Ok(canonical(&Name::from_utf8(input)?))
}

/// The display name of a response code, e.g. `NOERROR` or `NXDOMAIN`.
/// Codes outside the common set are preserved by name.
pub(crate) fn rcode_name(code: ResponseCode) -> String {
    let name = match code {
        ResponseCode::NoError => "NOERROR",
        ResponseCode::FormErr => "FORMERR",
        ResponseCode::ServFail => "SERVFAIL",
        ResponseCode::NXDomain => "NXDOMAIN",
        ResponseCode::NotImp => "NOTIMP",
        ResponseCode::Refused => "REFUSED",
        other => return format!("{other:?}").to_uppercase(),
    };
    name.to_string()
}

/// All records of a section in presentation format.
pub(crate) fn rr_strings(records: &[Record]) -> Vec<String> {
    records.iter().map(ToString::to_string).collect()
}

/// The NS targets of the authority section.
pub(crate) fn ns_target_strings(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| match record.data() {
            Some(RData::NS(target)) => Some(target.0.to_string()),
            _ => None,
        })
        .collect()
}

/// The first SOA record of the authority section, in presentation format.
pub(crate) fn soa_string(message: &Message) -> Option<String> {
    message
        .name_servers()
        .iter()
        .find(|record| matches!(record.data(), Some(RData::SOA(_))))
        .map(ToString::to_string)
}

/// Whether the answer section carries a record of the queried type.
pub(crate) fn has_answer_of_type(message: &Message, qtype: RecordType) -> bool {
    message
        .answers()
        .iter()
        .any(|record| record.record_type() == qtype)
}

/// The target of the first CNAME in the answer section.
pub(crate) fn first_cname(message: &Message) -> Option<Name> {
    message.answers().iter().find_map(|record| match record.data() {
        Some(RData::CNAME(target)) => Some(canonical(&target.0)),
        _ => None,
    })
}

/// The owner and target of the first DNAME in the answer section.
pub(crate) fn first_dname(message: &Message) -> Option<(Name, Name)> {
    message.answers().iter().find_map(|record| match record.data() {
        Some(RData::DNAME(target)) => Some((canonical(record.name()), canonical(&target.0))),
        _ => None,
    })
}

/// Whether the authority section carries NS records.
pub(crate) fn has_delegation(message: &Message) -> bool {
    message
        .name_servers()
        .iter()
        .any(|record| matches!(record.data(), Some(RData::NS(_))))
}

/// A referral: NOERROR with an empty answer section and NS in authority.
pub(crate) fn is_referral(message: &Message) -> bool {
    message.response_code() == ResponseCode::NoError
        && message.answers().is_empty()
        && has_delegation(message)
}
