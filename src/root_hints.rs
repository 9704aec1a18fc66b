// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The well-known IPv4 root-server endpoints the tracer starts from.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const ROOT_SERVERS: &[(Ipv4Addr, &str)] = &[
    (Ipv4Addr::new(198, 41, 0, 4), "a.root-servers.net"),
    (Ipv4Addr::new(199, 9, 14, 201), "b.root-servers.net"),
    (Ipv4Addr::new(192, 33, 4, 12), "c.root-servers.net"),
    (Ipv4Addr::new(199, 7, 91, 13), "d.root-servers.net"),
    (Ipv4Addr::new(192, 203, 230, 10), "e.root-servers.net"),
    (Ipv4Addr::new(192, 5, 5, 241), "f.root-servers.net"),
    (Ipv4Addr::new(192, 112, 36, 4), "g.root-servers.net"),
    (Ipv4Addr::new(198, 97, 190, 53), "h.root-servers.net"),
    (Ipv4Addr::new(192, 36, 148, 17), "i.root-servers.net"),
    (Ipv4Addr::new(192, 58, 128, 30), "j.root-servers.net"),
    (Ipv4Addr::new(193, 0, 14, 129), "k.root-servers.net"),
    (Ipv4Addr::new(199, 7, 83, 42), "l.root-servers.net"),
    (Ipv4Addr::new(202, 12, 27, 33), "m.root-servers.net"),
];

/// The 13 root-server endpoints, port 53.
pub fn endpoints() -> Vec<SocketAddr> {
    ROOT_SERVERS
        .iter()
        .map(|(ip, _)| SocketAddr::new(IpAddr::V4(*ip), 53))
        .collect()
}

/// Display labels for the root-server endpoints.
pub fn labels() -> HashMap<SocketAddr, String> {
    ROOT_SERVERS
        .iter()
        .map(|(ip, label)| (SocketAddr::new(IpAddr::V4(*ip), 53), (*label).to_string()))
        .collect()
}
