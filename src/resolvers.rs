// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Discovery of the recursive resolvers the ladder walks.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, ErrorKind};

/// Well-known public resolvers appended after the system ones.
pub const DEFAULT_PUBLIC_RESOLVERS: [&str; 5] =
    ["1.1.1.1", "1.0.0.1", "8.8.8.8", "8.8.4.4", "9.9.9.9"];

/// The `nameserver` entries of `/etc/resolv.conf`, in file order.
pub fn system_resolvers() -> Result<Vec<String>, Error> {
    read_resolv_conf("/etc/resolv.conf")
}

/// System resolvers followed by the public fallbacks, deduplicated
/// case-insensitively preserving first occurrence.
pub fn default_resolver_chain() -> Result<Vec<String>, Error> {
    let mut resolvers = system_resolvers()?;
    resolvers.extend(DEFAULT_PUBLIC_RESOLVERS.iter().map(|s| (*s).to_string()));
    Ok(unique_resolvers(resolvers))
}

fn read_resolv_conf<P: AsRef<Path>>(path: P) -> Result<Vec<String>, Error> {
    let mut data = String::new();
    File::open(path)?.read_to_string(&mut data)?;
    parse_resolv_conf(&data)
}

fn parse_resolv_conf(data: &str) -> Result<Vec<String>, Error> {
    let config = resolv_conf::Config::parse(data)
        .map_err(|error| ErrorKind::Msg(format!("error parsing resolv.conf: {error}")))?;
    Ok(config
        .nameservers
        .iter()
        .map(ToString::to_string)
        .collect())
}

fn unique_resolvers(resolvers: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    let mut unique = Vec::new();
    for resolver in resolvers {
        let resolver = resolver.trim().to_string();
        if resolver.is_empty() {
            continue;
        }
        let key = resolver.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        unique.push(resolver);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nameserver_lines_ignoring_comments() {
        let data = "# generated by systemd\n; local override\n\nnameserver 1.1.1.1\nsearch example.com\nnameserver 2001:db8::1\n";
        let resolvers = parse_resolv_conf(data).unwrap();
        assert_eq!(resolvers, vec!["1.1.1.1", "2001:db8::1"]);
    }

    #[test]
    fn deduplication_preserves_first_occurrence() {
        let resolvers = unique_resolvers(vec![
            "192.0.2.1".to_string(),
            "1.1.1.1".to_string(),
            " 192.0.2.1 ".to_string(),
            "8.8.8.8".to_string(),
            "1.1.1.1".to_string(),
        ]);
        assert_eq!(resolvers, vec!["192.0.2.1", "1.1.1.1", "8.8.8.8"]);
    }

    #[test]
    fn fallbacks_follow_system_entries() {
        let mut resolvers = parse_resolv_conf("nameserver 192.0.2.1\nnameserver 8.8.8.8\n").unwrap();
        resolvers.extend(DEFAULT_PUBLIC_RESOLVERS.iter().map(|s| (*s).to_string()));
        let chain = unique_resolvers(resolvers);
        assert_eq!(
            chain,
            vec!["192.0.2.1", "8.8.8.8", "1.1.1.1", "1.0.0.1", "8.8.4.4", "9.9.9.9"]
        );
    }
}
