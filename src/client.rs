// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The query client: EDNS0 decoration, transport-mode selection, retries,
//! and the UDP to TCP fallback on truncation.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::error::{Error, ErrorKind};
use crate::transport::{TcpTransport, Transport, UdpTransport};

/// Default EDNS0 advertised payload size, per the DNS flag day guidance.
pub const DEFAULT_EDNS_PAYLOAD_SIZE: u16 = 1_232;

/// How the client picks a transport for a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportMode {
    /// UDP only.
    Udp,
    /// TCP only.
    Tcp,
    /// UDP first, retried over TCP when the response is truncated.
    #[default]
    Auto,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Tcp => f.write_str("tcp"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            "auto" => Ok(Self::Auto),
            other => Err(ErrorKind::Msg(format!("unsupported transport mode: {other}")).into()),
        }
    }
}

/// The transport a query actually went over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    /// The exchange completed over UDP.
    Udp,
    /// The exchange completed over TCP.
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

/// Client configuration.
#[derive(Clone, Copy, Debug)]
pub struct ClientOptions {
    /// Set the DNSSEC OK bit on outgoing queries.
    pub dnssec: bool,
    /// Transport selection policy.
    pub mode: TransportMode,
    /// Total number of transport attempts per exchange; 1 means a single call.
    pub retries: usize,
    /// EDNS0 advertised payload size.
    pub edns_payload_size: u16,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            dnssec: false,
            mode: TransportMode::Auto,
            retries: 1,
            edns_payload_size: DEFAULT_EDNS_PAYLOAD_SIZE,
        }
    }
}

/// A DNS query client over interchangeable transports.
///
/// Each exchange owns its own transient connection, so a single client is
/// safe to share across concurrent exchanges.
pub struct Client {
    options: ClientOptions,
    udp: Arc<dyn Transport>,
    tcp: Arc<dyn Transport>,
}

impl Client {
    /// Create a client backed by the real UDP and TCP transports.
    pub fn new(options: ClientOptions) -> Self {
        Self::with_transports(options, Arc::new(UdpTransport), Arc::new(TcpTransport))
    }

    /// Create a client over caller-supplied transports.
    pub fn with_transports(
        options: ClientOptions,
        udp: Arc<dyn Transport>,
        tcp: Arc<dyn Transport>,
    ) -> Self {
        Self { options, udp, tcp }
    }

    /// Build a query for `name`/`qtype`: one IN question, a fresh transaction
    /// id, recursion not desired, and an EDNS0 OPT with the configured
    /// payload size and DO bit.
    pub fn build_query(&self, name: Name, qtype: RecordType) -> Message {
        let mut message = Message::new();
        message.set_id(rand::random());
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.set_recursion_desired(false);
        message.add_query(Query::query(name, qtype));

        let mut edns = Edns::new();
        edns.set_max_payload(self.options.edns_payload_size);
        edns.set_version(0);
        edns.set_dnssec_ok(self.options.dnssec);
        message.set_edns(edns);

        message
    }

    /// Exchange `message` with `server` under `deadline`.
    ///
    /// Returns the transport the final attempt went over together with the
    /// response and its round-trip time, or the last error.
    pub async fn exchange(
        &self,
        server: SocketAddr,
        message: &Message,
        deadline: Instant,
    ) -> (Protocol, Result<(Message, Duration), Error>) {
        match self.options.mode {
            TransportMode::Tcp => (
                Protocol::Tcp,
                self.exchange_with_retries(&*self.tcp, server, message, deadline, Protocol::Tcp)
                    .await,
            ),
            TransportMode::Udp => (
                Protocol::Udp,
                self.exchange_with_retries(&*self.udp, server, message, deadline, Protocol::Udp)
                    .await,
            ),
            TransportMode::Auto => {
                let outcome = self
                    .exchange_with_retries(&*self.udp, server, message, deadline, Protocol::Udp)
                    .await;
                match outcome {
                    Ok((response, _)) if response.truncated() => {
                        debug!(%server, "udp response truncated, retrying over tcp");
                        (
                            Protocol::Tcp,
                            self.exchange_with_retries(
                                &*self.tcp,
                                server,
                                message,
                                deadline,
                                Protocol::Tcp,
                            )
                            .await,
                        )
                    }
                    outcome => (Protocol::Udp, outcome),
                }
            }
        }
    }

    async fn exchange_with_retries(
        &self,
        transport: &dyn Transport,
        server: SocketAddr,
        message: &Message,
        deadline: Instant,
        protocol: Protocol,
    ) -> Result<(Message, Duration), Error> {
        let mut last_error: Option<Error> = None;
        for _attempt in 0..self.options.retries {
            if Instant::now() >= deadline {
                return Err(ErrorKind::Timeout.into());
            }
            match timeout_at(deadline, transport.exchange(server, message)).await {
                Ok(Ok((response, rtt))) => {
                    self.log_raw(protocol, server, message, &response);
                    return Ok((response, rtt));
                }
                Ok(Err(error)) => last_error = Some(error),
                Err(_elapsed) => last_error = Some(ErrorKind::Timeout.into()),
            }
        }
        Err(last_error.unwrap_or_else(|| ErrorKind::Message("dns exchange failed").into()))
    }

    fn log_raw(&self, protocol: Protocol, server: SocketAddr, request: &Message, response: &Message) {
        debug!(
            transport = %protocol,
            %server,
            message = ?request,
            "dns request"
        );
        debug!(
            transport = %protocol,
            %server,
            message = ?response,
            "dns response"
        );
    }
}

/// Normalize a server endpoint into canonical `ip:port` form, defaulting the
/// port to 53.
///
/// Accepts bare IPv4, `ipv4:port`, bare IPv6 (with or without brackets), and
/// `[ipv6]:port`.
pub fn normalize_server(server: &str) -> Result<SocketAddr, Error> {
    let trimmed = server.trim();
    if let Ok(address) = trimmed.parse::<SocketAddr>() {
        return Ok(address);
    }
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, 53));
    }
    if let Some(bare) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, 53));
        }
    }
    Err(ErrorKind::InvalidServerAddress(server.to_string()).into())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hickory_proto::op::ResponseCode;
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{RData, Record};

    use super::*;
    use crate::transport::MockTransport;

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    fn reply_to(request: &Message) -> Message {
        let question = request.queries()[0].clone();
        let mut response = Message::new();
        response.set_id(request.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(OpCode::Query);
        response.set_response_code(ResponseCode::NoError);
        response.add_query(question);
        response
    }

    #[test]
    fn normalize_server_shapes() {
        for (input, expected) in [
            ("1.1.1.1", "1.1.1.1:53"),
            ("1.1.1.1:5353", "1.1.1.1:5353"),
            ("2001:db8::1", "[2001:db8::1]:53"),
            ("[2001:db8::1]", "[2001:db8::1]:53"),
            ("[2001:db8::1]:53", "[2001:db8::1]:53"),
            (" 8.8.8.8 ", "8.8.8.8:53"),
        ] {
            assert_eq!(normalize_server(input).unwrap().to_string(), expected);
        }
        assert!(normalize_server("not-an-address").is_err());
        assert!(normalize_server("").is_err());
    }

    #[test]
    fn normalize_server_is_idempotent() {
        for input in ["1.1.1.1", "2001:db8::1", "[2001:db8::1]:5353"] {
            let once = normalize_server(input).unwrap();
            let twice = normalize_server(&once.to_string()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn build_query_shape() {
        let client = Client::new(ClientOptions {
            dnssec: true,
            ..ClientOptions::default()
        });
        let query = client.build_query(Name::from_utf8("example.com.").unwrap(), RecordType::A);

        assert_eq!(query.queries().len(), 1);
        assert_eq!(query.queries()[0].query_type(), RecordType::A);
        assert!(!query.recursion_desired());

        let edns = query.extensions().as_ref().unwrap();
        assert_eq!(edns.max_payload(), DEFAULT_EDNS_PAYLOAD_SIZE);
        assert!(edns.dnssec_ok());
    }

    #[test]
    fn build_query_ids_are_fresh() {
        let client = Client::new(ClientOptions::default());
        let name = Name::from_utf8("example.com.").unwrap();
        let ids: Vec<u16> = (0..8)
            .map(|_| client.build_query(name.clone(), RecordType::A).id())
            .collect();
        assert!(ids.iter().any(|id| *id != ids[0]), "ids never vary: {ids:?}");
    }

    #[tokio::test]
    async fn retries_is_a_total_attempt_count() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = attempts.clone();
        let failing = Arc::new(MockTransport::new(move |_server, _request| {
            counted.fetch_add(1, Ordering::SeqCst);
            Err(ErrorKind::Message("connection refused").into())
        }));

        let client = Client::with_transports(
            ClientOptions {
                mode: TransportMode::Udp,
                retries: 1,
                ..ClientOptions::default()
            },
            failing.clone(),
            failing.clone(),
        );
        let query = client.build_query(Name::from_utf8("example.com.").unwrap(), RecordType::A);
        let (protocol, outcome) = client
            .exchange("192.0.2.1:53".parse().unwrap(), &query, far_deadline())
            .await;

        assert_eq!(protocol, Protocol::Udp);
        assert!(outcome.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_repeat_on_transport_error() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = attempts.clone();
        let failing = Arc::new(MockTransport::new(move |_server, _request| {
            counted.fetch_add(1, Ordering::SeqCst);
            Err(ErrorKind::Message("connection refused").into())
        }));

        let client = Client::with_transports(
            ClientOptions {
                mode: TransportMode::Udp,
                retries: 3,
                ..ClientOptions::default()
            },
            failing.clone(),
            failing,
        );
        let query = client.build_query(Name::from_utf8("example.com.").unwrap(), RecordType::A);
        let (_, outcome) = client
            .exchange("192.0.2.1:53".parse().unwrap(), &query, far_deadline())
            .await;

        assert!(outcome.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn expired_deadline_short_circuits() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = attempts.clone();
        let mock = Arc::new(MockTransport::new(move |_server, request| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok((reply_to(request), Duration::from_millis(1)))
        }));

        let client = Client::with_transports(
            ClientOptions {
                mode: TransportMode::Udp,
                ..ClientOptions::default()
            },
            mock.clone(),
            mock,
        );
        let query = client.build_query(Name::from_utf8("example.com.").unwrap(), RecordType::A);
        let expired = Instant::now();
        let (_, outcome) = client
            .exchange("192.0.2.1:53".parse().unwrap(), &query, expired)
            .await;

        assert!(outcome.unwrap_err().is_timeout());
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn auto_mode_falls_back_to_tcp_on_truncation() {
        let udp = Arc::new(MockTransport::new(|_server, request| {
            let mut response = reply_to(request);
            response.set_truncated(true);
            Ok((response, Duration::from_millis(2)))
        }));
        let tcp = Arc::new(MockTransport::new(|_server, request| {
            let mut response = reply_to(request);
            response.set_authoritative(true);
            response.add_answer(Record::from_rdata(
                request.queries()[0].name().clone(),
                60,
                RData::A(A(std::net::Ipv4Addr::new(192, 0, 2, 10))),
            ));
            Ok((response, Duration::from_millis(4)))
        }));

        let client = Client::with_transports(ClientOptions::default(), udp, tcp);
        let query = client.build_query(Name::from_utf8("example.com.").unwrap(), RecordType::A);
        let (protocol, outcome) = client
            .exchange("192.0.2.1:53".parse().unwrap(), &query, far_deadline())
            .await;

        assert_eq!(protocol, Protocol::Tcp);
        let (response, _) = outcome.unwrap();
        assert_eq!(response.answers().len(), 1);
        assert!(!response.truncated());
    }

    #[tokio::test]
    async fn auto_mode_fallback_works_over_real_sockets() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, UdpSocket};

        let udp_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_address = udp_socket.local_addr().unwrap();
        let tcp_listener = TcpListener::bind(server_address).await.unwrap();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; 4096];
            let (length, peer) = udp_socket.recv_from(&mut buffer).await.unwrap();
            let request = Message::from_vec(&buffer[..length]).unwrap();
            let mut response = reply_to(&request);
            response.set_truncated(true);
            udp_socket
                .send_to(&response.to_vec().unwrap(), peer)
                .await
                .unwrap();
        });

        tokio::spawn(async move {
            let (mut stream, _) = tcp_listener.accept().await.unwrap();
            let mut length_bytes = [0u8; 2];
            stream.read_exact(&mut length_bytes).await.unwrap();
            let mut buffer = vec![0u8; u16::from_be_bytes(length_bytes) as usize];
            stream.read_exact(&mut buffer).await.unwrap();
            let request = Message::from_vec(&buffer).unwrap();

            let mut response = reply_to(&request);
            response.set_authoritative(true);
            response.add_answer(Record::from_rdata(
                request.queries()[0].name().clone(),
                60,
                RData::A(A(std::net::Ipv4Addr::new(192, 0, 2, 10))),
            ));
            let encoded = response.to_vec().unwrap();
            let mut framed = (encoded.len() as u16).to_be_bytes().to_vec();
            framed.extend_from_slice(&encoded);
            stream.write_all(&framed).await.unwrap();
        });

        let client = Client::new(ClientOptions::default());
        let query = client.build_query(Name::from_utf8("example.com.").unwrap(), RecordType::A);
        let (protocol, outcome) = client
            .exchange(server_address, &query, far_deadline())
            .await;

        assert_eq!(protocol, Protocol::Tcp);
        let (response, _) = outcome.unwrap();
        assert_eq!(response.answers().len(), 1);
    }

    #[tokio::test]
    async fn udp_mode_returns_truncated_response_untouched() {
        let udp = Arc::new(MockTransport::new(|_server, request| {
            let mut response = reply_to(request);
            response.set_truncated(true);
            Ok((response, Duration::from_millis(2)))
        }));
        let tcp = Arc::new(MockTransport::new(|_server, _request| {
            Err(ErrorKind::Message("tcp must not be used").into())
        }));

        let client = Client::with_transports(
            ClientOptions {
                mode: TransportMode::Udp,
                ..ClientOptions::default()
            },
            udp,
            tcp,
        );
        let query = client.build_query(Name::from_utf8("example.com.").unwrap(), RecordType::A);
        let (protocol, outcome) = client
            .exchange("192.0.2.1:53".parse().unwrap(), &query, far_deadline())
            .await;

        assert_eq!(protocol, Protocol::Udp);
        assert!(outcome.unwrap().0.truncated());
    }
}
