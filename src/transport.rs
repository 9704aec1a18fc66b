// Copyright 2024 the dnswhy project developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// https://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// https://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! One-shot DNS exchanges over UDP and TCP.
//!
//! A [`Transport`] performs a single request/response round with one server;
//! mode selection, retries, and the truncation fallback live in
//! [`crate::client::Client`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_proto::op::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::debug;

use crate::error::{Error, ErrorKind};

/// Responses larger than this are truncated by the server and retried over
/// TCP by the client, so a fixed receive buffer is sufficient.
const MAX_RECEIVE_BUFFER: usize = 4_096;

/// A single DNS message exchange with one server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `message` to `server` and await the matching response.
    ///
    /// Returns the parsed response and the measured round-trip time.
    async fn exchange(
        &self,
        server: SocketAddr,
        message: &Message,
    ) -> Result<(Message, Duration), Error>;
}

/// Connected-socket UDP exchange.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpTransport;

#[async_trait]
impl Transport for UdpTransport {
    async fn exchange(
        &self,
        server: SocketAddr,
        message: &Message,
    ) -> Result<(Message, Duration), Error> {
        let start = Instant::now();
        let bind_address = match server {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(bind_address).await?;
        socket.connect(server).await?;

        let request = message.to_vec()?;
        socket.send(&request).await?;

        let mut buffer = vec![0u8; MAX_RECEIVE_BUFFER];
        loop {
            let length = socket.recv(&mut buffer).await?;
            let response = Message::from_vec(&buffer[..length])?;
            if response.id() == message.id() {
                return Ok((response, start.elapsed()));
            }
            debug!(
                %server,
                expected = message.id(),
                received = response.id(),
                "ignoring response with mismatched transaction id"
            );
        }
    }
}

/// Length-prefixed DNS-over-TCP exchange.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    async fn exchange(
        &self,
        server: SocketAddr,
        message: &Message,
    ) -> Result<(Message, Duration), Error> {
        let start = Instant::now();
        let mut stream = TcpStream::connect(server).await?;
        stream.set_nodelay(true)?;

        let request = message.to_vec()?;
        let length = u16::try_from(request.len())
            .map_err(|_| ErrorKind::Msg(format!("query of {} bytes overflows tcp framing", request.len())))?;
        let mut framed = Vec::with_capacity(request.len() + 2);
        framed.extend_from_slice(&length.to_be_bytes());
        framed.extend_from_slice(&request);
        stream.write_all(&framed).await?;

        let mut length_bytes = [0u8; 2];
        stream.read_exact(&mut length_bytes).await?;
        let mut buffer = vec![0u8; u16::from_be_bytes(length_bytes) as usize];
        stream.read_exact(&mut buffer).await?;

        let response = Message::from_vec(&buffer)?;
        Ok((response, start.elapsed()))
    }
}

/// The responder function backing a [`MockTransport`].
pub type Responder =
    dyn Fn(SocketAddr, &Message) -> Result<(Message, Duration), Error> + Send + Sync;

/// A scripted transport for tests and harnesses: every exchange is answered
/// by the supplied responder, no sockets involved.
#[derive(Clone)]
pub struct MockTransport {
    responder: Arc<Responder>,
}

impl MockTransport {
    /// Create a mock transport from a responder function.
    pub fn new(
        responder: impl Fn(SocketAddr, &Message) -> Result<(Message, Duration), Error>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            responder: Arc::new(responder),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exchange(
        &self,
        server: SocketAddr,
        message: &Message,
    ) -> Result<(Message, Duration), Error> {
        (self.responder)(server, message)
    }
}

#[cfg(test)]
mod tests {
    use hickory_proto::op::{MessageType, OpCode, Query, ResponseCode};
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{Name, RData, Record, RecordType};
    use tokio::net::TcpListener;

    use super::*;

    fn query(name: &str, qtype: RecordType) -> Message {
        let mut message = Message::new();
        message.set_id(rand::random());
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.add_query(Query::query(Name::from_utf8(name).unwrap(), qtype));
        message
    }

    fn answer_for(request: &Message) -> Message {
        let question = request.queries()[0].clone();
        let mut response = Message::new();
        response.set_id(request.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(OpCode::Query);
        response.set_response_code(ResponseCode::NoError);
        response.set_authoritative(true);
        response.add_answer(Record::from_rdata(
            question.name().clone(),
            60,
            RData::A(A(Ipv4Addr::new(192, 0, 2, 10))),
        ));
        response.add_query(question);
        response
    }

    #[tokio::test]
    async fn udp_exchange_round_trips() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_address = server_socket.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_RECEIVE_BUFFER];
            let (length, peer) = server_socket.recv_from(&mut buffer).await.unwrap();
            let request = Message::from_vec(&buffer[..length]).unwrap();
            let response = answer_for(&request).to_vec().unwrap();
            server_socket.send_to(&response, peer).await.unwrap();
        });

        let request = query("example.com.", RecordType::A);
        let (response, _rtt) = UdpTransport
            .exchange(server_address, &request)
            .await
            .unwrap();
        assert_eq!(response.id(), request.id());
        assert_eq!(response.answers().len(), 1);
    }

    #[tokio::test]
    async fn tcp_exchange_uses_length_prefix() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut length_bytes = [0u8; 2];
            stream.read_exact(&mut length_bytes).await.unwrap();
            let mut buffer = vec![0u8; u16::from_be_bytes(length_bytes) as usize];
            stream.read_exact(&mut buffer).await.unwrap();
            let request = Message::from_vec(&buffer).unwrap();

            let response = answer_for(&request).to_vec().unwrap();
            let mut framed = (response.len() as u16).to_be_bytes().to_vec();
            framed.extend_from_slice(&response);
            stream.write_all(&framed).await.unwrap();
        });

        let request = query("example.com.", RecordType::A);
        let (response, _rtt) = TcpTransport
            .exchange(server_address, &request)
            .await
            .unwrap();
        assert_eq!(response.answers().len(), 1);
    }

    #[tokio::test]
    async fn mock_transport_invokes_responder() {
        let mock = MockTransport::new(|_server, request| {
            Ok((answer_for(request), Duration::from_millis(5)))
        });
        let request = query("example.com.", RecordType::A);
        let (response, rtt) = mock
            .exchange("192.0.2.1:53".parse().unwrap(), &request)
            .await
            .unwrap();
        assert_eq!(response.answers().len(), 1);
        assert_eq!(rtt, Duration::from_millis(5));
    }
}
