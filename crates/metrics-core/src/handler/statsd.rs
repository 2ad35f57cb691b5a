// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Statsd handler: one UDP datagram per metric, fire and forget.
//!
//! Each metric is written as a raw statsd record, `group.name:value|r|timestamp`, where the
//! group is every path segment but the last. Datagrams may be lost; a successful send only
//! means the OS accepted the payload.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Mutex, PoisonError};

use crate::config::{optional, parse, required, Options};
use crate::errors::Creation;
use crate::handler::Handler;
use crate::metric::Metric;
use crate::util::parse_metric_namespace;
use tracing::{debug, error, trace};

pub const DEFAULT_STATSD_PORT: u16 = 8125;

/// Configuration for the statsd handler
#[derive(Clone, Debug, PartialEq)]
pub struct StatsdConfig {
    /// Destination host (e.g., "127.0.0.1" or "statsd.internal")
    pub host: String,
    /// Destination UDP port (e.g., 8125)
    pub port: u16,
    /// Optional namespace prepended to every record (e.g., "servers.web01")
    pub metric_namespace: Option<String>,
}

impl StatsdConfig {
    /// Reads `host`, `port` and the optional `namespace` from the handler's options.
    pub fn from_options(options: &Options) -> Result<Self, Creation> {
        let host = required(options, "host")?.to_string();
        let port: u16 = parse("port", required(options, "port")?)?;
        if port == 0 {
            return Err(Creation::InvalidOption {
                option: "port",
                value: port.to_string(),
            });
        }
        let metric_namespace = match optional(options, "namespace") {
            Some(raw) => Some(parse_metric_namespace(raw).ok_or_else(|| {
                Creation::InvalidOption {
                    option: "namespace",
                    value: raw.to_string(),
                }
            })?),
            None => None,
        };
        Ok(StatsdConfig {
            host,
            port,
            metric_namespace,
        })
    }
}

/// A best-effort datagram sink. No acknowledgement is ever read back.
pub trait Transport: Send {
    fn send(&mut self, payload: &[u8]) -> io::Result<()>;
}

/// Local UDP socket connected to the statsd endpoint.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Resolves `host:port`, binds an ephemeral local socket and connects it to the first
    /// resolved address.
    pub fn connect(host: &str, port: u16) -> Result<Self, Creation> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|e| Creation::Resolve(format!("{host}:{port}: {e}")))?
            .next()
            .ok_or_else(|| Creation::Resolve(format!("{host}:{port}: no addresses")))?;

        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(target)?;
        // A full send buffer drops the datagram instead of stalling the caller.
        socket.set_nonblocking(true)?;
        debug!("statsd socket {:?} connected to {}", socket.local_addr(), target);
        Ok(UdpTransport { socket })
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket.peer_addr()
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.socket.send(payload).map(|_| ())
    }
}

/// Formats one metric as a raw statsd record.
pub fn format_record(metric_namespace: Option<&str>, metric: &Metric) -> String {
    let (group, name) = metric.split_path();
    let mut path = String::new();
    for segment in [metric_namespace, group].into_iter().flatten() {
        path.push_str(segment);
        path.push('.');
    }
    path.push_str(name);
    format!("{path}:{}|r|{}", metric.value(), metric.timestamp())
}

/// Handler sending every metric to a statsd server.
///
/// The transport is shared by every caller and guarded by a mutex held only while the record is
/// formatted and sent.
pub struct StatsdHandler<T: Transport = UdpTransport> {
    metric_namespace: Option<String>,
    transport: Mutex<T>,
}

impl StatsdHandler<UdpTransport> {
    /// Creates the handler and its socket. The socket lives as long as the handler.
    pub fn connect(config: &StatsdConfig) -> Result<Self, Creation> {
        let transport = UdpTransport::connect(&config.host, config.port)?;
        debug!("Initialized statsd handler for {}:{}", config.host, config.port);
        Ok(Self::with_transport(config.metric_namespace.clone(), transport))
    }
}

impl<T: Transport> StatsdHandler<T> {
    pub fn with_transport(metric_namespace: Option<String>, transport: T) -> Self {
        StatsdHandler {
            metric_namespace,
            transport: Mutex::new(transport),
        }
    }
}

impl<T: Transport> Handler for StatsdHandler<T> {
    fn name(&self) -> &str {
        "statsd"
    }

    fn process(&self, metric: &Metric) {
        // A panic in an earlier send leaves the socket itself usable.
        let mut transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let record = format_record(self.metric_namespace.as_deref(), metric);
        trace!("Sending {}", record);
        if let Err(e) = transport.send(record.as_bytes()) {
            error!("Failed to send {} to statsd: {}", metric.path(), e);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::metric::MetricValue;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn options(pairs: &[(&str, &str)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_format_record() {
        let metric = Metric::new("mongo.connections.current", 12, 1656581409).unwrap();
        assert_eq!(
            format_record(None, &metric),
            "mongo.connections.current:12|r|1656581409"
        );
        assert_eq!(
            format_record(Some("servers.db01"), &metric),
            "servers.db01.mongo.connections.current:12|r|1656581409"
        );
    }

    #[test]
    fn test_format_record_single_segment() {
        let metric = Metric::new("uptime", MetricValue::Raw("3.5".to_string()), 7).unwrap();
        assert_eq!(format_record(None, &metric), "uptime:3.5|r|7");
        assert_eq!(format_record(Some("app"), &metric), "app.uptime:3.5|r|7");
    }

    #[test]
    fn test_config_from_options() {
        let config = StatsdConfig::from_options(&options(&[
            ("host", "127.0.0.1"),
            ("port", "8125"),
            ("namespace", "servers.web01"),
        ]))
        .unwrap();
        assert_eq!(
            config,
            StatsdConfig {
                host: "127.0.0.1".to_string(),
                port: 8125,
                metric_namespace: Some("servers.web01".to_string()),
            }
        );
    }

    #[test]
    fn test_config_requires_host_and_port() {
        assert!(matches!(
            StatsdConfig::from_options(&options(&[("port", "8125")])),
            Err(Creation::MissingOption("host"))
        ));
        assert!(matches!(
            StatsdConfig::from_options(&options(&[("host", "localhost")])),
            Err(Creation::MissingOption("port"))
        ));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        for (port, namespace) in [("0", "ok"), ("http", "ok"), ("8125", "1bad")] {
            let result = StatsdConfig::from_options(&options(&[
                ("host", "localhost"),
                ("port", port),
                ("namespace", namespace),
            ]));
            assert!(
                matches!(result, Err(Creation::InvalidOption { .. })),
                "port={port} namespace={namespace}"
            );
        }
    }

    #[test]
    fn test_handler_sends_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let handler = StatsdHandler::connect(&StatsdConfig {
            host: "127.0.0.1".to_string(),
            port,
            metric_namespace: Some("test".to_string()),
        })
        .unwrap();

        handler.process(&Metric::new("db.ops.insert", 5, 100).unwrap());

        let mut buf = [0u8; 512];
        let (amt, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..amt], b"test.db.ops.insert:5|r|100");
    }

    struct BrokenTransport {
        attempts: usize,
    }

    impl Transport for BrokenTransport {
        fn send(&mut self, _payload: &[u8]) -> io::Result<()> {
            self.attempts += 1;
            Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "network unreachable",
            ))
        }
    }

    #[test]
    #[traced_test]
    fn test_send_errors_are_logged_not_raised() {
        let handler = StatsdHandler::with_transport(None, BrokenTransport { attempts: 0 });
        let metric = Metric::new("a.b", 1, 0).unwrap();

        handler.process(&metric);
        handler.process(&metric);

        assert!(logs_contain("Failed to send a.b to statsd"));
        assert_eq!(handler.transport.lock().unwrap().attempts, 2);
    }
}
