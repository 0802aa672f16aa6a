//! ICAP server: accept loop and per-connection message handling.
//!
//! # Responsibilities
//! - Accept proxy connections through the bounded listener
//! - Read ICAP requests on persistent connections
//! - Hand each request to the decision engine and write its outcome
//! - Drive the preview / `100 Continue` exchange when a body must be echoed
//! - Stop accepting on shutdown and drain open connections
//!
//! # Design Decisions
//! - One task per connection; requests on a connection are sequential
//! - Malformed messages get `400` and the connection is closed
//! - Bodies of unsupported methods are never read; the connection is closed instead

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tracing::Instrument;

use super::chunked::read_chunked;
use super::head::{read_head, Encapsulated, IcapRequestHead, Section};
use super::http_head::parse_request_head;
use super::response::{write_bad_request, write_outcome, Payload, ServiceIdentity, CONTINUE};
use super::IcapError;
use crate::adapt::{AdaptationMethod, AdaptationRequest, DecisionEngine};
use crate::classify;
use crate::config::{LimitsConfig, ServiceConfig};
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::{decision_log, metrics, DecisionLogger};

/// Shared, read-only state for all connections.
struct ServiceState {
    engine: DecisionEngine,
    identity: ServiceIdentity,
    limits: LimitsConfig,
    idle_timeout: Duration,
}

/// ICAP server for the credential-stripping service.
pub struct IcapServer {
    state: Arc<ServiceState>,
    tracker: ConnectionTracker,
    shutdown_grace: Duration,
}

impl IcapServer {
    /// Create a server around an existing decision engine.
    pub fn new(config: &ServiceConfig, engine: DecisionEngine) -> Self {
        let state = ServiceState {
            engine,
            identity: ServiceIdentity {
                istag: config.service.istag.clone(),
                service: config.service.name.clone(),
                max_connections: config.listener.max_connections,
            },
            limits: config.limits.clone(),
            idle_timeout: Duration::from_secs(config.timeouts.idle_secs),
        };
        Self {
            state: Arc::new(state),
            tracker: ConnectionTracker::new(),
            shutdown_grace: Duration::from_secs(config.timeouts.shutdown_grace_secs),
        }
    }

    /// Create a server with the classifier and decision sink named by configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let classifier = classify::from_kind(config.service.classifier);
        let logger = DecisionLogger::new(decision_log::sink_for(config.observability.decision_log));
        Self::new(config, DecisionEngine::new(classifier, logger))
    }

    /// Accept connections until `shutdown` fires, then drain open ones.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            address = ?listener.local_addr().ok(),
            istag = %self.state.identity.istag,
            "ICAP server starting"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(accepted) => accepted,
                        Err(ListenerError::Accept(e)) => {
                            tracing::warn!(error = %e, "Accept failed");
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            continue;
                        }
                        Err(e) => return Err(e),
                    };

                    let guard = self.tracker.track();
                    let state = Arc::clone(&self.state);
                    let span = tracing::debug_span!("connection", id = %guard.id(), peer = %peer);
                    tokio::spawn(
                        async move {
                            let _permit = permit;
                            let _guard = guard;
                            serve_connection(&state, stream).await;
                        }
                        .instrument(span),
                    );
                }
            }
        }

        if !self.tracker.drain(self.shutdown_grace).await {
            tracing::warn!(
                open_connections = self.tracker.active_count(),
                "Shutdown grace period elapsed with connections still open"
            );
        }
        tracing::info!("ICAP server stopped");
        Ok(())
    }
}

/// Serve requests on one connection until it closes or fails.
async fn serve_connection<S>(state: &ServiceState, stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    loop {
        match serve_one(state, &mut stream).await {
            Ok(true) => continue,
            Ok(false) => break,
            Err(e) => {
                metrics::record_protocol_error(e.kind());
                if e.is_client_error() {
                    tracing::warn!(error = %e, "Rejecting malformed ICAP message");
                    let _ = stream.get_mut().write_all(&write_bad_request(&state.identity)).await;
                } else {
                    tracing::debug!(error = %e, "Connection ended mid-message");
                }
                break;
            }
        }
    }
    let _ = stream.get_mut().shutdown().await;
}

/// Handle one ICAP request. Returns whether the connection stays open.
async fn serve_one<S>(state: &ServiceState, stream: &mut BufReader<S>) -> Result<bool, IcapError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let limits = &state.limits;
    let head = match tokio::time::timeout(
        state.idle_timeout,
        read_head(stream, limits.max_header_bytes, "ICAP head"),
    )
    .await
    {
        Err(_) => {
            tracing::debug!("Idle timeout");
            return Ok(false);
        }
        Ok(head) => match head? {
            Some(head) => head,
            None => return Ok(false),
        },
    };

    let head = IcapRequestHead::parse(&head)?;
    let method = AdaptationMethod::parse(&head.method);
    let encapsulated = match head.encapsulated()? {
        Some(encapsulated) => encapsulated,
        None if method == AdaptationMethod::Reqmod => {
            return Err(IcapError::MalformedEncapsulated("missing".into()));
        }
        None => Encapsulated::null(),
    };
    let mut close = head.wants_close();

    let header_len = encapsulated.header_bytes();

    if let AdaptationMethod::Other(_) = method {
        // Header sections within limits are read so the log line can name the
        // target; bodies are never read and an oversize head is left unread.
        let mut carried = None;
        let mut drained = header_len == 0;
        if header_len > 0 && header_len <= limits.max_header_bytes {
            let sections = read_sections(state, stream, header_len).await?;
            carried = encapsulated
                .range(Section::ReqHdr)
                .and_then(|range| parse_request_head(&sections[range]).ok());
            drained = true;
        }

        let mut request = AdaptationRequest::new(method, head.allows_204(), carried);
        let outcome = state.engine.decide(&mut request);
        close |= !drained || encapsulated.body().is_some();
        send(stream, &write_outcome(&state.identity, outcome, Payload::Empty, close)).await?;
        return Ok(!close);
    }

    if header_len > limits.max_header_bytes {
        return Err(IcapError::TooLarge {
            what: "encapsulated HTTP head",
            limit: limits.max_header_bytes,
        });
    }
    let sections = read_sections(state, stream, header_len).await?;

    let carried = match encapsulated.range(Section::ReqHdr) {
        Some(range) => Some(parse_request_head(&sections[range])?),
        None => None,
    };

    let has_body = encapsulated.body().is_some();
    let mut body = Vec::new();
    let mut complete = true;
    if has_body {
        let ieof = timed(
            state.idle_timeout,
            read_chunked(stream, &mut body, limits.max_body_bytes),
        )
        .await?;
        if head.preview()?.is_some() {
            complete = ieof;
        }
    }

    let mut request = AdaptationRequest::new(method, head.allows_204(), carried);
    let outcome = state.engine.decide(&mut request);

    if outcome.echoes_request() && has_body && !complete {
        send(stream, CONTINUE).await?;
        timed(
            state.idle_timeout,
            read_chunked(stream, &mut body, limits.max_body_bytes),
        )
        .await?;
    }

    let payload = match &request.carried {
        Some(carried) => Payload::Request {
            request: carried,
            body: has_body.then_some(&body[..]),
        },
        None => Payload::Empty,
    };
    send(stream, &write_outcome(&state.identity, outcome, payload, close)).await?;

    Ok(!close)
}

async fn read_sections<S>(
    state: &ServiceState,
    stream: &mut BufReader<S>,
    len: usize,
) -> Result<Vec<u8>, IcapError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut sections = vec![0u8; len];
    timed(state.idle_timeout, async {
        stream.read_exact(&mut sections).await.map_err(eof_or_io)?;
        Ok::<_, IcapError>(())
    })
    .await?;
    Ok(sections)
}

async fn send<S>(stream: &mut BufReader<S>, bytes: &[u8]) -> Result<(), IcapError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let inner = stream.get_mut();
    inner.write_all(bytes).await?;
    inner.flush().await?;
    Ok(())
}

async fn timed<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, IcapError>>,
) -> Result<T, IcapError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| IcapError::Io(std::io::ErrorKind::TimedOut.into()))?
}

fn eof_or_io(e: std::io::Error) -> IcapError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        IcapError::UnexpectedEof
    } else {
        IcapError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::GrammarClassifier;
    use crate::observability::MemorySink;
    use tokio::io::duplex;

    fn state(sink: Arc<MemorySink>) -> Arc<ServiceState> {
        let config = ServiceConfig::default();
        let engine = DecisionEngine::new(Arc::new(GrammarClassifier::new()), DecisionLogger::new(sink));
        IcapServer::new(&config, engine).state
    }

    async fn exchange(input: &[u8]) -> (String, Vec<String>) {
        let sink = Arc::new(MemorySink::new());
        let state = state(sink.clone());
        let (mut client, server) = duplex(64 * 1024);

        client.write_all(input).await.unwrap();
        client.shutdown().await.unwrap();
        serve_connection(&state, server).await;

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        (out, sink.lines())
    }

    #[tokio::test]
    async fn pipelined_requests_on_one_connection() {
        let (out, lines) = exchange(
            b"OPTIONS icap://localhost/authstrip ICAP/1.0\r\nEncapsulated: null-body=0\r\n\r\n\
              OPTIONS icap://localhost/authstrip ICAP/1.0\r\nEncapsulated: null-body=0\r\n\r\n",
        )
        .await;
        assert_eq!(out.matches("ICAP/1.0 200 OK").count(), 2);
        assert_eq!(lines, vec!["OPTIONS 200", "OPTIONS 200"]);
    }

    #[tokio::test]
    async fn garbage_gets_bad_request() {
        let (out, lines) = exchange(b"HELLO\r\n\r\n").await;
        assert!(out.starts_with("ICAP/1.0 400 Bad Request\r\n"));
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn reqmod_without_encapsulated_is_rejected() {
        let (out, _) = exchange(b"REQMOD icap://localhost/authstrip ICAP/1.0\r\nAllow: 204\r\n\r\n").await;
        assert!(out.starts_with("ICAP/1.0 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn unsupported_method_with_body_closes() {
        let (out, lines) = exchange(
            b"RESPMOD icap://localhost/authstrip ICAP/1.0\r\nEncapsulated: res-hdr=0, res-body=20\r\n\r\nHTTP/1.1 200 OK\r\n\r\n0\r\n\r\n\
              OPTIONS icap://localhost/authstrip ICAP/1.0\r\nEncapsulated: null-body=0\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("ICAP/1.0 405 Method Not Allowed\r\n"));
        assert!(out.contains("Connection: close\r\n"));
        assert_eq!(out.matches("ICAP/1.0").count(), 1);
        assert_eq!(lines, vec!["RESPMOD 405"]);
    }

    #[tokio::test]
    async fn unsupported_method_logs_carried_target() {
        let http = "GET https://example.com/a?sig=1 HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let input = format!(
            "DELETE icap://localhost/authstrip ICAP/1.0\r\nEncapsulated: req-hdr=0, null-body={}\r\n\r\n{http}\
             OPTIONS icap://localhost/authstrip ICAP/1.0\r\n\r\n",
            http.len()
        );
        let (out, lines) = exchange(input.as_bytes()).await;

        assert!(out.starts_with("ICAP/1.0 405 Method Not Allowed\r\n"));
        assert!(!out.contains("Connection: close"));
        assert_eq!(out.matches("ICAP/1.0 200 OK").count(), 1);
        assert_eq!(lines, vec!["DELETE 405 https://example.com/a", "OPTIONS 200"]);
    }
}
