//! HTTP server that hosts a [`Dispatcher`].
//!
//! The server owns the connection-level concerns the dispatcher knows
//! nothing about: accepting sockets, TLS, HTTP/1 framing (hyper), collecting
//! request bodies and recording the peer address. Each accepted connection
//! is served on its own tokio task.
//!
//! # Example
//!
//! ```no_run
//! use cosine::{Config, Dispatcher, Logger, Router, Server, handler_fn, RequestContext};
//!
//! fn hello(ctx: &mut RequestContext) {
//!     ctx.envelope_mut().set_data("hello world");
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("cosine.toml")?;
//!     let router = Router::builder().get("/", handler_fn(hello)).build()?;
//!     let dispatcher = Dispatcher::builder()
//!         .router(router)
//!         .logger(Logger::from_config(&config.log)?)
//!         .build()?;
//!
//!     Server::builder().config(config.server).dispatcher(dispatcher).build()?.start().await?;
//!     Ok(())
//! }
//! ```

mod tls;

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::Value;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::{Protocol, ServerConfig};
use crate::dispatcher::{Dispatcher, render};
use crate::logger::LogLevel;
use crate::{Envelope, RemoteAddr};

pub struct ServerBuilder {
    config: ServerConfig,
    dispatcher: Option<Dispatcher>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: ServerConfig::default(), dispatcher: None }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Validates the setup and, for `https`, loads the certificate and key.
    pub fn build(self) -> Result<Server, ServerError> {
        let dispatcher = self.dispatcher.ok_or(ServerError::MissingDispatcher)?;

        let tls = match self.config.protocol {
            Protocol::Http => None,
            Protocol::Https => {
                let (Some(cert), Some(key)) = (&self.config.cert, &self.config.key) else {
                    return Err(ServerError::MissingTlsFiles);
                };
                Some(tls::acceptor(cert, key)?)
            }
        };

        Ok(Server { config: self.config, dispatcher: Arc::new(dispatcher), tls })
    }
}

pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    tls: Option<TlsAcceptor>,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("dispatcher must be set")]
    MissingDispatcher,

    #[error("https requires both a certificate and a private key")]
    MissingTlsFiles,

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read tls file '{}': {source}", path.display())]
    Certificate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no private key found in '{}'", path.display())]
    NoPrivateKey { path: PathBuf },

    #[error("invalid tls setup: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serves until ctrl-c is received.
    pub async fn start(self) -> Result<(), ServerError> {
        self.start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(cause = %e, "failed to listen for ctrl-c, serving until the process is killed");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Binds the configured address and serves until `signal` completes.
    pub async fn start_with_shutdown<S>(self, signal: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        init_tracing(self.dispatcher.logger().level());

        let address = self.config.address();
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| ServerError::Bind { address, source })?;

        self.serve(listener, signal).await
    }

    /// Serves connections accepted on `listener` until `signal` completes.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve<S>(self, listener: TcpListener, signal: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        let logger = self.dispatcher.logger().clone();
        let scheme = match self.config.protocol {
            Protocol::Http => "http",
            Protocol::Https => "https",
        };
        logger.emit(LogLevel::Info, &[&"start listening", &"-", &scheme, &"-", &local_addr]);
        logger.start_rotation();

        tokio::pin!(signal);
        loop {
            tokio::select! {
                () = &mut signal => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => self.spawn_connection(stream, remote_addr),
                    Err(e) => warn!(cause = %e, "failed to accept"),
                },
            }
        }

        logger.info("shutting down");
        logger.stop_rotation();
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, remote_addr: SocketAddr) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let tls = self.tls.clone();
        let max_body_size = self.config.max_body_size;

        tokio::spawn(async move {
            let service = service_fn(move |request: Request<Incoming>| {
                handle(Arc::clone(&dispatcher), remote_addr, max_body_size, request)
            });

            let result = match tls {
                Some(acceptor) => match acceptor.accept(stream).await {
                    Ok(stream) => http1::Builder::new().serve_connection(TokioIo::new(stream), service).await,
                    Err(e) => {
                        warn!(cause = %e, %remote_addr, "tls handshake failed");
                        return;
                    }
                },
                None => http1::Builder::new().serve_connection(TokioIo::new(stream), service).await,
            };

            match result {
                Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                Err(e) => debug!(cause = %e, %remote_addr, "connection closed with error"),
            }
        });
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("config", &self.config).field("dispatcher", &self.dispatcher).finish()
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

async fn handle<B>(
    dispatcher: Arc<Dispatcher>,
    remote_addr: SocketAddr,
    max_body_size: usize,
    request: Request<B>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (mut parts, body) = request.into_parts();
    parts.extensions.insert(RemoteAddr(remote_addr));

    let body = if reads_body(&parts.method) {
        match Limited::new(body, max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => {
                warn!(%remote_addr, limit = max_body_size, "request body too large");
                let envelope = Envelope::new(StatusCode::PAYLOAD_TOO_LARGE.as_u16(), "request body too large", Value::Null);
                return Ok(render(&envelope));
            }
            Err(e) => {
                warn!(cause = %e, %remote_addr, "failed to read request body");
                Bytes::new()
            }
        }
    } else {
        Bytes::new()
    };

    Ok(dispatcher.serve(Request::from_parts(parts, body)))
}

fn reads_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::DELETE)
}

fn init_tracing(level: LogLevel) {
    let subscriber = FmtSubscriber::builder().with_max_level(level.as_tracing_filter()).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        debug!(cause = %e, "global tracing subscriber already set");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RequestContext, Router, handler_fn};

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder().router(Router::builder().build().unwrap()).build().unwrap()
    }

    #[test]
    fn test_build_requires_dispatcher() {
        assert!(matches!(Server::builder().build(), Err(ServerError::MissingDispatcher)));
    }

    #[test]
    fn test_https_requires_tls_files() {
        let config = ServerConfig { protocol: Protocol::Https, ..ServerConfig::default() };
        let result = Server::builder().config(config).dispatcher(dispatcher()).build();
        assert!(matches!(result, Err(ServerError::MissingTlsFiles)));
    }

    #[test]
    fn test_https_reports_unreadable_certificate() {
        let config = ServerConfig {
            protocol: Protocol::Https,
            cert: Some("/nonexistent/cert.pem".into()),
            key: Some("/nonexistent/key.pem".into()),
            ..ServerConfig::default()
        };
        let result = Server::builder().config(config).dispatcher(dispatcher()).build();
        assert!(matches!(result, Err(ServerError::Certificate { .. })));
    }

    fn echo(ctx: &mut RequestContext, body: Bytes) {
        ctx.envelope_mut().set_data(String::from_utf8_lossy(&body));
    }

    async fn post(max_body_size: usize, body: &'static str) -> (StatusCode, serde_json::Value) {
        let router = Router::builder().post("/echo", handler_fn(echo)).build().unwrap();
        let dispatcher = Arc::new(Dispatcher::builder().router(router).build().unwrap());
        let request = Request::post("/echo").body(Full::new(Bytes::from_static(body.as_bytes()))).unwrap();
        let remote_addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        let response = handle(dispatcher, remote_addr, max_body_size, request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_body_within_limit() {
        let (status, body) = post(16, "hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "hello");
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let (status, body) = post(4, "hello").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["code"], 413);
        assert_eq!(body["message"], "request body too large");
    }

    #[test]
    fn test_reads_body() {
        assert!(!reads_body(&Method::GET));
        assert!(!reads_body(&Method::HEAD));
        assert!(!reads_body(&Method::DELETE));
        assert!(reads_body(&Method::POST));
        assert!(reads_body(&Method::PUT));
        assert!(reads_body(&Method::PATCH));
        assert!(reads_body(&Method::OPTIONS));
    }
}
