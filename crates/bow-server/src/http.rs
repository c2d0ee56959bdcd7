use crate::ServerError;
use bow_http::{Handler, Request, Response};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Time open connections get to finish after a shutdown signal
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// HTTP/1 server running one task per connection.
pub struct HttpServer {
	handler: Arc<dyn Handler>,
}

impl HttpServer {
	/// Create a new server with the given handler
	///
	/// # Examples
	///
	/// ```
	/// use std::sync::Arc;
	/// use bow_http::{Response, handler_fn};
	/// use bow_server::HttpServer;
	///
	/// let handler = Arc::new(handler_fn(|_req| async { Ok(Response::ok().with_body("Hello")) }));
	/// let server = HttpServer::new(handler);
	/// ```
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self { handler }
	}

	/// Listen on `addr` until the process ends.
	pub async fn listen(self, addr: SocketAddr) -> Result<(), ServerError> {
		self.listen_with_shutdown(addr, std::future::pending(), DEFAULT_GRACE_PERIOD)
			.await
	}

	/// Listen on `addr` until `signal` completes, then drain connections.
	///
	/// # Examples
	///
	/// ```no_run
	/// use std::sync::Arc;
	/// use bow_http::{Response, handler_fn};
	/// use bow_server::{DEFAULT_GRACE_PERIOD, HttpServer, shutdown_signal};
	///
	/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
	/// let handler = Arc::new(handler_fn(|_req| async { Ok(Response::ok()) }));
	/// HttpServer::new(handler)
	///     .listen_with_shutdown("127.0.0.1:8080".parse()?, shutdown_signal(), DEFAULT_GRACE_PERIOD)
	///     .await?;
	/// # Ok(())
	/// # }
	/// ```
	pub async fn listen_with_shutdown<F>(
		self,
		addr: SocketAddr,
		signal: F,
		grace: Duration,
	) -> Result<(), ServerError>
	where
		F: Future<Output = ()>,
	{
		let listener = TcpListener::bind(addr)
			.await
			.map_err(|source| ServerError::Bind { addr, source })?;
		self.serve(listener, signal, grace).await
	}

	/// Accept connections from `listener` until `signal` completes.
	///
	/// After the signal the listener is closed, every open connection is
	/// asked to finish its in-flight request, and the call returns once they
	/// are done or `grace` has elapsed.
	pub async fn serve<F>(
		self,
		listener: TcpListener,
		signal: F,
		grace: Duration,
	) -> Result<(), ServerError>
	where
		F: Future<Output = ()>,
	{
		if let Ok(addr) = listener.local_addr() {
			tracing::info!(%addr, "server listening");
		}

		let graceful = GracefulShutdown::new();
		tokio::pin!(signal);

		loop {
			tokio::select! {
				result = listener.accept() => {
					let (stream, remote_addr) = result.map_err(ServerError::Accept)?;
					let service = RequestService {
						handler: self.handler.clone(),
						remote_addr,
					};
					let connection = http1::Builder::new()
						.serve_connection(TokioIo::new(stream), service);
					let connection = graceful.watch(connection);

					tokio::task::spawn(async move {
						if let Err(err) = connection.await {
							tracing::debug!(%remote_addr, error = %err, "connection error");
						}
					});
				}
				_ = &mut signal => {
					tracing::info!("shutdown signal received, stopping server");
					break;
				}
			}
		}

		drop(listener);

		tokio::select! {
			_ = graceful.shutdown() => {
				tracing::info!("all connections closed");
			}
			_ = tokio::time::sleep(grace) => {
				tracing::warn!(grace_secs = grace.as_secs(), "grace period elapsed with open connections");
			}
		}

		Ok(())
	}
}

/// Completes on Ctrl-C.
pub async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "cannot listen for shutdown signal");
		std::future::pending::<()>().await;
	}
}

/// Service implementation for hyper
struct RequestService {
	handler: Arc<dyn Handler>,
	remote_addr: SocketAddr,
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = Box<dyn std::error::Error + Send + Sync>;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let handler = self.handler.clone();
		let remote_addr = self.remote_addr;

		Box::pin(async move {
			let (parts, body) = req.into_parts();
			let body = body.collect().await?.to_bytes();

			let request = Request::builder()
				.method(parts.method)
				.uri(parts.uri.to_string())
				.version(parts.version)
				.headers(parts.headers)
				.body(body)
				.remote_addr(remote_addr)
				.build()?;

			let response = handler
				.handle(request)
				.await
				.unwrap_or_else(Response::from);

			let mut hyper_response = hyper::Response::builder().status(response.status);
			for (key, value) in response.headers.iter() {
				hyper_response = hyper_response.header(key, value);
			}

			Ok(hyper_response.body(Full::new(response.body))?)
		})
	}
}
