use std::net::SocketAddr;

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("cannot listen on {addr}: {source}")]
	Bind {
		addr: SocketAddr,
		#[source]
		source: std::io::Error,
	},

	#[error("cannot accept connection: {0}")]
	Accept(#[source] std::io::Error),
}
