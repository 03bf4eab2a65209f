use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::select;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::connection::HttpConnection;
use crate::handler::Handler;
use crate::protocol::ServerError;
use crate::server::{ServerBuilder, ServerConfig};

/// Handle to a running server.
///
/// The accept loop runs on its own task and spawns one task per accepted
/// connection. [`Server::close`] (or dropping the handle) stops accepting;
/// connections already being handled run to completion on their own.
#[derive(Debug)]
pub struct Server {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    accept_task: Option<JoinHandle<()>>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds `port` on all interfaces and starts serving with `handler`.
    pub async fn serve<H>(port: u16, handler: H) -> Result<Self, ServerError>
    where
        H: Handler<OwnedWriteHalf> + 'static,
    {
        let config = ServerBuilder::new().port(port).build()?;
        Self::start(config, handler).await
    }

    /// Binds the configured address and starts the accept loop, returning once the listener is ready.
    pub async fn start<H>(config: ServerConfig, handler: H) -> Result<Self, ServerError>
    where
        H: Handler<OwnedWriteHalf> + 'static,
    {
        let tcp_listener = match TcpListener::bind((config.host(), config.port())).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, host = config.host(), port = config.port(), "bind server error");
                return Err(e.into());
            }
        };
        let local_addr = tcp_listener.local_addr()?;
        info!(%local_addr, max_connections = ?config.max_connections(), "start listening");

        let shutdown = CancellationToken::new();
        let acceptor = Acceptor {
            listener: tcp_listener,
            handler: Arc::new(handler),
            shutdown: shutdown.clone(),
            limiter: config.max_connections().map(|permits| Arc::new(Semaphore::new(permits))),
            read_buffer_capacity: config.read_buffer_capacity(),
        };
        let accept_task = tokio::spawn(acceptor.run());

        Ok(Self { local_addr, shutdown, accept_task: Some(accept_task) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops accepting connections and releases the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyClosed`] if the server was closed before.
    pub async fn close(&mut self) -> Result<(), ServerError> {
        if self.shutdown.is_cancelled() {
            return Err(ServerError::AlreadyClosed);
        }

        self.shutdown.cancel();
        if let Some(accept_task) = self.accept_task.take() {
            if let Err(e) = accept_task.await {
                warn!(cause = %e, "accept loop ended abnormally");
            }
        }

        info!(local_addr = %self.local_addr, "server closed");
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Acceptor<H> {
    listener: TcpListener,
    handler: Arc<H>,
    shutdown: CancellationToken,
    limiter: Option<Arc<Semaphore>>,
    read_buffer_capacity: usize,
}

impl<H> Acceptor<H>
where
    H: Handler<OwnedWriteHalf> + 'static,
{
    async fn run(self) {
        loop {
            let permit = match &self.limiter {
                Some(limiter) => select! {
                    biased;
                    () = self.shutdown.cancelled() => break,
                    permit = Arc::clone(limiter).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_closed) => break,
                    },
                },
                None => None,
            };

            let (tcp_stream, remote_addr) = select! {
                biased;
                () = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            let handler = Arc::clone(&self.handler);
            let read_buffer_capacity = self.read_buffer_capacity;

            tokio::spawn(async move {
                let _permit = permit;
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::with_capacity(reader, writer, read_buffer_capacity);
                match connection.process(handler).await {
                    Ok(()) => {
                        info!(%remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!(%remote_addr, cause = %e, "connection has error, connection shutdown");
                    }
                }
            });
        }

        info!("accept loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ResponseWriter, default_headers};
    use crate::handler::make_handler;
    use crate::protocol::{Request, SendError};
    use http::StatusCode;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn problem_handler(request: Request, mut writer: ResponseWriter<OwnedWriteHalf>) -> Result<(), SendError> {
        let (status, body) = match request.target() {
            "/yourproblem" => (StatusCode::BAD_REQUEST, "Your request honestly kinda sucked.".to_owned()),
            "/myproblem" => (StatusCode::INTERNAL_SERVER_ERROR, "Okay, you know what? This one is on me.".to_owned()),
            _ => (StatusCode::OK, String::from_utf8_lossy(request.body()).into_owned()),
        };
        writer.write_status_line(status).await?;
        writer.write_headers(&default_headers(body.len())).await?;
        writer.write_body(body.as_bytes()).await?;
        Ok(())
    }

    async fn start_local() -> Server {
        let config = Server::builder().host("127.0.0.1").port(0).build().unwrap();
        Server::start(config, make_handler(problem_handler)).await.unwrap()
    }

    async fn exchange(addr: SocketAddr, pieces: &[&[u8]]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        for piece in pieces {
            stream.write_all(piece).await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn bad_request_route() {
        let mut server = start_local().await;

        let response = exchange(server.local_addr(), &[b"GET /yourproblem HTTP/1.1\r\nHost: x\r\n\r\n"]).await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
        assert!(response.ends_with("Your request honestly kinda sucked."));
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn internal_error_route() {
        let mut server = start_local().await;

        let response = exchange(server.local_addr(), &[b"GET /myproblem HTTP/1.1\r\nHost: x\r\n\r\n"]).await;

        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{response}");
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn body_sent_in_two_writes() {
        let mut server = start_local().await;

        let response = exchange(
            server.local_addr(),
            &[b"POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\n", b"hel", b"lo"],
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
        assert!(response.contains("content-length: 5\r\n"));
        assert!(response.ends_with("\r\n\r\nhello"));
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_request_gets_no_response() {
        let mut server = start_local().await;

        let response = exchange(server.local_addr(), &[b"GET /yourproblem HTTP/1.1\r\nBad Header : x\r\n\r\n"]).await;

        assert!(response.is_empty());
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_connections_are_independent() {
        let mut server = start_local().await;
        let addr = server.local_addr();

        // a silent peer must not hold up the others
        let _idle = TcpStream::connect(addr).await.unwrap();

        let requests = (0..8).map(|i| {
            tokio::spawn(async move {
                let request = format!("POST /echo HTTP/1.1\r\nContent-Length: 7\r\n\r\nbody-{i:02}");
                exchange(addr, &[request.as_bytes()]).await
            })
        });
        for (i, request) in requests.collect::<Vec<_>>().into_iter().enumerate() {
            let response = request.await.unwrap();
            assert!(response.ends_with(&format!("body-{i:02}")), "{response}");
        }

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn bounded_server_still_serves() {
        let config = Server::builder().host("127.0.0.1").port(0).max_connections(1).build().unwrap();
        let mut server = Server::start(config, make_handler(problem_handler)).await.unwrap();

        for _ in 0..3 {
            let response = exchange(server.local_addr(), &[b"GET /yourproblem HTTP/1.1\r\n\r\n"]).await;
            assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
        }

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_twice_fails_and_stops_accepting() {
        let mut server = start_local().await;
        let addr = server.local_addr();

        server.close().await.unwrap();

        assert!(server.is_closed());
        assert!(matches!(server.close().await, Err(ServerError::AlreadyClosed)));
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
