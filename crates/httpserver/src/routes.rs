//! The demo routes.
//!
//! - `/yourproblem` answers 400 and `/myproblem` answers 500, both with an HTML page
//! - `/httpbin/<path>` streams `<upstream>/<path>` back as a chunked body with
//!   integrity trailers
//! - anything else answers 200

use std::io;

use async_trait::async_trait;
use futures::TryStreamExt;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use httpfromtcp::connection::{ResponseWriter, default_headers};
use httpfromtcp::handler::Handler;
use httpfromtcp::protocol::Request;
use httpfromtcp::proxy::{ChunkedProxy, Upstream};
use indoc::indoc;
use tokio::io::AsyncWrite;
use tokio_util::io::StreamReader;
use tracing::{error, info, warn};

pub const DEFAULT_UPSTREAM: &str = "https://httpbin.org";

const PROXY_PREFIX: &str = "/httpbin/";

const BAD_REQUEST_PAGE: &str = indoc! {"
    <html>
      <head>
        <title>400 Bad Request</title>
      </head>
      <body>
        <h1>Bad Request</h1>
        <p>Your request honestly kinda sucked.</p>
      </body>
    </html>
"};

const INTERNAL_ERROR_PAGE: &str = indoc! {"
    <html>
      <head>
        <title>500 Internal Server Error</title>
      </head>
      <body>
        <h1>Internal Server Error</h1>
        <p>Okay, you know what? This one is on me.</p>
      </body>
    </html>
"};

const SUCCESS_PAGE: &str = indoc! {"
    <html>
      <head>
        <title>200 OK</title>
      </head>
      <body>
        <h1>Success!</h1>
        <p>Your request was an absolute banger.</p>
      </body>
    </html>
"};

#[derive(Debug, Clone)]
pub struct Routes {
    client: reqwest::Client,
    upstream: String,
    proxy: ChunkedProxy,
}

impl Routes {
    /// Routes forwarding `/httpbin/` requests to `upstream`.
    pub fn new(upstream: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().user_agent(concat!("httpserver/", env!("CARGO_PKG_VERSION"))).build()?;
        let upstream = upstream.into().trim_end_matches('/').to_owned();
        Ok(Self { client, upstream, proxy: ChunkedProxy::new() })
    }

    async fn respond<W>(&self, request: &Request, writer: &mut ResponseWriter<W>) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if let Some(path) = request.target().strip_prefix(PROXY_PREFIX) {
            return self.forward(path, writer).await;
        }

        let (status, page) = match request.target() {
            "/yourproblem" => (StatusCode::BAD_REQUEST, BAD_REQUEST_PAGE),
            "/myproblem" => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_PAGE),
            _ => (StatusCode::OK, SUCCESS_PAGE),
        };

        let mut headers = default_headers(page.len());
        headers.insert(CONTENT_TYPE, mime::TEXT_HTML.essence_str());

        writer.write_status_line(status).await?;
        writer.write_headers(&headers).await?;
        writer.write_body(page.as_bytes()).await?;
        Ok(())
    }

    async fn forward<W>(&self, path: &str, writer: &mut ResponseWriter<W>) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let url = format!("{}/{path}", self.upstream);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(%url, cause = %e, "upstream request failed, nothing written");
                return Err(e.into());
            }
        };

        if !response.status().is_success() {
            warn!(%url, status = %response.status(), "upstream answered with a non-success status");
        }

        let content_type = response.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).map(str::to_owned);
        let body = StreamReader::new(Box::pin(response.bytes_stream().map_err(io::Error::other)));

        let mut upstream = Upstream::new(body);
        if let Some(content_type) = content_type {
            upstream = upstream.with_content_type(content_type);
        }

        let mut headers = default_headers(0);
        let outcome = self.proxy.stream(writer, &mut headers, upstream).await?;
        info!(%url, length = outcome.length, "proxied upstream body");
        Ok(())
    }
}

#[async_trait]
impl<W> Handler<W> for Routes
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Error = anyhow::Error;

    async fn call(&self, request: Request, mut writer: ResponseWriter<W>) -> Result<(), Self::Error> {
        self.respond(&request, &mut writer).await
    }
}
