//! WebSocket transport for the live feed.

use futures::future::{self, BoxFuture};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

use crate::feed::{Connector, FeedChannel, FeedError, Frame};

/// Connector opening a WebSocket per connect attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<FeedChannel, FeedError>> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws, response) = connect_async(url.as_str())
                .await
                .map_err(|e| FeedError::Connect(e.to_string()))?;
            debug!(url = %url, status = %response.status(), "WebSocket handshake complete");

            let (write, read) = ws.split();
            let sink = write
                .sink_map_err(|e| FeedError::Send(e.to_string()))
                .with(|text: String| future::ready(Ok::<_, FeedError>(Message::Text(text))));
            let stream = read.map(frame_from_message);

            Ok(FeedChannel::new(Box::pin(sink), stream.boxed()))
        })
    }
}

fn frame_from_message(message: Result<Message, tungstenite::Error>) -> Result<Frame, FeedError> {
    match message {
        Ok(Message::Text(text)) => Ok(Frame::Text(text)),
        Ok(Message::Binary(bytes)) => Ok(Frame::Binary(bytes)),
        Ok(Message::Close(frame)) => Ok(Frame::Close(frame.map(|f| f.reason.into_owned()))),
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => Ok(Frame::Control),
        Err(e) => Err(FeedError::Transport(e.to_string())),
    }
}

/// Builds the push-channel URL from an HTTP(S) server base and a path.
///
/// `http` maps to `ws` and `https` to `wss`; a path prefix on the base is
/// kept, e.g. `https://host/panel` + `/api/clients` gives
/// `wss://host/panel/api/clients`.
pub fn feed_url(base: &str, path: &str) -> Result<String, FeedError> {
    let mut url =
        Url::parse(base).map_err(|e| FeedError::InvalidUrl(format!("{}: {}", base, e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(FeedError::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                other, base
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| FeedError::InvalidUrl(format!("cannot use scheme {} for {}", scheme, base)))?;

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}
