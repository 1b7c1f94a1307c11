//! Browser viewer
//!
//! A plain `GET` on the stream port (no WebSocket upgrade) gets a small HTML
//! page that opens a WebSocket back to the same host and swaps each binary
//! message into an `<img>` as a JPEG blob.
//!
//! The request head is peeked, not read, so upgrade requests reach the
//! WebSocket handshake untouched.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, Result};

/// Largest request head accepted before the connection is dropped
pub const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Pause between peeks while a request head is still arriving
const PEEK_RETRY: Duration = Duration::from_millis(5);

/// Viewer page
pub const VIEWER_HTML: &str = concat!(
    "<!DOCTYPE html>\n",
    "<html>\n",
    "<head><meta charset=\"utf-8\"><title>Camera</title></head>\n",
    "<body style=\"margin:0;background:#000\">\n",
    "<img id=\"stream\" style=\"display:block;max-width:100%;margin:auto\" />\n",
    "<script>\n",
    "const scheme = window.location.protocol === 'https:' ? 'wss:' : 'ws:';\n",
    "const ws = new WebSocket(scheme + '//' + window.location.host + '/');\n",
    "const img = document.getElementById('stream');\n",
    "ws.binaryType = 'arraybuffer';\n",
    "ws.onmessage = (e) => {\n",
    "  const previous = img.src;\n",
    "  img.src = URL.createObjectURL(new Blob([e.data], { type: 'image/jpeg' }));\n",
    "  if (previous) URL.revokeObjectURL(previous);\n",
    "};\n",
    "</script>\n",
    "</body>\n",
    "</html>\n",
);

/// Peek at the request head, up to and including the blank line
pub async fn peek_request_head(socket: &TcpStream) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; MAX_REQUEST_HEAD];

    loop {
        let n = socket.peek(&mut buf).await?;
        if n == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before request",
            )));
        }

        if let Some(end) = head_end(&buf[..n]) {
            buf.truncate(end);
            return Ok(buf);
        }

        if n == buf.len() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "request head too large",
            )));
        }

        tokio::time::sleep(PEEK_RETRY).await;
    }
}

/// Whether a request head asks for a WebSocket upgrade
pub fn is_websocket_upgrade(head: &[u8]) -> bool {
    String::from_utf8_lossy(head).lines().skip(1).any(|line| {
        match line.split_once(':') {
            Some((name, value)) => {
                name.trim().eq_ignore_ascii_case("upgrade")
                    && value.to_ascii_lowercase().contains("websocket")
            }
            None => false,
        }
    })
}

/// Consume the peeked request and answer with the viewer page
pub async fn serve(mut socket: TcpStream, head_len: usize, write_timeout: Duration) -> Result<()> {
    let respond = async {
        let mut head = vec![0u8; head_len];
        socket.read_exact(&mut head).await?;

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n{}",
            VIEWER_HTML.len(),
            VIEWER_HTML
        );
        socket.write_all(response.as_bytes()).await?;
        socket.shutdown().await
    };

    tokio::time::timeout(write_timeout, respond)
        .await
        .map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "viewer response timed out",
            ))
        })??;
    Ok(())
}

fn head_end(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}
