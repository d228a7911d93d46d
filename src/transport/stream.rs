//! Stream transport over an async reader/writer pair.

use async_trait::async_trait;
use std::future::Future;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf, Stdout};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{decode_request, Transport};
use crate::domain::{CredentialProviderRequest, CredentialProviderResponse};
use crate::errors::{Error, Result};

pub struct StreamTransport<R, W> {
    reader: R,
    writer: W,
}

impl StreamTransport<DetachedReader, Stdout> {
    /// Transport over the process's stdin and stdout.
    pub fn stdio() -> Result<Self> {
        let stdin = DetachedReader::spawn(io::stdin()).map_err(|e| {
            Error::io_with_source(format!("failed to start stdin reader: {}", e), e)
        })?;
        Ok(Self::new(stdin, tokio::io::stdout()))
    }
}

impl<R, W> StreamTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl<R, W> Transport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_request(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<CredentialProviderRequest> {
        let mut payload = Vec::new();

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::io("request read cancelled"));
            }
            read = self.reader.read_to_end(&mut payload) => {
                read.map_err(|e| {
                    Error::io_with_source(format!("failed to read from stdin: {}", e), e)
                })?;
            }
        }

        debug!(bytes = payload.len(), "Read credential provider request");
        decode_request(&payload)
    }

    async fn write_response(
        &mut self,
        cancel: &CancellationToken,
        response: &CredentialProviderResponse,
    ) -> Result<()> {
        let mut body = serde_json::to_vec(response)
            .map_err(|e| Error::io(format!("failed to marshal response: {}", e)))?;
        body.push(b'\n');

        let write = async {
            self.writer.write_all(&body).await?;
            self.writer.flush().await
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::io("response write cancelled")),
            written = write => {
                written.map_err(|e| {
                    Error::io_with_source(format!("failed to write to stdout: {}", e), e)
                })?;
                debug!(bytes = body.len(), "Wrote credential provider response");
                Ok(())
            }
        }
    }
}

/// Blocking reader drained on a thread of its own.
///
/// `tokio::io::stdin` reads on the runtime's blocking pool, and the runtime
/// joins that pool when it shuts down. An input that never reaches
/// end-of-input would keep the process alive after the read was cancelled.
/// This thread is never joined, so exiting does not wait for it.
pub struct DetachedReader {
    state: ReaderState,
}

enum ReaderState {
    Pending(oneshot::Receiver<io::Result<Vec<u8>>>),
    Ready { payload: Vec<u8>, position: usize },
    Finished,
}

impl DetachedReader {
    /// Start reading `reader` to its end in the background.
    pub fn spawn<R>(mut reader: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("detached-reader".to_string())
            .spawn(move || {
                let mut payload = Vec::new();
                let result = reader.read_to_end(&mut payload).map(|_| payload);
                // Nobody is waiting once the read was cancelled
                let _ = tx.send(result);
            })?;

        Ok(Self {
            state: ReaderState::Pending(rx),
        })
    }
}

impl AsyncRead for DetachedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                ReaderState::Pending(rx) => match ready!(Pin::new(rx).poll(cx)) {
                    Ok(Ok(payload)) => {
                        this.state = ReaderState::Ready {
                            payload,
                            position: 0,
                        };
                    }
                    Ok(Err(e)) => {
                        this.state = ReaderState::Finished;
                        return Poll::Ready(Err(e));
                    }
                    Err(_) => {
                        this.state = ReaderState::Finished;
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::BrokenPipe,
                            "reader thread exited without a result",
                        )));
                    }
                },
                ReaderState::Ready { payload, position } => {
                    let remaining = &payload[*position..];
                    let n = remaining.len().min(buf.remaining());
                    buf.put_slice(&remaining[..n]);
                    *position += n;
                    return Poll::Ready(Ok(()));
                }
                ReaderState::Finished => return Poll::Ready(Ok(())),
            }
        }
    }
}
