// transport.rs
//! JSON-lines stand-in for the message bus: one `{"topic", "payload"}`
//! envelope per line in, one per line out.

use async_stream::stream;
use futures::{Stream, StreamExt, pin_mut};
use log::{debug, error};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::G2pError,
    guesser::G2pTool,
    handler::{Envelope, RequestHandler},
};

/// Reads envelopes until EOF. Blank lines are skipped; a line that is not
/// UTF-8 or not an envelope is yielded as an error and reading continues.
/// Only a failing reader ends the stream early.
pub fn read_envelopes<R>(mut reader: R) -> impl Stream<Item = Result<Envelope, G2pError>>
where
    R: AsyncBufRead + Unpin,
{
    stream! {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let line = match std::str::from_utf8(&buf) {
                        Ok(line) => line.trim(),
                        Err(e) => {
                            yield Err(G2pError::Common(format!("invalid UTF-8 on input: {}", e)));
                            continue;
                        }
                    };
                    if line.is_empty() {
                        continue;
                    }
                    debug!("Received {} byte(s)", n);
                    yield serde_json::from_str::<Envelope>(line).map_err(G2pError::from);
                }
                Err(e) => {
                    yield Err(G2pError::from(e));
                    break;
                }
            }
        }
    }
}

pub async fn write_envelope<W>(writer: &mut W, envelope: &Envelope) -> Result<(), G2pError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(envelope)?;
    debug!("Publishing {} char(s) to {}", line.len(), envelope.topic);
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Handles envelopes one at a time until the stream ends. Per-message
/// failures are logged; only a failing writer stops the loop.
pub async fn serve<T, S, W>(
    handler: &RequestHandler<T>,
    envelopes: S,
    mut writer: W,
) -> Result<(), G2pError>
where
    T: G2pTool,
    S: Stream<Item = Result<Envelope, G2pError>>,
    W: AsyncWrite + Unpin,
{
    for topic in handler.topics() {
        debug!("Subscribed to {}", topic);
    }

    pin_mut!(envelopes);
    while let Some(envelope) = envelopes.next().await {
        let envelope = match envelope {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("on_message: {}", e);
                continue;
            }
        };
        match handler.on_message(envelope).await {
            Ok(Some(reply)) => write_envelope(&mut writer, &reply).await?,
            Ok(None) => {}
            Err(e) => error!("on_message: {}", e),
        }
    }
    Ok(())
}
