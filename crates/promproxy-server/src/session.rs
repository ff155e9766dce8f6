//! Per-connection session loop.
//!
//! Each connection runs one strictly sequential cycle: decode a value,
//! dispatch it, write the replies, repeat. There is no pipelining - a
//! command finishes before the next one is read - and nothing is shared
//! between connections except the registry handed in.

use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use promproxy_proto::{codec, Value};

use crate::command;
use crate::error::Error;
use crate::registry::MetricRegistry;

const READ_BUFFER_CAPACITY: usize = 4 * 1024;

/// Drive one connection until it closes.
///
/// Returns `Ok` on a clean end - EOF between values, or a terminal command
/// - and `Err` on a protocol or IO failure. Either way the caller just
/// drops the stream; a decode error is fatal and never answered.
pub async fn run<S>(
    stream: &mut S,
    registry: &Arc<MetricRegistry>,
    max_value_size: usize,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_BUFFER_CAPACITY);

    loop {
        match codec::decode_with_limit(&buf, max_value_size)? {
            Some((request, consumed)) => {
                buf.advance(consumed);
                if serve_one(stream, registry, &request).await? {
                    return Ok(());
                }
            }
            None => {
                if buf.len() > max_value_size {
                    return Err(Error::Protocol(promproxy_proto::Error::TooLarge {
                        size: buf.len(),
                        max: max_value_size,
                    }));
                }
                let n = stream.read_buf(&mut buf).await?;
                if n == 0 {
                    if buf.is_empty() {
                        return Ok(());
                    }
                    return Err(Error::Protocol(promproxy_proto::Error::Malformed(
                        "connection closed mid-value".into(),
                    )));
                }
            }
        }
    }
}

/// Dispatch one request and write its replies. Returns whether the session
/// is over.
async fn serve_one<S>(
    stream: &mut S,
    registry: &Arc<MetricRegistry>,
    request: &Value,
) -> Result<bool, Error>
where
    S: AsyncWrite + Unpin,
{
    let dispatch = command::dispatch(registry, request);

    let mut out = Vec::new();
    for reply in &dispatch.replies {
        codec::encode(reply, &mut out);
    }
    stream.write_all(&out).await?;
    stream.flush().await?;

    if let Some(Value::Error(reason)) = dispatch.replies.first() {
        tracing::trace!(%reason, "command failed");
    }

    Ok(dispatch.terminal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promproxy_proto::encode_to_vec;
    use tokio::io::duplex;

    fn frame(parts: Vec<Value>) -> Vec<u8> {
        encode_to_vec(&Value::array(parts))
    }

    fn bulk(s: &str) -> Value {
        Value::bulk(s.as_bytes().to_vec())
    }

    async fn drive(input: Vec<u8>) -> (Result<(), Error>, Vec<u8>) {
        let registry = Arc::new(MetricRegistry::new("ns"));
        drive_with(input, &registry).await
    }

    async fn drive_with(
        input: Vec<u8>,
        registry: &Arc<MetricRegistry>,
    ) -> (Result<(), Error>, Vec<u8>) {
        let (mut server_side, mut client_side) = duplex(64 * 1024);
        let registry = registry.clone();

        let session = tokio::spawn(async move {
            run(&mut server_side, &registry, codec::MAX_VALUE_SIZE).await
        });

        client_side.write_all(&input).await.unwrap();
        client_side.shutdown().await.unwrap();

        let mut output = Vec::new();
        client_side.read_to_end(&mut output).await.unwrap();
        (session.await.unwrap(), output)
    }

    #[tokio::test]
    async fn test_clean_eof_ends_session() {
        let (result, output) = drive(Vec::new()).await;
        assert!(result.is_ok());
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_register_and_record_replies_ok() {
        let mut input = frame(vec![
            bulk("R"),
            bulk("hits"),
            bulk("help"),
            bulk("c"),
            Value::array(vec![]),
        ]);
        input.extend(frame(vec![bulk("C"), bulk("hits"), bulk("3")]));

        let (result, output) = drive(input).await;
        assert!(result.is_ok());
        assert_eq!(output, b"+ok\r\n+ok\r\n");
    }

    #[tokio::test]
    async fn test_error_reply_keeps_session_open() {
        let mut input = frame(vec![bulk("ZZ")]);
        input.extend(frame(vec![bulk("M")]));

        let (result, output) = drive(input).await;
        assert!(result.is_ok());
        // First reply is the error, second is the metrics bulk.
        assert!(output.starts_with(b"-malformed command: ZZ\r\n"));
        assert!(output[b"-malformed command: ZZ\r\n".len()..].starts_with(b"$"));
    }

    #[tokio::test]
    async fn test_close_terminates_before_remaining_input() {
        let mut input = frame(vec![bulk("X")]);
        input.extend(frame(vec![bulk("M")]));

        let (result, output) = drive(input).await;
        assert!(result.is_ok());
        assert_eq!(output, b"+ok\r\n");
    }

    #[tokio::test]
    async fn test_decode_failure_is_fatal() {
        let (result, output) = drive(b"?what\r\n".to_vec()).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_eof_mid_value_is_fatal() {
        let (result, _) = drive(b"*2\r\n+a\r\n".to_vec()).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_value_split_across_reads() {
        let registry = Arc::new(MetricRegistry::new("ns"));
        let (mut server_side, mut client_side) = duplex(64 * 1024);
        let task_registry = registry.clone();
        let session = tokio::spawn(async move {
            run(&mut server_side, &task_registry, codec::MAX_VALUE_SIZE).await
        });

        let input = frame(vec![
            bulk("R"),
            bulk("hits"),
            bulk("help"),
            bulk("c"),
            Value::array(vec![]),
        ]);
        let (head, tail) = input.split_at(7);
        client_side.write_all(head).await.unwrap();
        client_side.flush().await.unwrap();
        tokio::task::yield_now().await;
        client_side.write_all(tail).await.unwrap();
        client_side.shutdown().await.unwrap();

        let mut output = Vec::new();
        client_side.read_to_end(&mut output).await.unwrap();
        assert!(session.await.unwrap().is_ok());
        assert_eq!(output, b"+ok\r\n");
        assert!(registry.contains("hits"));
    }
}
