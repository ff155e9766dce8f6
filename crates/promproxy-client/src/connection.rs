//! Connection management for the promproxy client.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use promproxy_proto::{codec, Value};

use crate::config::ClientConfig;
use crate::error::Error;

/// A connection to a promproxy server.
pub struct Connection {
    stream: TcpStream,
    buf: BytesMut,
    config: ClientConfig,
}

impl Connection {
    /// Establish a new connection to the server.
    pub async fn establish(config: ClientConfig) -> Result<Self, Error> {
        let stream = timeout(config.timeout, TcpStream::connect(&config.address))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| {
                Error::Connection(format!("failed to connect to {}: {}", config.address, e))
            })?;

        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(4 * 1024),
            config,
        })
    }

    /// Send one request and read one reply.
    pub async fn round_trip(&mut self, request: &Value) -> Result<Value, Error> {
        self.send(request).await?;
        self.receive().await
    }

    /// Send one value.
    pub async fn send(&mut self, request: &Value) -> Result<(), Error> {
        let bytes = codec::encode_to_vec(request);
        timeout(self.config.timeout, self.stream.write_all(&bytes))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::Connection(format!("failed to send request: {}", e)))?;
        Ok(())
    }

    /// Read one value, buffering until it is complete.
    pub async fn receive(&mut self) -> Result<Value, Error> {
        loop {
            if let Some((value, consumed)) =
                codec::decode_with_limit(&self.buf, self.config.max_value_size)?
            {
                self.buf.advance(consumed);
                return Ok(value);
            }

            let n = timeout(self.config.timeout, self.stream.read_buf(&mut self.buf))
                .await
                .map_err(|_| Error::Timeout)?
                .map_err(|e| Error::Connection(format!("failed to read reply: {}", e)))?;
            if n == 0 {
                return Err(Error::Connection("connection closed by server".into()));
            }
        }
    }

    /// Read until the server closes the connection. Used after a close
    /// command, whose reply is followed by EOF.
    pub async fn drain(&mut self) -> Result<(), Error> {
        loop {
            self.buf.clear();
            let n = timeout(self.config.timeout, self.stream.read_buf(&mut self.buf))
                .await
                .map_err(|_| Error::Timeout)?
                .map_err(|e| Error::Connection(format!("failed to drain connection: {}", e)))?;
            if n == 0 {
                return Ok(());
            }
        }
    }
}
