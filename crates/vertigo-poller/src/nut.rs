//! Minimal client for the UPS line protocol.
//!
//! Only variable reads are supported. A request is one line,
//! `GET VAR <ups> <variable>`, answered by one line,
//! `VAR <ups> <variable> "<value>"`. Anything else (typically
//! `ERR <reason>`) is a protocol error.
//!
//! Connecting and every request/reply round trip are bounded by the
//! client's timeout; a server that accepts but never answers is reported
//! as [`UpstreamError::Timeout`].

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::UpstreamError;

/// An open connection to a UPS server.
#[derive(Debug)]
pub struct NutClient {
    stream: BufReader<TcpStream>,
    timeout: Duration,
}

async fn bounded<T>(
    limit: Duration,
    work: impl Future<Output = Result<T, UpstreamError>>,
) -> Result<T, UpstreamError> {
    tokio::time::timeout(limit, work)
        .await
        .unwrap_or(Err(UpstreamError::Timeout(limit)))
}

impl NutClient {
    /// Connect to `host:port`, giving up after `timeout`. The same limit
    /// applies to each later request.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Io`] if the connection cannot be opened
    /// and [`UpstreamError::Timeout`] if it does not open in time.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, UpstreamError> {
        let stream = bounded(timeout, async {
            Ok(TcpStream::connect((host, port)).await?)
        })
        .await?;
        debug!(host, port, "Connected to UPS server");
        Ok(Self {
            stream: BufReader::new(stream),
            timeout,
        })
    }

    /// Read `variable` of `ups`.
    ///
    /// # Errors
    ///
    /// [`UpstreamError::Io`] on socket failure, [`UpstreamError::Closed`]
    /// if the server hung up, [`UpstreamError::Timeout`] if it did not
    /// answer in time and [`UpstreamError::Protocol`] if the reply is not
    /// the requested variable.
    pub async fn get_var(&mut self, ups: &str, variable: &str) -> Result<String, UpstreamError> {
        let prefix = format!("VAR {} {}", ups.trim(), variable.trim());
        let request = format!("GET {prefix}\n");
        let stream = &mut self.stream;
        let line = bounded(self.timeout, async move {
            stream.get_mut().write_all(request.as_bytes()).await?;
            let mut line = String::new();
            if stream.read_line(&mut line).await? == 0 {
                return Err(UpstreamError::Closed);
            }
            Ok(line)
        })
        .await?;
        parse_var_reply(&prefix, line.trim())
    }
}

fn parse_var_reply(prefix: &str, reply: &str) -> Result<String, UpstreamError> {
    reply
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(" \""))
        .and_then(|rest| rest.strip_suffix('"'))
        .map(ToOwned::to_owned)
        .ok_or_else(|| UpstreamError::Protocol(format!("could not {prefix}: {reply}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;

    const LIMIT: Duration = Duration::from_secs(5);

    #[test]
    fn reply_parsing() {
        assert_eq!(
            parse_var_reply("VAR ups battery.charge", "VAR ups battery.charge \"87\"").unwrap(),
            "87"
        );
        assert_eq!(
            parse_var_reply("VAR ups ups.status", "VAR ups ups.status \"OL CHRG\"").unwrap(),
            "OL CHRG"
        );
        assert!(matches!(
            parse_var_reply("VAR ups ups.status", "ERR VAR-NOT-SUPPORTED"),
            Err(UpstreamError::Protocol(_))
        ));
        assert!(parse_var_reply("VAR ups ups.status", "VAR ups ups.status OL").is_err());
    }

    #[tokio::test]
    async fn reads_variables_over_one_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut socket = BufReader::new(socket);
            let mut line = String::new();
            while socket.read_line(&mut line).await.unwrap() > 0 {
                let reply = match line.trim() {
                    "GET VAR openups battery.charge" => "VAR openups battery.charge \"64\"\n",
                    _ => "ERR VAR-NOT-SUPPORTED\n",
                };
                socket.get_mut().write_all(reply.as_bytes()).await.unwrap();
                line.clear();
            }
        });

        let mut client = NutClient::connect("127.0.0.1", port, LIMIT).await.unwrap();
        assert_eq!(client.get_var("openups", "battery.charge").await.unwrap(), "64");
        assert!(matches!(
            client.get_var("openups", "ups.load").await,
            Err(UpstreamError::Protocol(_))
        ));
        assert_eq!(client.get_var("openups", "battery.charge").await.unwrap(), "64");
    }

    #[tokio::test]
    async fn hang_up_is_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut client = NutClient::connect("127.0.0.1", port, LIMIT).await.unwrap();
        let result = client.get_var("openups", "battery.charge").await;
        assert!(matches!(
            result,
            Err(UpstreamError::Closed | UpstreamError::Io(_))
        ));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
            drop(socket);
        });

        let limit = Duration::from_millis(100);
        let mut client = NutClient::connect("127.0.0.1", port, limit).await.unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.get_var("openups", "battery.charge"),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(UpstreamError::Timeout(d)) if d == limit));
    }
}
