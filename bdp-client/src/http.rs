use crate::{Endpoint, Transport, TransportError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, trace};

/// Transport speaking plain HTTP to the player's control CGI
///
/// Clones share one connection pool, so a single instance can serve any
/// number of players.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// User agent the players' own remote app sends; some firmware checks it
    pub const USER_AGENT: &'static str = "MEI-LAN-REMOTE-CALL";

    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .build()
            .map_err(|e| TransportError::Protocol(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client (its own user agent is kept)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        request: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        trace!(%endpoint, request, "POST {}", Endpoint::CONTROL_PATH);

        let response = self
            .client
            .post(endpoint.control_url())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(request.to_owned())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(TransportError::Protocol(
                    "HTTP 404: the player must be on the same subnet with Remote Device Operation enabled"
                        .to_string(),
                ));
            }
            status => {
                return Err(TransportError::Protocol(format!(
                    "Unexpected HTTP status {}",
                    status
                )));
            }
        }

        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;
        debug!(%endpoint, bytes = body.len(), "received reply");
        Ok(body.to_vec())
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Unreachable(err.to_string())
    } else {
        TransportError::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::net::{Ipv4Addr, SocketAddr};

    fn endpoint_for(addr: SocketAddr) -> Endpoint {
        Endpoint::new(Ipv4Addr::LOCALHOST).with_port(addr.port())
    }

    #[tokio::test]
    async fn test_posts_form_body_with_player_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Endpoint::CONTROL_PATH)
            .match_header("user-agent", HttpTransport::USER_AGENT)
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::Exact("cCMD_PST.x=100&cCMD_PST.y=100".into()))
            .with_status(200)
            .with_body("00,\"\",1\r\n1,754,0,00000000\r\n")
            .create_async()
            .await;

        let transport = HttpTransport::new().unwrap();
        let body = transport
            .invoke(
                &endpoint_for(server.host_with_port().parse().unwrap()),
                "cCMD_PST.x=100&cCMD_PST.y=100",
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, b"00,\"\",1\r\n1,754,0,00000000\r\n");
    }

    #[tokio::test]
    async fn test_404_explains_remote_operation_setting() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Endpoint::CONTROL_PATH)
            .with_status(404)
            .create_async()
            .await;

        let transport = HttpTransport::new().unwrap();
        let err = transport
            .invoke(&endpoint_for(server.host_with_port().parse().unwrap()), "x", Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            TransportError::Protocol(msg) => assert!(msg.contains("Remote Device Operation")),
            other => panic!("Expected Protocol error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_status_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Endpoint::CONTROL_PATH)
            .with_status(500)
            .create_async()
            .await;

        let transport = HttpTransport::new().unwrap();
        let err = transport
            .invoke(&endpoint_for(server.host_with_port().parse().unwrap()), "x", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Protocol(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new().unwrap();
        let err = transport
            .invoke(&endpoint_for(addr), "x", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Unreachable(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_silent_device_times_out() {
        // Accepts the connection but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let transport = HttpTransport::new().unwrap();
        let timeout = Duration::from_millis(200);
        let err = transport
            .invoke(&endpoint_for(addr), "x", timeout)
            .await
            .unwrap_err();

        assert_eq!(err, TransportError::Timeout(timeout));
    }
}
