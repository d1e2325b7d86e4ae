// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Endpoint probes

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::pipeline::{ProbeMethod, ServiceEndpoint};

/// A single readiness check against an endpoint.
///
/// `Ok(())` means the service accepted the connection and produced a
/// response; status codes are not interpreted.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, endpoint: &ServiceEndpoint) -> Result<(), String>;
}

/// HTTP probe: any response counts as ready
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, endpoint: &ServiceEndpoint) -> Result<(), String> {
        let request = match endpoint.method {
            ProbeMethod::Get => self.client.get(&endpoint.url),
            ProbeMethod::Post => {
                let request = self.client.post(&endpoint.url);
                match endpoint.body {
                    Some(ref body) => request.json(body),
                    None => request,
                }
            }
        };

        let response = request
            .timeout(endpoint.probe_timeout())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        tracing::trace!(
            endpoint = %endpoint.name,
            status = response.status().as_u16(),
            "probe answered"
        );
        Ok(())
    }
}

/// TCP probe: an accepted connection counts as ready
pub struct TcpProbe;

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, endpoint: &ServiceEndpoint) -> Result<(), String> {
        let address = endpoint
            .tcp_address()
            .ok_or_else(|| format!("'{}' is not a tcp:// address", endpoint.url))?;

        TcpStream::connect(address)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Picks the HTTP or TCP probe from the endpoint's URL scheme
pub struct EndpointProbe {
    http: HttpProbe,
    tcp: TcpProbe,
}

impl EndpointProbe {
    pub fn new() -> Self {
        Self {
            http: HttpProbe::new(),
            tcp: TcpProbe,
        }
    }
}

impl Default for EndpointProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for EndpointProbe {
    async fn probe(&self, endpoint: &ServiceEndpoint) -> Result<(), String> {
        if endpoint.tcp_address().is_some() {
            self.tcp.probe(endpoint).await
        } else {
            self.http.probe(endpoint).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per connection
    async fn spawn_http_server(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{addr}")
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_http_probe_accepts_any_status() {
        let url = spawn_http_server("503 Service Unavailable").await;
        let endpoint = ServiceEndpoint::new("frontend", url);

        assert!(HttpProbe::new().probe(&endpoint).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_post_probe() {
        let url = spawn_http_server("400 Bad Request").await;
        let endpoint = ServiceEndpoint {
            method: ProbeMethod::Post,
            body: Some(serde_json::json!({ "query": "{ __typename }" })),
            ..ServiceEndpoint::new("backend", format!("{url}/graphql"))
        };

        assert!(EndpointProbe::new().probe(&endpoint).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_probe_refused() {
        let port = closed_port().await;
        let endpoint = ServiceEndpoint::new("frontend", format!("http://127.0.0.1:{port}"));

        assert!(HttpProbe::new().probe(&endpoint).await.is_err());
    }

    #[tokio::test]
    async fn test_tcp_probe() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let endpoint = ServiceEndpoint::new("database", format!("tcp://{addr}"));

        assert!(EndpointProbe::new().probe(&endpoint).await.is_ok());

        drop(listener);
        let port = closed_port().await;
        let endpoint = ServiceEndpoint::new("cache", format!("tcp://127.0.0.1:{port}"));
        assert!(TcpProbe.probe(&endpoint).await.is_err());
    }

    #[tokio::test]
    async fn test_tcp_probe_rejects_http_url() {
        let endpoint = ServiceEndpoint::new("frontend", "http://localhost:3001");
        assert!(TcpProbe.probe(&endpoint).await.is_err());
    }
}
