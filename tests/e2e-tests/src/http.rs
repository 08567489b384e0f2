//! Blocking HTTP client for the gateway API.
//!
//! The harness itself is synchronous (it drives child processes with
//! `std::process`), so requests run on a small current-thread runtime.

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::time::timeout;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct ApiClient {
    runtime: Runtime,
    client: Client<HttpConnector, Empty<Bytes>>,
    port: u16,
}

impl ApiClient {
    pub fn new(port: u16) -> Result<Self, String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to build runtime: {}", e))?;
        let client = Client::builder(TokioExecutor::new()).build_http();
        Ok(Self {
            runtime,
            client,
            port,
        })
    }

    /// Send one request and return (status code, body).
    pub fn request(&self, method: Method, path: &str) -> Result<(u16, String), String> {
        let uri = format!("http://127.0.0.1:{}{}", self.port, path);
        let request = Request::builder()
            .method(method.clone())
            .uri(&uri)
            .body(Empty::<Bytes>::new())
            .map_err(|e| format!("Failed to build request: {}", e))?;

        self.runtime.block_on(async {
            let response = match timeout(REQUEST_TIMEOUT, self.client.request(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(format!("{} {} failed: {}", method, uri, e)),
                Err(_) => return Err(format!("{} {} timed out", method, uri)),
            };

            let status = response.status().as_u16();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| format!("Failed to read body: {}", e))?
                .to_bytes();

            Ok((status, String::from_utf8_lossy(&body).into_owned()))
        })
    }

    /// Send one request and parse the body as JSON.
    pub fn request_json(&self, method: Method, path: &str) -> Result<Value, String> {
        let (status, body) = self.request(method.clone(), path)?;
        if status != 200 {
            return Err(format!("{} {} returned {}: {}", method, path, status, body));
        }
        serde_json::from_str(&body)
            .map_err(|e| format!("Invalid JSON from {}: {} ({})", path, e, body))
    }
}
