//! HTTP client utilities for testing.
//!
//! This module provides helper functions for making HTTP requests to the calwater server during tests.

use reqwest::{Client, Response, Url};
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

/// Default timeout for HTTP requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// API prefix the test servers are mounted under
pub const API_PREFIX: &str = "/api/v1";

/// Create a default test client
pub fn create_test_client() -> Client {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .expect("Failed to build test HTTP client")
}

/// Build a URL for an API endpoint
pub fn build_url(addr: &SocketAddr, path: &str) -> Url {
    format!("http://{}{}{}", addr, API_PREFIX, path)
        .parse()
        .expect("Failed to parse URL")
}

/// Make a GET request to an API endpoint
pub async fn get(addr: &SocketAddr, path: &str) -> Result<Response, Box<dyn Error>> {
    let client = create_test_client();
    let url = build_url(addr, path);
    println!("Making request to: {}", url);
    Ok(client.get(url).send().await?)
}

/// Make a GET request and return the status code with the JSON body
pub async fn get_json(
    addr: &SocketAddr,
    path: &str,
) -> Result<(u16, serde_json::Value), Box<dyn Error>> {
    let response = get(addr, path).await?;
    let status = response.status().as_u16();
    let body = response.json::<serde_json::Value>().await?;
    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let addr: SocketAddr = ([127, 0, 0, 1], 8000).into();
        let url = build_url(&addr, "/counties");
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/v1/counties");
    }
}
