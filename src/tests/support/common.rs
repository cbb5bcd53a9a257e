// Shared helper functions for integration tests.

use std::collections::HashMap;

/// Header map shorthand used across the test cases.
pub type H = HashMap<String, String>;

/// Builds a header map from pairs.
pub fn headers(pairs: &[(&str, &str)]) -> H {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Performs a request against the proxy and returns status, headers and body.
pub async fn do_request(method: &str, url: &str, headers: &H) -> (u16, H, Vec<u8>) {
    let client = reqwest::Client::new();
    let mut request = match method {
        "POST" => client.post(url),
        "PUT" => client.put(url),
        "DELETE" => client.delete(url),
        _ => client.get(url),
    };
    for (name, value) in headers {
        request = request.header(name, value);
    }

    let response = request.send().await.expect("request must reach the proxy");
    let status = response.status().as_u16();

    let mut response_headers = H::new();
    for (name, value) in response.headers() {
        if let Ok(value_str) = value.to_str() {
            response_headers.insert(name.as_str().to_string(), value_str.to_string());
        }
    }

    let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
    (status, response_headers, body)
}

/// Performs a GET against the proxy.
pub async fn do_get(url: &str, headers: &H) -> (u16, H, Vec<u8>) {
    do_request("GET", url, headers).await
}

/// Reads a string field out of a captured span.
pub fn span_str(span: &serde_json::Value, field: &str) -> String {
    span[field].as_str().unwrap_or("").to_string()
}

/// Reads a string entry out of a captured span's meta map.
pub fn span_meta(span: &serde_json::Value, key: &str) -> String {
    span["meta"][key].as_str().unwrap_or("").to_string()
}
