use anyhow::{bail, Result};
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use log::{debug, info};

use subspace_panel::debug_flags::{self, DEBUG_FEED};
use subspace_panel::feed::{self, FeedRecord, MAX_BODY_BYTES};

const TIMEOUT_MS: u64 = 15_000;

/// HTTPS GET with extra headers, returning the body as a String.
pub fn https_get_with_headers(url: &str, headers: &[(&str, &str)]) -> Result<String> {
    let config = Configuration {
        timeout: Some(std::time::Duration::from_millis(TIMEOUT_MS)),
        use_global_ca_store: true,
        crt_bundle_attach: Some(esp_idf_sys::esp_crt_bundle_attach),
        ..Default::default()
    };

    let connection = EspHttpConnection::new(&config)?;

    use embedded_svc::http::client::Client;
    use embedded_svc::http::Method;
    use embedded_svc::io::Read;
    let mut client = Client::wrap(connection);

    let mut response = client.request(Method::Get, url, headers)?.submit()?;

    let status = response.status();
    if debug_flags::is_on(&DEBUG_FEED) {
        info!("HTTP GET {} -> status {}", url.chars().take(80).collect::<String>(), status);
    } else {
        debug!("HTTP GET -> status {}", status);
    }

    if status == 429 {
        bail!("Adafruit IO rate limited (HTTP 429)");
    }
    if status != 200 {
        bail!("HTTP error: status {}", status);
    }

    let mut body: Vec<u8> = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = response.read(&mut buf)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
        if body.len() > MAX_BODY_BYTES {
            bail!("Response too large (>{} bytes)", MAX_BODY_BYTES);
        }
    }

    Ok(String::from_utf8(body)?)
}

/// Fetch and parse the newest record of an Adafruit IO feed.
pub fn fetch_last(username: &str, key: &str, feed_key: &str) -> Result<FeedRecord> {
    let url = feed::last_data_url(username, feed_key);
    let body = https_get_with_headers(
        &url,
        &[("X-AIO-Key", key), ("Accept", "application/json")],
    )?;
    if !body.trim_start().starts_with('{') {
        bail!("Response is not JSON");
    }
    feed::parse_last(&body)
}
