// Dynafire - Publisher Key Retrieval
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Download of the dynfw publisher's CURVE public key.

use anyhow::{anyhow, Context, Result};
use tracing::debug;

/// Fetch the publisher key file and return the quoted key it contains.
pub async fn fetch_server_key(url: &str) -> Result<String> {
    debug!("Fetching dynfw publisher key from {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .user_agent(format!("dynafire/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .context(format!("Failed to download publisher key from {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!("Publisher key download returned HTTP {}", response.status()));
    }

    let body = response
        .text()
        .await
        .context("Failed to read publisher key response")?;

    extract_quoted(&body)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Publisher key file does not contain a quoted key"))
}

/// Text between the first and the last double quote of `body`.
pub fn extract_quoted(body: &str) -> Option<&str> {
    let start = body.find('"')?;
    let end = body.rfind('"')?;
    if end <= start {
        return None;
    }
    Some(&body[start + 1..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_quoted() {
        let body = "#   ****  Generated on 2019-01-01  ****\nserver_key = \"<W7pl3=x)F4Xkb6&Cd9Q^2Ub[c%6Ujx9>T5%1y^b\"\n";
        assert_eq!(
            extract_quoted(body),
            Some("<W7pl3=x)F4Xkb6&Cd9Q^2Ub[c%6Ujx9>T5%1y^b")
        );
        assert_eq!(extract_quoted("\"\""), Some(""));
        assert_eq!(extract_quoted("no quotes"), None);
        assert_eq!(extract_quoted("one \" quote"), None);
    }
}
