//! OAuth credential handling for the Gmail client
//!
//! Two files under the data dir: `credentials.json` (client id and
//! secret, read-only to this process) and `token.json` (auto-managed
//! refreshable credential). When the refresh token is revoked the
//! token file is deleted and consent is re-acquired through a
//! local-loopback HTTP server on the configured port.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use crate::config::GmailConfig;
use crate::error::{Error, Result};

const SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: ClientSecrets,
}

#[derive(Debug, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

fn credentials_path(dir: &Path) -> PathBuf {
    dir.join("credentials.json")
}

fn token_path(dir: &Path) -> PathBuf {
    dir.join("token.json")
}

fn load_credentials(dir: &Path) -> Result<ClientSecrets> {
    let path = credentials_path(dir);
    let text = std::fs::read_to_string(&path).map_err(|_| {
        Error::Auth(format!(
            "No mail credentials at {}. Download an OAuth client (Desktop app) \
             from Google Cloud Console and save it there, then run setup again.",
            path.display()
        ))
    })?;
    let file: CredentialsFile = serde_json::from_str(&text)
        .map_err(|e| Error::Auth(format!("Malformed credentials.json: {}", e)))?;
    Ok(file.installed)
}

fn load_token(dir: &Path) -> Option<StoredToken> {
    let text = std::fs::read_to_string(token_path(dir)).ok()?;
    serde_json::from_str(&text).ok()
}

fn save_token(dir: &Path, token: &StoredToken) -> Result<()> {
    let text = serde_json::to_string_pretty(token)?;
    std::fs::write(token_path(dir), text)?;
    Ok(())
}

/// Produce a valid access token, refreshing or re-consenting as needed
pub async fn ensure_access_token(dir: &Path, config: &GmailConfig) -> Result<String> {
    let secrets = load_credentials(dir)?;

    if let Some(token) = load_token(dir) {
        let fresh = token
            .expiry
            .map(|e| e > Utc::now() + Duration::seconds(60))
            .unwrap_or(false);
        if fresh {
            return Ok(token.access_token);
        }

        if let Some(ref refresh) = token.refresh_token {
            match refresh_access_token(&secrets, refresh).await {
                Ok(refreshed) => {
                    let stored = StoredToken {
                        access_token: refreshed.access_token.clone(),
                        refresh_token: token.refresh_token.clone(),
                        expiry: refreshed
                            .expires_in
                            .map(|s| Utc::now() + Duration::seconds(s)),
                    };
                    save_token(dir, &stored)?;
                    return Ok(refreshed.access_token);
                }
                Err(e) => {
                    // Revoked grant: drop the token and fall through
                    // to interactive consent
                    warn!("Token refresh failed ({}), re-authenticating", e);
                    let _ = std::fs::remove_file(token_path(dir));
                }
            }
        }
    }

    let response = loopback_consent(&secrets, config).await?;
    let stored = StoredToken {
        access_token: response.access_token.clone(),
        refresh_token: response.refresh_token.clone(),
        expiry: response
            .expires_in
            .map(|s| Utc::now() + Duration::seconds(s)),
    };
    save_token(dir, &stored)?;
    Ok(response.access_token)
}

async fn refresh_access_token(
    secrets: &ClientSecrets,
    refresh_token: &str,
) -> Result<TokenResponse> {
    let response = reqwest::Client::new()
        .post(TOKEN_URI)
        .form(&[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Auth(format!("Refresh rejected: {}", body)));
    }
    Ok(response.json().await?)
}

/// Interactive consent over a single-accept loopback server
async fn loopback_consent(
    secrets: &ClientSecrets,
    config: &GmailConfig,
) -> Result<TokenResponse> {
    let redirect_uri = format!("http://127.0.0.1:{}", config.redirect_port);
    let auth_url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        AUTH_URI, secrets.client_id, redirect_uri, SCOPE
    );

    println!("Open this URL in your browser to authorize read-only mail access:");
    println!("\n  {}\n", auth_url);

    let listener =
        tokio::net::TcpListener::bind(("127.0.0.1", config.redirect_port)).await?;
    info!(port = config.redirect_port, "Waiting for OAuth callback");

    let timeout = std::time::Duration::from_millis(config.auth_timeout_ms);
    let code = tokio::time::timeout(timeout, accept_auth_code(&listener))
        .await
        .map_err(|_| Error::Auth("Timed out waiting for the OAuth callback".to_string()))??;

    let response = reqwest::Client::new()
        .post(TOKEN_URI)
        .form(&[
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Auth(format!("Code exchange rejected: {}", body)));
    }
    Ok(response.json().await?)
}

/// Accept one connection and pull `code` out of the request line
async fn accept_auth_code(listener: &tokio::net::TcpListener) -> Result<String> {
    let (mut stream, _) = listener.accept().await?;

    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]).to_string();

    let body = "<html><body>Authorized. You can close this tab.</body></html>";
    let reply = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(reply.as_bytes()).await;

    parse_auth_code(&request)
        .ok_or_else(|| Error::Auth("Callback carried no authorization code".to_string()))
}

fn parse_auth_code(request: &str) -> Option<String> {
    // "GET /?code=XYZ&scope=... HTTP/1.1"
    let line = request.lines().next()?;
    let path = line.split_whitespace().nth(1)?;
    let query = path.split_once('?')?.1;
    query
        .split('&')
        .find_map(|kv| kv.strip_prefix("code="))
        .map(percent_decode)
}

/// Minimal percent-decoding for the authorization code
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(b) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(if bytes[i] == b'+' { b' ' } else { bytes[i] });
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}
