use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const API_KEY_PREFIX: &str = "tpk_";
const API_KEY_LEN: usize = 40;
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub company_name: String,
    pub contact_name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    #[serde(skip_serializing)]
    pub api_key_digest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        company_name: impl Into<String>,
        contact_name: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new_random(),
            email: email.into().trim().to_ascii_lowercase(),
            company_name: company_name.into(),
            contact_name: contact_name.into(),
            phone: None,
            password_hash: None,
            is_active: true,
            is_admin: false,
            api_key_digest: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    /// Issues a fresh API key, keeps only its digest and returns the plaintext once.
    pub fn issue_api_key(&mut self, secret: &SecretString) -> SecretString {
        let key = generate_api_key();
        self.api_key_digest = Some(api_key_digest(secret, key.expose_secret()));
        key
    }
}

pub fn generate_api_key() -> SecretString {
    let mut rng = rand::thread_rng();
    let body: String = (0..API_KEY_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();
    format!("{API_KEY_PREFIX}{body}").into()
}

/// Keyed digest used to look up API keys without storing them.
pub fn api_key_digest(secret: &SecretString, api_key: &str) -> String {
    let payload = api_key.trim().as_bytes();
    match HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) {
        Ok(mut mac) => {
            mac.update(payload);
            encode_hex(mac.finalize().into_bytes().as_slice())
        }
        Err(_) => encode_hex(Sha256::digest(payload).as_slice()),
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
