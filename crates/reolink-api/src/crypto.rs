// Digest login and payload cipher
//
// The encrypted login answers an HTTP-Digest style challenge and derives
// an AES-128 key from the same nonce/cnonce pair. Once a key exists every
// request body is AES-CFB encrypted and base64 encoded; without a key the
// payload helpers pass data through untouched.

use std::collections::HashMap;
use std::fmt;

use aes::Aes128;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use rand::RngCore;

use crate::error::Error;

type Aes128CfbEnc = cfb_mode::Encryptor<Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;

/// IV shared by the camera web app and every client.
pub const CIPHER_IV: &[u8; 16] = b"bcswebapp1234567";

/// Nonce count used when the challenge does not carry one.
const DEFAULT_NC: &str = "00000001";

/// Random bytes in a client nonce (hex encoded on the wire).
const CNONCE_LEN: usize = 24;

// ── Digest ───────────────────────────────────────────────────────────

/// Parameters needed to answer one digest challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: String,
    pub nc: String,
    pub cnonce: String,
    pub uri: String,
    pub method: String,
    pub username: String,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate: Digest ...` header value.
    ///
    /// `realm`, `nonce` and `qop` are required; `nc` defaults to
    /// `00000001`. A fresh random `cnonce` is generated.
    pub fn parse(header: &str, username: &str, method: &str, uri: &str) -> Result<Self, Error> {
        let params = parse_challenge_params(header)?;
        let required = |name: &str| {
            params
                .get(name)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| Error::Protocol(format!("digest challenge missing {name}")))
        };

        Ok(Self {
            realm: required("realm")?,
            nonce: required("nonce")?,
            qop: required("qop")?,
            nc: params
                .get("nc")
                .cloned()
                .unwrap_or_else(|| DEFAULT_NC.to_owned()),
            cnonce: generate_cnonce(),
            uri: uri.to_owned(),
            method: method.to_owned(),
            username: username.to_owned(),
        })
    }

    /// Replace the client nonce (deterministic tests).
    pub fn with_cnonce(mut self, cnonce: impl Into<String>) -> Self {
        self.cnonce = cnonce.into();
        self
    }
}

/// Split a digest challenge header into lowercase-keyed parameters.
///
/// Accepts quoted and unquoted values; commas inside quotes are kept.
pub fn parse_challenge_params(header: &str) -> Result<HashMap<String, String>, Error> {
    let trimmed = header.trim();
    let scheme_len = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let (scheme, rest) = trimmed.split_at(scheme_len);
    if !scheme.eq_ignore_ascii_case("digest") {
        return Err(Error::Protocol(format!(
            "expected a Digest challenge, got {scheme:?}"
        )));
    }

    let mut params = HashMap::new();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in rest.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);

    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((key, value)) = part.split_once('=') else {
            return Err(Error::Protocol(format!(
                "malformed digest parameter {part:?}"
            )));
        };
        let value = value.trim().trim_matches('"');
        params.insert(key.trim().to_ascii_lowercase(), value.to_owned());
    }

    Ok(params)
}

/// Generate a hex-encoded random client nonce.
pub fn generate_cnonce() -> String {
    let mut bytes = [0u8; CNONCE_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The digest proof plus the symmetric key derived alongside it.
#[derive(Clone, PartialEq, Eq)]
pub struct DigestResponse {
    pub response: String,
    pub key: [u8; 16],
}

impl fmt::Debug for DigestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestResponse")
            .field("response", &self.response)
            .field("key", &"******")
            .finish()
    }
}

fn hex_md5(parts: &[&str]) -> String {
    format!("{:x}", md5::compute(parts.join(":")))
}

/// Compute the digest response and the derived AES key.
pub fn compute_digest_response(challenge: &DigestChallenge, password: &str) -> DigestResponse {
    let ha1 = hex_md5(&[&challenge.username, &challenge.realm, password]);
    let ha2 = hex_md5(&[&challenge.method, &challenge.uri]);
    let response = hex_md5(&[
        &ha1,
        &challenge.nonce,
        &challenge.nc,
        &challenge.cnonce,
        &challenge.qop,
        &ha2,
    ]);

    DigestResponse {
        response,
        key: derive_key(&challenge.nonce, password, &challenge.cnonce),
    }
}

/// First 16 chars of the uppercase hex MD5 of `nonce-password-cnonce`.
pub fn derive_key(nonce: &str, password: &str, cnonce: &str) -> [u8; 16] {
    let phrase = format!("{nonce}-{password}-{cnonce}");
    let digest = format!("{:X}", md5::compute(phrase));
    let mut key = [0u8; 16];
    key.copy_from_slice(&digest.as_bytes()[..16]);
    key
}

// ── Cipher ───────────────────────────────────────────────────────────

/// AES-128-CFB payload cipher keyed by a digest login.
#[derive(Clone, PartialEq, Eq)]
pub struct Cipher {
    key: [u8; 16],
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").field("key", &"******").finish()
    }
}

impl Cipher {
    pub fn new(key: [u8; 16]) -> Self {
        Self { key }
    }

    /// Encrypt and base64 encode.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut buf = plaintext.as_bytes().to_vec();
        Aes128CfbEnc::new(&self.key.into(), CIPHER_IV.into()).encrypt(&mut buf);
        STANDARD.encode(buf)
    }

    /// Base64 decode and decrypt.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, Error> {
        let mut buf = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| Error::Protocol(format!("encrypted payload is not base64: {e}")))?;
        Aes128CfbDec::new(&self.key.into(), CIPHER_IV.into()).decrypt(&mut buf);
        String::from_utf8(buf)
            .map_err(|_| Error::Protocol("decrypted payload is not UTF-8".into()))
    }
}

/// Encrypt a request body when a cipher is active.
pub fn encrypt_payload(cipher: Option<&Cipher>, plaintext: String) -> String {
    match cipher {
        Some(cipher) => cipher.encrypt(&plaintext),
        None => plaintext,
    }
}

/// Decrypt a response body when a cipher is active.
///
/// Bodies that already look like JSON are passed through: cameras answer
/// some errors in the clear even on an encrypted session.
pub fn decrypt_payload(cipher: Option<&Cipher>, body: &[u8]) -> Result<Vec<u8>, Error> {
    let Some(cipher) = cipher else {
        return Ok(body.to_vec());
    };
    let text = std::str::from_utf8(body)
        .map_err(|_| Error::Protocol("encrypted payload is not UTF-8".into()))?;
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Ok(body.to_vec());
    }
    cipher.decrypt(text).map(String::into_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        r#"Digest realm="IPC", nonce="4a1b2c3d", qop="auth", nc=00000001"#;

    #[test]
    fn parses_reolink_challenge() {
        let challenge = DigestChallenge::parse(HEADER, "admin", "POST", "/cgi-bin/api.cgi")
            .expect("valid challenge");
        assert_eq!(challenge.realm, "IPC");
        assert_eq!(challenge.nonce, "4a1b2c3d");
        assert_eq!(challenge.qop, "auth");
        assert_eq!(challenge.nc, "00000001");
        assert_eq!(challenge.cnonce.len(), CNONCE_LEN * 2);
    }

    #[test]
    fn nc_defaults_when_absent() {
        let challenge = DigestChallenge::parse(
            r#"digest realm="a, b", nonce="n", qop="auth""#,
            "admin",
            "POST",
            "/",
        )
        .expect("valid challenge");
        assert_eq!(challenge.realm, "a, b");
        assert_eq!(challenge.nc, DEFAULT_NC);
    }

    #[test]
    fn rejects_non_digest_or_incomplete_challenges() {
        assert!(matches!(
            DigestChallenge::parse(r#"Basic realm="x""#, "admin", "POST", "/"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            DigestChallenge::parse(r#"Digest realm="x", qop="auth""#, "admin", "POST", "/"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            DigestChallenge::parse("Digest realm", "admin", "POST", "/"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn cnonces_differ_per_attempt() {
        assert_ne!(generate_cnonce(), generate_cnonce());
    }

    #[test]
    fn digest_matches_rfc2617_example() {
        let challenge = DigestChallenge {
            realm: "testrealm@host.com".into(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".into(),
            qop: "auth".into(),
            nc: "00000001".into(),
            cnonce: "0a4f113b".into(),
            uri: "/dir/index.html".into(),
            method: "GET".into(),
            username: "Mufasa".into(),
        };
        let digest = compute_digest_response(&challenge, "Circle Of Life");
        assert_eq!(digest.response, "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn digest_is_deterministic() {
        let challenge = DigestChallenge::parse(HEADER, "admin", "POST", "/cgi-bin/api.cgi")
            .expect("valid challenge")
            .with_cnonce("00ff00ff");
        let first = compute_digest_response(&challenge, "hunter2");
        let second = compute_digest_response(&challenge, "hunter2");
        assert_eq!(first, second);
        assert_eq!(first.response.len(), 32);
        assert!(first.response.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn key_is_uppercase_hex_prefix() {
        let key = derive_key("n", "", "c");
        // MD5("n--c"), uppercased, first 16 chars
        let expected = format!("{:X}", md5::compute("n--c"));
        assert_eq!(&key[..], &expected.as_bytes()[..16]);
        assert!(key.iter().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_lowercase()));
    }

    #[test]
    fn cfb_matches_nist_vector() {
        let key: [u8; 16] = hex::decode("2b7e151628aed2a6abf7158809cf4f3c")
            .expect("hex")
            .try_into()
            .expect("16 bytes");
        let iv: [u8; 16] = hex::decode("000102030405060708090a0b0c0d0e0f")
            .expect("hex")
            .try_into()
            .expect("16 bytes");
        let mut buf = hex::decode("6bc1bee22e409f96e93d7e117393172a").expect("hex");
        Aes128CfbEnc::new(&key.into(), &iv.into()).encrypt(&mut buf);
        assert_eq!(hex::encode(&buf), "3b3fd92eb72dad20333449f8e83cfb4a");
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let cipher = Cipher::new(derive_key("nonce", "secret", "cnonce"));
        for plaintext in ["", "x", r#"[{"cmd":"GetDevInfo","action":0}]"#, "ünïcödé ✓"] {
            let encrypted = cipher.encrypt(plaintext);
            assert_eq!(cipher.decrypt(&encrypted).expect("decrypts"), plaintext);
        }
    }

    #[test]
    fn payload_helpers_pass_through_without_key() {
        assert_eq!(encrypt_payload(None, "[1]".into()), "[1]");
        assert_eq!(decrypt_payload(None, b"abc").expect("identity"), b"abc");
    }

    #[test]
    fn decrypt_payload_keeps_plain_json() {
        let cipher = Cipher::new(*b"0123456789ABCDEF");
        let body = br#"[{"cmd":"Login","code":0}]"#;
        assert_eq!(decrypt_payload(Some(&cipher), body).expect("plain"), body);

        let encrypted = encrypt_payload(Some(&cipher), "[2]".into());
        assert_eq!(
            decrypt_payload(Some(&cipher), encrypted.as_bytes()).expect("decrypts"),
            b"[2]"
        );
    }

    #[test]
    fn debug_redacts_key() {
        let cipher = Cipher::new(*b"0123456789ABCDEF");
        assert!(!format!("{cipher:?}").contains("0123"));
    }
}
