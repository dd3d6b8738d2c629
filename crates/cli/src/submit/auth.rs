//! HMAC-SHA256 request signing.
//!
//! Every request carries the app key, the client id, a unix timestamp and
//! `hex(HMAC-SHA256(secret, app_key + client_id + timestamp))`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::settings::Credentials;

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Headers for one request signed at `timestamp` (unix seconds).
pub fn signed_headers(creds: &Credentials, timestamp: i64) -> Vec<(&'static str, String)> {
    let ts = timestamp.to_string();
    let message = format!("{}{}{}", creds.api_key, creds.client_id, ts);
    let signature = hmac_sha256_hex(&creds.api_secret, &message);

    vec![
        ("content-type", "application/json".to_string()),
        ("Accept", "*/*".to_string()),
        ("X-App-Key", creds.api_key.clone()),
        ("X-Client-Id", creds.client_id.clone()),
        ("X-Timestamp", ts),
        ("X-Signature", signature),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            api_key: "key123".into(),
            api_secret: "s3cret".into(),
            client_id: "client9".into(),
        }
    }

    #[test]
    fn test_hmac_rfc4231_case_2() {
        assert_eq!(
            hmac_sha256_hex("Jefe", "what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_signed_headers() {
        let headers = signed_headers(&creds(), 1_700_000_000);
        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("content-type"), "application/json");
        assert_eq!(get("Accept"), "*/*");
        assert_eq!(get("X-App-Key"), "key123");
        assert_eq!(get("X-Client-Id"), "client9");
        assert_eq!(get("X-Timestamp"), "1700000000");
        assert_eq!(
            get("X-Signature"),
            "023f7ba55fdda126bc859fa52f1704c27fbbeaee61dad5236bd9e93b03946ef1"
        );
    }
}
