use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over the raw webhook body using the shared secret.
/// Returns the hex-encoded MAC, as the provider sends it.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a provider signature against the exact raw body bytes.
///
/// An empty secret is a misconfiguration and never validates. The final
/// comparison goes through `verify_slice`, which is constant-time; a
/// signature that is not valid hex is compared against zeros so the
/// rejection path costs the same as a mismatch.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        tracing::error!("webhook secret is empty, rejecting signature");
        return false;
    }

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);

    let expected = hex::decode(signature.trim()).unwrap_or_else(|_| vec![0u8; 32]);

    mac.verify_slice(&expected).is_ok()
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().fold(String::new(), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        })
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, ()> {
        if s.len() % 2 != 0 || !s.is_ascii() {
            return Err(());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_accepts_own_mac() {
        let secret = b"whsec-test";
        let body = br#"{"transactionId":"TX1","status":"pending"}"#;
        let sig = compute_signature(secret, body);
        assert!(verify_signature(secret, body, &sig));
    }

    #[test]
    fn test_signature_wrong_secret() {
        let body = b"{}";
        let sig = compute_signature(b"secret-1", body);
        assert!(!verify_signature(b"secret-2", body, &sig));
    }

    #[test]
    fn test_signature_tampered_body() {
        let secret = b"whsec-test";
        let sig = compute_signature(secret, br#"{"status":"pending"}"#);
        assert!(!verify_signature(secret, br#"{"status":"completed"}"#, &sig));
    }

    #[test]
    fn test_signature_empty_secret_rejected() {
        // A MAC computed under the empty key must still be refused.
        let sig = compute_signature(b"", b"body");
        assert!(!verify_signature(b"", b"body", &sig));
    }

    #[test]
    fn test_signature_uppercase_hex_accepted() {
        let secret = b"whsec-test";
        let sig = compute_signature(secret, b"body").to_uppercase();
        assert!(verify_signature(secret, b"body", &sig));
    }

    #[test]
    fn test_signature_invalid_hex() {
        assert!(!verify_signature(b"secret", b"body", "not-hex-zz"));
        assert!(!verify_signature(b"secret", b"body", ""));
    }

    #[test]
    fn test_signature_truncated() {
        let secret = b"whsec-test";
        let sig = compute_signature(secret, b"body");
        assert!(!verify_signature(secret, b"body", &sig[..32]));
    }
}
