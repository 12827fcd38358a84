//! Fixed RSA fixtures for testing
//!
//! Provides three RSA-2048 keypairs checked in as PEM files, together with
//! their base64url-encoded moduli, so tests can both sign RS256 tokens and
//! publish the matching JWKs.
//!
//! These keys are for tests only and protect nothing.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wishlist_service::auth::PublishedKey;

/// Public exponent shared by every fixture key (65537).
pub const TEST_RSA_EXPONENT: &str = "AQAB";

const KEY_1_PEM: &str = include_str!("../fixtures/rsa_test_key_1.pem");
const KEY_1_MODULUS: &str = "uYsImoJKizGZtiR0HIGULTmVoPIj0X9jp1bs_SmRZZfD5w5X7_99TUVEsSeHGtviVUQgW5hfaFoN2m5FtQ9UYXI-cnkK7L2o2lWi2Ah4cxudIn0sCvh2wJbureUmSC0tpsJFOSJPR3dFazvWLkeNz62WlRrREbj-L7qIGEEXDP35O4nOdcmrABZWsSuBVZiOCw5xj5VKaSySKAO5SOCBIjO2QDx9b6jUAzZ6Fph6a4zo2r6sNluVV3mKbh4RDMn6YO409IguhWR16-VdFO22oIaVTsjJpY2pUwuopf8XM3UCzqy420b4jN2ZVPD5axz7SD5OMi_rw8DxHClROyT6_Q";

const KEY_2_PEM: &str = include_str!("../fixtures/rsa_test_key_2.pem");
const KEY_2_MODULUS: &str = "5zjvfaEfDoKyCpBAoZZaN-qjRSQvq5EZWUHKpCeDGJ6Q3VvuNXM1rCsxe8WybbIQSN_8-TlbGTg1j2hZlnUfC2nDNNDd7unEqeWxJXf0o7UtZTkVL4U0wAHhyvBWKpwD_Ch_-rYahwFpB3uR_zymR_x4DjATocf0Z1UyysjAAMShgCKSWBD_0J4c7XWsgSnXeAF7ikodWH9YwQExQKO0zTP8L02FejNtuLKxieRE6aICt2DidZGvgL9VkdDzb0pQ1mEtGAyxhqEBBPjszO3YNk7XHczkzwgO67UX7iUuMVB2lyAHBz6ijCuRi37OepTldQgbYhnbjCVybdQGypoXqw";

const KEY_3_PEM: &str = include_str!("../fixtures/rsa_test_key_3.pem");
const KEY_3_MODULUS: &str = "xjlsutzmXOpG2NDbVcDHOd5Nr56Y3OZPereG63Hp3Y4-o_1TU7LKvtxWJesgd9OajzdQOA3wuR0x2Hopv5hhtkR0XD6GjdaTLf9hlySkSwwbYSq4BpwL3IyplhrfK-60yFjQcDfvNIV896sk5c2lmfVY1aTdfkZUttxX4-XBkzjGo7P267QHuvt5_GaXAlqbGZRHd0NDW83Xwe_6lL_V6Jn2D5SVIunkAvHGQRnQ7bOTAt1ONf3NWcsm5JDibqwjN94NoxboLp3TFFwvzFrS2vqMKnTaGrJCfBtZd6kVuk1iIx55TgEURTBhUIny7ZWWocNpdTN0OYc5T8Zmw4E4gQ";

/// An RS256 signing keypair published under a chosen `kid`.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1, "key-1");
/// let token = keypair.sign_token(&TestTokenBuilder::new().build());
/// let jwk = keypair.jwk_json();
/// ```
#[derive(Debug, Clone)]
pub struct TestKeypair {
    kid: String,
    private_key_pem: &'static str,
    modulus: &'static str,
}

impl TestKeypair {
    /// Select fixture key `seed` (1, 2 or 3) and publish it as `kid`.
    ///
    /// The same seed always yields the same key material. Different seeds
    /// yield unrelated keys.
    ///
    /// # Panics
    ///
    /// Panics if `seed` is not 1, 2 or 3.
    pub fn new(seed: u8, kid: &str) -> Self {
        let (private_key_pem, modulus) = match seed {
            1 => (KEY_1_PEM, KEY_1_MODULUS),
            2 => (KEY_2_PEM, KEY_2_MODULUS),
            3 => (KEY_3_PEM, KEY_3_MODULUS),
            other => panic!("no RSA fixture for seed {other}, use 1, 2 or 3"),
        };

        Self {
            kid: kid.to_string(),
            private_key_pem,
            modulus,
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Base64url-encoded RSA modulus.
    pub fn modulus(&self) -> &str {
        self.modulus
    }

    /// Sign `claims` with RS256 and this keypair's `kid`.
    pub fn sign_token(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());

        self.sign_token_with_header(&header, claims)
    }

    /// Sign `claims` with this key under a caller-supplied header.
    ///
    /// Used to produce tokens that name a different `kid` than the key that
    /// actually signed them.
    pub fn sign_token_with_header(&self, header: &Header, claims: &Value) -> String {
        let encoding_key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .expect("Failed to load RSA fixture key");

        encode(header, claims, &encoding_key).expect("Failed to sign token")
    }

    /// The JWK a provider would publish for this key.
    pub fn jwk_json(&self) -> Value {
        json!({
            "kid": self.kid,
            "alg": "RS256",
            "kty": "RSA",
            "e": TEST_RSA_EXPONENT,
            "n": self.modulus,
            "use": "sig"
        })
    }

    /// This key as a decoded published key.
    pub fn published_key(&self) -> PublishedKey {
        PublishedKey {
            kid: Some(self.kid.clone()),
            kty: Some("RSA".to_string()),
            n: Some(self.modulus.to_string()),
            e: Some(TEST_RSA_EXPONENT.to_string()),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
        }
    }
}

/// Replace the character at `index` of the token's payload segment with a
/// different base64url character.
///
/// # Panics
///
/// Panics if the token is not three segments or `index` is out of range.
pub fn tamper_payload_at(token: &str, index: usize) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "token must have three segments");

    let mut payload: Vec<char> = parts[1].chars().collect();
    payload[index] = if payload[index] == 'A' { 'B' } else { 'A' };
    let payload: String = payload.into_iter().collect();

    format!("{}.{}.{}", parts[0], payload, parts[2])
}

/// Build an unsigned token (`alg` as given, empty signature segment).
pub fn unsigned_token(header: &Value, claims: &Value) -> String {
    format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}
