//! Golden test vectors for deterministic verification.
//!
//! Session tokens and notary hashes must come out bit-identical on every
//! implementation: clients recompute tokens, and auditors recompute notary
//! hashes from the ledger.

use notary_core::{notary_hash, DocumentHash, Fingerprint, Keypair, Nonce, SessionToken};

/// A session token vector.
#[derive(Debug, Clone)]
pub struct TokenVector {
    pub name: &'static str,
    pub nonce: [u8; 32],
    /// Raw fingerprint string (user agent followed by origin).
    pub fingerprint: &'static str,
    /// Expected encoded token.
    pub expected_token: &'static str,
}

/// A notary hash vector.
#[derive(Debug, Clone)]
pub struct NotaryVector {
    pub name: &'static str,
    /// Wallet key seed.
    pub seed: [u8; 32],
    /// Document contents; the document hash is their SHA-256.
    pub document: &'static [u8],
    pub expected_public_key: &'static str,
    pub expected_signature: &'static str,
    pub expected_notary_hash: &'static str,
}

/// Get all token vectors.
pub fn token_vectors() -> Vec<TokenVector> {
    vec![
        TokenVector {
            name: "zero nonce, loopback origin",
            nonce: [0x00; 32],
            fingerprint: "agent127.0.0.1",
            expected_token: "4921fc67a0af40d8292003c13e9a7d693e9e0702b62eda68458fa26a3cf50262",
        },
        TokenVector {
            name: "browser fingerprint",
            nonce: [0x11; 32],
            fingerprint: "Mozilla/5.0203.0.113.9",
            expected_token: "ae09dcf55ad3e646e3b4e29c7a886475fea6a3bc7bbd87be840622309c4f6540",
        },
        TokenVector {
            name: "empty fingerprint",
            nonce: [0xff; 32],
            fingerprint: "",
            expected_token: "e02daa7e91aea014e6a947e60fcf86f93b85558b04abb1d4842d22ae76959483",
        },
    ]
}

/// Get all notary hash vectors.
pub fn notary_vectors() -> Vec<NotaryVector> {
    vec![
        NotaryVector {
            name: "hello world",
            seed: [0x77; 32],
            document: b"hello world",
            expected_public_key: "c853ad0f0cd2b619aea92ceec4fd56a24d6499d584ce79257e45cfd8139b60a7",
            expected_signature: "cc7d6711046294feee78dae62e21a97c8e91469222ca197b4a6358b3181f07fb\
                                 8ea03d28721a919964c0eca4693b28f7152003f608b517bfcb264cf587fb9e02",
            expected_notary_hash: "f36c307e680cdc8ced12342d43c79a3e4513b5ca64c56dd7a01df6e808289c6e",
        },
        NotaryVector {
            name: "empty document",
            seed: [0x42; 32],
            document: b"",
            expected_public_key: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_signature: "b362fd2957f2c89b7918b8916ffeff73b99934f78ef86a334a1df3472f59ef9b\
                                 2cb80aa8891418ba3014c12c37176244dd75c76dea9b089f8b4148e5a8c5f103",
            expected_notary_hash: "22de3c22d9362c7ca1bc19fb623150c3b5ed8a42b9a0c7f0ff987c5254257a66",
        },
        NotaryVector {
            name: "second document, same wallet",
            seed: [0x77; 32],
            document: b"contract v2",
            expected_public_key: "c853ad0f0cd2b619aea92ceec4fd56a24d6499d584ce79257e45cfd8139b60a7",
            expected_signature: "eb77ad050e1ecdfda38b2ff4d70167823769e2005693fd0bc28bff0405af2d14\
                                 ae9ee4f9264eef6977df27a41aa4864b4bd5980fb17f7a1d7fd999bd8cd8d506",
            expected_notary_hash: "c72ee5e01e1ed775c2f176ba77018e0417369850270e730d25f90a762dac68ed",
        },
    ]
}

/// Compute the encoded token for a vector.
pub fn token_from_vector(vector: &TokenVector) -> String {
    let nonce = Nonce::from_bytes(vector.nonce);
    SessionToken::derive(&nonce, &Fingerprint::from_raw(vector.fingerprint)).encode()
}

/// Computed outputs for a notary vector: public key, signature, notary hash.
pub fn notary_from_vector(vector: &NotaryVector) -> (String, String, String) {
    let keypair = Keypair::from_seed(&vector.seed);
    let document_hash = DocumentHash::of_document(vector.document);
    let signature = keypair.sign(document_hash.as_bytes());
    (
        keypair.public_key().to_hex(),
        signature.to_hex(),
        notary_hash(&signature, &document_hash).to_hex(),
    )
}

/// Verify every vector, returning the names of those that fail.
pub fn verify_all_vectors() -> Vec<&'static str> {
    let mut failed = Vec::new();
    for v in token_vectors() {
        if token_from_vector(&v) != v.expected_token {
            failed.push(v.name);
        }
    }
    for v in notary_vectors() {
        let (pk, sig, nh) = notary_from_vector(&v);
        if pk != v.expected_public_key
            || sig != v.expected_signature
            || nh != v.expected_notary_hash
        {
            failed.push(v.name);
        }
    }
    failed
}
