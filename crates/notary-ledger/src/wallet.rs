//! The notary's signing wallet.

use notary_core::{Ed25519PublicKey, Ed25519Signature, Keypair};

/// Holds the notary's private key and signs document hashes with it.
///
/// Key custody is the implementor's concern.
pub trait SigningWallet: Send + Sync {
    /// Sign `message` with the wallet key.
    fn sign(&self, message: &[u8]) -> Ed25519Signature;

    /// The wallet's public key.
    fn public_key(&self) -> Ed25519PublicKey;
}

/// A wallet backed by an in-process Ed25519 keypair.
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    /// Wrap an existing keypair.
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Generate a wallet with a fresh random key.
    pub fn generate() -> Self {
        Self::new(Keypair::generate())
    }
}

impl SigningWallet for KeypairWallet {
    fn sign(&self, message: &[u8]) -> Ed25519Signature {
        self.keypair.sign(message)
    }

    fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }
}
