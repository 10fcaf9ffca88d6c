//! Test fixtures and helpers.
//!
//! A [`TestFixture`] wires a [`Notary`] to in-memory adapters. A
//! [`ClientFixture`] plays the client side of the protocol against it.

use std::sync::Arc;

use serde::Serialize;

use notary::{
    ChallengeBody, DocumentBody, Notary, NotaryConfig, NotaryError, RegistrationBody, Request,
    Result,
};
use notary_core::{
    Address, DocumentHash, Ed25519PublicKey, Fingerprint, Keypair, NotarizationRecord, Nonce,
    SessionToken,
};
use notary_envelope::{EnvelopeIdentity, PublicIdentity, SecureEnvelope};
use notary_ledger::{memory::MemoryLedger, KeypairWallet, SigningWallet};
use notary_store::{AccountStore, MemoryStore, NotarizationStore};

/// Seed of the fixture server's envelope identity.
pub const SERVER_SEED: [u8; 32] = [0x5e; 32];

/// Seed of the fixture notary wallet.
pub const WALLET_SEED: [u8; 32] = [0x77; 32];

/// A notary wired to in-memory adapters.
pub struct TestFixture {
    pub notary: Arc<Notary>,
    pub ledger: Arc<MemoryLedger>,
    pub accounts: Arc<dyn AccountStore>,
    pub notarizations: Arc<dyn NotarizationStore>,
    pub wallet_key: Ed25519PublicKey,
}

impl TestFixture {
    /// A notary over a fresh [`MemoryStore`] with the default configuration.
    pub fn new() -> Self {
        Self::with_config(NotaryConfig::default())
    }

    /// A notary over a fresh [`MemoryStore`].
    pub fn with_config(config: NotaryConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    /// A notary over any store that keeps both accounts and notarizations.
    pub fn with_store<S>(store: Arc<S>, config: NotaryConfig) -> Self
    where
        S: AccountStore + NotarizationStore + 'static,
    {
        let accounts: Arc<dyn AccountStore> = store.clone();
        let notarizations: Arc<dyn NotarizationStore> = store;
        Self::with_parts(accounts, notarizations, Arc::new(MemoryLedger::new()), config)
    }

    /// A notary over explicit adapters.
    pub fn with_parts(
        accounts: Arc<dyn AccountStore>,
        notarizations: Arc<dyn NotarizationStore>,
        ledger: Arc<MemoryLedger>,
        config: NotaryConfig,
    ) -> Self {
        let wallet = KeypairWallet::new(Keypair::from_seed(&WALLET_SEED));
        let wallet_key = wallet.public_key();
        let notary = Notary::new(
            EnvelopeIdentity::from_seed(&SERVER_SEED),
            accounts.clone(),
            notarizations.clone(),
            ledger.clone(),
            Arc::new(wallet),
            config,
        );

        Self {
            notary: Arc::new(notary),
            ledger,
            accounts,
            notarizations,
            wallet_key,
        }
    }

    /// The server identity clients seal to.
    pub fn server(&self) -> PublicIdentity {
        self.notary.server_public_key()
    }

    /// A client with a deterministic identity.
    pub fn client(&self, seed: u8) -> ClientFixture {
        ClientFixture::with_seed([seed; 32], self.server())
    }

    /// A registered, confirmed and logged-in client.
    pub async fn logged_in_client(&self, seed: u8) -> Result<ClientFixture> {
        let mut client = self.client(seed);
        client.register_confirmed(&self.notary).await?;
        client.login(&self.notary).await?;
        Ok(client)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// The client side of the protocol.
pub struct ClientFixture {
    pub identity: EnvelopeIdentity,
    pub fingerprint: Fingerprint,
    /// The token to present on the next authenticated request.
    pub token: Option<SessionToken>,
    server: PublicIdentity,
}

impl ClientFixture {
    /// A client with a random identity.
    pub fn new(server: PublicIdentity) -> Self {
        Self::from_identity(EnvelopeIdentity::generate(), server)
    }

    /// A client with a deterministic identity.
    pub fn with_seed(seed: [u8; 32], server: PublicIdentity) -> Self {
        Self::from_identity(EnvelopeIdentity::from_seed(&seed), server)
    }

    fn from_identity(identity: EnvelopeIdentity, server: PublicIdentity) -> Self {
        Self {
            identity,
            fingerprint: Fingerprint::new("notary-testkit/1.0", "198.51.100.7"),
            token: None,
            server,
        }
    }

    /// The client's address.
    pub fn address(&self) -> Address {
        self.identity.address()
    }

    /// The client's public identity.
    pub fn public_identity(&self) -> PublicIdentity {
        self.identity.public_identity()
    }

    /// Seal `body` as JSON for the server.
    pub fn seal<T: Serialize>(&self, body: &T) -> SecureEnvelope {
        SecureEnvelope::seal_json(&self.identity, &self.server, body)
            .expect("sealing a serializable body")
    }

    /// Open a server response as JSON.
    pub fn open<T: serde::de::DeserializeOwned>(
        &self,
        envelope: &SecureEnvelope,
    ) -> notary_envelope::Result<T> {
        envelope.open_json(&self.identity, &self.server)
    }

    /// Register with the notary, returning the confirmation code.
    pub async fn register(&self, notary: &Notary) -> Result<Nonce> {
        let envelope = self.seal(&RegistrationBody {
            email: Some(format!("{}@example.test", &self.address().as_str()[..8])),
        });
        notary
            .register_account(self.public_identity(), &envelope)
            .await
    }

    /// Register and confirm.
    pub async fn register_confirmed(&self, notary: &Notary) -> Result<()> {
        let code = self.register(notary).await?;
        notary.confirm_account(&self.address(), &code).await
    }

    /// Run the challenge-response exchange and adopt the issued token.
    pub async fn login(&mut self, notary: &Notary) -> Result<SessionToken> {
        let challenge = notary.issue_challenge(&self.address()).await?;
        let body: ChallengeBody = self
            .open(&challenge)
            .map_err(|e| NotaryError::Internal(e.to_string()))?;
        let response = self.seal(&body);
        let token = notary
            .submit_challenge_response(&self.address(), &response, &self.fingerprint)
            .await?;
        self.token = Some(token);
        Ok(token)
    }

    /// Build an authenticated request about `document_hash` with the
    /// current token.
    pub fn document_request(&self, document_hash: &DocumentHash) -> Request {
        Request {
            address: self.address(),
            envelope: self.seal(&DocumentBody {
                document_hash: *document_hash,
            }),
            token: self.token.expect("client is not logged in"),
            fingerprint: self.fingerprint.clone(),
        }
    }

    /// Notarize a document, adopting the rotated token.
    pub async fn notarize(
        &mut self,
        notary: &Notary,
        document_hash: &DocumentHash,
    ) -> Result<NotarizationRecord> {
        let response = notary
            .notarize(self.document_request(document_hash))
            .await?;
        self.token = Some(response.token);
        self.open_record(&response.outcome?)
    }

    /// Query a notarization, adopting the rotated token.
    pub async fn status(
        &mut self,
        notary: &Notary,
        document_hash: &DocumentHash,
    ) -> Result<NotarizationRecord> {
        let response = notary
            .notarization_status(self.document_request(document_hash))
            .await?;
        self.token = Some(response.token);
        self.open_record(&response.outcome?)
    }

    /// Open a sealed record.
    pub fn open_record(&self, envelope: &SecureEnvelope) -> Result<NotarizationRecord> {
        self.open(envelope)
            .map_err(|e| NotaryError::Internal(e.to_string()))
    }
}

/// Logged-in clients for multi-party tests, seeded `1..=count`.
pub async fn logged_in_clients(fixture: &TestFixture, count: u8) -> Result<Vec<ClientFixture>> {
    let mut clients = Vec::with_capacity(count as usize);
    for seed in 1..=count {
        clients.push(fixture.logged_in_client(seed).await?);
    }
    Ok(clients)
}
