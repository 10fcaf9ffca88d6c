//! The Notary: the operations exposed to clients.
//!
//! Transport-agnostic. A host maps its routes onto these methods and ships
//! envelopes, tokens and fingerprints in and out.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use notary_core::{Address, Fingerprint, Nonce, SessionToken};
use notary_envelope::{EnvelopeIdentity, PublicIdentity, SecureEnvelope};
use notary_ledger::{LedgerClient, SigningWallet};
use notary_store::{Account, AccountStore, InsertOutcome, NotarizationStore};

use crate::anchor::NotarizationAnchor;
use crate::config::NotaryConfig;
use crate::error::{auth_failure, NotaryError, Result};
use crate::messages::{DocumentBody, RegistrationBody};
use crate::pipeline::{Authorized, Pipeline, Request};
use crate::session::{Session, SessionAuthenticator};

/// The outcome of an authenticated operation.
///
/// Once a request authenticates, its token is spent and a fresh one issued,
/// whether or not the operation itself succeeds. The caller must always
/// adopt `token` for its next request.
#[derive(Debug)]
pub struct Authenticated<T> {
    /// Token for the caller's next request.
    pub token: SessionToken,
    /// What the operation produced.
    pub outcome: Result<T>,
}

impl<T> Authenticated<T> {
    /// Apply `f` to a successful outcome.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Authenticated<U> {
        Authenticated {
            token: self.token,
            outcome: self.outcome.map(f),
        }
    }
}

/// The notary service.
pub struct Notary {
    identity: Arc<EnvelopeIdentity>,
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<SessionAuthenticator>,
    anchor: NotarizationAnchor,
    pipeline: Pipeline,
    config: NotaryConfig,
}

impl Notary {
    /// Assemble the service from its adapters.
    pub fn new(
        identity: EnvelopeIdentity,
        accounts: Arc<dyn AccountStore>,
        notarizations: Arc<dyn NotarizationStore>,
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn SigningWallet>,
        config: NotaryConfig,
    ) -> Self {
        let identity = Arc::new(identity);
        let sessions = Arc::new(SessionAuthenticator::new(
            accounts.clone(),
            identity.clone(),
            config.session.require_confirmed,
        ));
        let pipeline = Pipeline::new(
            accounts.clone(),
            identity.clone(),
            sessions.clone(),
            config.session.require_confirmed,
        );
        let anchor = NotarizationAnchor::new(notarizations, ledger, wallet, config.anchor.clone());

        Self {
            identity,
            accounts,
            sessions,
            anchor,
            pipeline,
            config,
        }
    }

    /// The server's public identity. Clients seal requests to it.
    pub fn server_public_key(&self) -> PublicIdentity {
        self.identity.public_identity()
    }

    /// The server's address.
    pub fn server_address(&self) -> Address {
        self.identity.address()
    }

    /// The active configuration.
    pub fn config(&self) -> &NotaryConfig {
        &self.config
    }

    /// The session authenticator.
    pub fn sessions(&self) -> &SessionAuthenticator {
        &self.sessions
    }

    /// The notarization anchor, for status checks and orphan repair.
    pub fn anchor(&self) -> &NotarizationAnchor {
        &self.anchor
    }

    /// The authenticated-request pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────

    /// Register the identity that sealed `envelope`.
    ///
    /// The envelope must be sealed by `public_key` itself and carry a
    /// [`RegistrationBody`]. Returns the confirmation code, which the host
    /// delivers out of band (the account's email, for instance). The code is
    /// separate from the challenge nonce and is never sealed into a response.
    #[tracing::instrument(skip_all, fields(address = %envelope.sender))]
    pub async fn register_account(
        &self,
        public_key: PublicIdentity,
        envelope: &SecureEnvelope,
    ) -> Result<Nonce> {
        let body: RegistrationBody = envelope
            .open_json(&self.identity, &public_key)
            .map_err(|_| auth_failure("registration envelope rejected"))?;

        let code = Nonce::generate();
        let account = Account {
            confirmation: Some(code),
            ..Account::new(public_key, body.email)
        };
        match self.accounts.create_account(&account).await? {
            InsertOutcome::Inserted => {
                tracing::info!("account registered");
                Ok(code)
            }
            InsertOutcome::AlreadyExists => Err(NotaryError::AccountExists(account.address)),
        }
    }

    /// Confirm an account with the code issued at registration.
    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn confirm_account(&self, address: &Address, code: &Nonce) -> Result<()> {
        if self.accounts.confirm_account(address, code).await? {
            tracing::info!("account confirmed");
            Ok(())
        } else {
            Err(auth_failure("confirmation code mismatch"))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a fresh challenge nonce, sealed for the account.
    pub async fn issue_challenge(&self, address: &Address) -> Result<SecureEnvelope> {
        self.sessions.issue_challenge(address).await
    }

    /// Exchange a challenge response for a session token.
    pub async fn submit_challenge_response(
        &self,
        address: &Address,
        envelope: &SecureEnvelope,
        fingerprint: &Fingerprint,
    ) -> Result<SessionToken> {
        self.sessions
            .verify_challenge_response(address, envelope, fingerprint)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notarizations
    // ─────────────────────────────────────────────────────────────────────────

    /// Notarize the document named in the request body.
    ///
    /// The outer error means the request did not authenticate and nothing
    /// changed. Otherwise the outcome holds the record sealed for the caller,
    /// or why notarization failed.
    pub async fn notarize(&self, request: Request) -> Result<Authenticated<SecureEnvelope>> {
        let authorized = self.pipeline.run(request).await?;
        let outcome = self.notarize_authorized(&authorized).await;
        Ok(Authenticated {
            token: authorized.session.token(),
            outcome,
        })
    }

    /// Look up the notarization for the document named in the request body.
    pub async fn notarization_status(
        &self,
        request: Request,
    ) -> Result<Authenticated<SecureEnvelope>> {
        let authorized = self.pipeline.run(request).await?;
        let outcome = self.status_authorized(&authorized).await;
        Ok(Authenticated {
            token: authorized.session.token(),
            outcome,
        })
    }

    async fn notarize_authorized(&self, authorized: &Authorized) -> Result<SecureEnvelope> {
        let body: DocumentBody = parse_body(&authorized.message)?;
        let record = self
            .anchor
            .notarize(&authorized.session, &body.document_hash)
            .await?;
        self.seal_for(&authorized.session, &record)
    }

    async fn status_authorized(&self, authorized: &Authorized) -> Result<SecureEnvelope> {
        let body: DocumentBody = parse_body(&authorized.message)?;
        let record = self.anchor.status(&body.document_hash).await?;
        self.seal_for(&authorized.session, &record)
    }

    fn seal_for<T: Serialize>(&self, session: &Session, value: &T) -> Result<SecureEnvelope> {
        SecureEnvelope::seal_json(&self.identity, &session.account().public_key, value)
            .map_err(|e| NotaryError::Internal(e.to_string()))
    }
}

fn parse_body<T: DeserializeOwned>(message: &[u8]) -> Result<T> {
    serde_json::from_slice(message).map_err(|e| NotaryError::InvalidRequest(e.to_string()))
}
