//! Challenge-response authentication and rotating session tokens.
//!
//! ## State machine
//!
//! ```text
//! NoChallenge --issue_challenge--> ChallengeIssued
//! ChallengeIssued --correct response--> Authenticated (nonce rotated, token issued)
//! Authenticated --authenticated call--> Authenticated (nonce rotated, new token)
//! Authenticated --issue_challenge--> ChallengeIssued (old token invalid)
//! ```
//!
//! Tokens are never stored. A token is `H(H(nonce) || H(fingerprint))` for
//! the account's current nonce, so rotating the nonce invalidates every
//! token issued before it. All nonce transitions that depend on a presented
//! value go through the store's compare-and-set, which makes each nonce and
//! each token single-use even under concurrent replay.

use std::sync::Arc;

use notary_core::{Address, Fingerprint, Nonce, SessionToken};
use notary_envelope::{EnvelopeIdentity, SecureEnvelope};
use notary_store::{Account, AccountStore};

use crate::error::{auth_failure, NotaryError, Result};
use crate::messages::ChallengeBody;

/// An authenticated caller, produced only by a successful session check.
#[derive(Debug, Clone)]
pub struct Session {
    account: Account,
    fingerprint: Fingerprint,
    token: SessionToken,
}

impl Session {
    pub(crate) fn new(account: Account, fingerprint: Fingerprint, token: SessionToken) -> Self {
        Self {
            account,
            fingerprint,
            token,
        }
    }

    /// The authenticated account, as it was before this request rotated
    /// its nonce.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// The authenticated address.
    pub fn address(&self) -> &Address {
        &self.account.address
    }

    /// The caller's channel fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// The token to hand back to the caller for its next request.
    pub fn token(&self) -> SessionToken {
        self.token
    }
}

/// Issues challenges and validates and rotates session tokens.
pub struct SessionAuthenticator {
    accounts: Arc<dyn AccountStore>,
    identity: Arc<EnvelopeIdentity>,
    require_confirmed: bool,
}

impl SessionAuthenticator {
    /// Create an authenticator over an account store, sealing challenges
    /// with the server identity.
    ///
    /// With `require_confirmed`, unconfirmed accounts are treated as unknown
    /// when a challenge is requested.
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        identity: Arc<EnvelopeIdentity>,
        require_confirmed: bool,
    ) -> Self {
        Self {
            accounts,
            identity,
            require_confirmed,
        }
    }

    /// Regenerate the account's nonce and return it sealed for the account.
    ///
    /// Last issued wins: any earlier nonce and every token derived from it
    /// stop working.
    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn issue_challenge(&self, address: &Address) -> Result<SecureEnvelope> {
        let account = self
            .accounts
            .get_account(address)
            .await?
            .filter(|account| account.confirmed || !self.require_confirmed)
            .ok_or_else(|| NotaryError::UnknownAccount(address.clone()))?;

        let nonce = Nonce::generate();
        if !self.accounts.set_nonce(address, &nonce).await? {
            return Err(NotaryError::UnknownAccount(address.clone()));
        }

        let envelope = SecureEnvelope::seal_json(
            &self.identity,
            &account.public_key,
            &ChallengeBody { nonce },
        )
        .map_err(|e| NotaryError::Internal(e.to_string()))?;

        tracing::info!("challenge issued");
        Ok(envelope)
    }

    /// Check a challenge response and, on success, consume the challenge.
    ///
    /// The response must be an envelope from the account echoing its current
    /// nonce `N1`. On success the nonce moves atomically from `N1` to a fresh
    /// `N2` and the returned token is derived from `N2`, so replaying the
    /// same response fails. On any failure the nonce is left alone.
    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn verify_challenge_response(
        &self,
        address: &Address,
        envelope: &SecureEnvelope,
        fingerprint: &Fingerprint,
    ) -> Result<SessionToken> {
        let account = self
            .accounts
            .get_account(address)
            .await?
            .ok_or_else(|| auth_failure("unknown account"))?;

        let body: ChallengeBody = envelope
            .open_json(&self.identity, &account.public_key)
            .map_err(|_| auth_failure("envelope rejected"))?;

        if body.nonce != account.nonce {
            return Err(auth_failure("nonce mismatch"));
        }

        let next = Nonce::generate();
        if !self
            .accounts
            .rotate_nonce_if(address, &body.nonce, &next)
            .await?
        {
            return Err(auth_failure("nonce already consumed"));
        }

        Ok(SessionToken::derive(&next, fingerprint))
    }

    /// Whether `token` is valid for the account's current nonce and the
    /// presented fingerprint. Read-only.
    pub async fn is_authenticated(
        &self,
        address: &Address,
        token: &SessionToken,
        fingerprint: &Fingerprint,
    ) -> Result<bool> {
        Ok(match self.accounts.get_account(address).await? {
            Some(account) => token.matches(&account.nonce, fingerprint),
            None => false,
        })
    }

    /// Validate `token` against `account` and spend it.
    ///
    /// Compare-and-set from the account's nonce to a fresh one; of two
    /// requests presenting the same token, at most one gets a [`Session`].
    pub async fn consume_token(
        &self,
        account: Account,
        token: &SessionToken,
        fingerprint: Fingerprint,
    ) -> Result<Session> {
        if !token.matches(&account.nonce, &fingerprint) {
            return Err(auth_failure("token mismatch"));
        }

        let next = Nonce::generate();
        if !self
            .accounts
            .rotate_nonce_if(&account.address, &account.nonce, &next)
            .await?
        {
            return Err(auth_failure("token already used"));
        }

        let fresh = SessionToken::derive(&next, &fingerprint);
        Ok(Session::new(account, fingerprint, fresh))
    }

    /// Unconditionally advance the nonce and return the matching token.
    ///
    /// Invalidates every token previously issued for the account.
    pub async fn rotate_token(
        &self,
        address: &Address,
        fingerprint: &Fingerprint,
    ) -> Result<SessionToken> {
        let next = Nonce::generate();
        if !self.accounts.set_nonce(address, &next).await? {
            return Err(NotaryError::UnknownAccount(address.clone()));
        }
        Ok(SessionToken::derive(&next, fingerprint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_store::MemoryStore;

    struct Setup {
        store: Arc<MemoryStore>,
        server: Arc<EnvelopeIdentity>,
        client: EnvelopeIdentity,
        auth: SessionAuthenticator,
    }

    async fn setup() -> Setup {
        let store = Arc::new(MemoryStore::new());
        let server = Arc::new(EnvelopeIdentity::from_seed(&[0xee; 32]));
        let client = EnvelopeIdentity::from_seed(&[0x11; 32]);
        let account = Account {
            confirmed: true,
            confirmation: None,
            ..Account::new(client.public_identity(), None)
        };
        store.create_account(&account).await.unwrap();
        let auth = SessionAuthenticator::new(store.clone(), server.clone(), true);
        Setup {
            store,
            server,
            client,
            auth,
        }
    }

    fn respond(s: &Setup, nonce: Nonce) -> SecureEnvelope {
        SecureEnvelope::seal_json(
            &s.client,
            &s.server.public_identity(),
            &ChallengeBody { nonce },
        )
        .unwrap()
    }

    fn fp() -> Fingerprint {
        Fingerprint::new("notary-client/1.0", "192.0.2.7")
    }

    async fn open_challenge(s: &Setup) -> Nonce {
        let envelope = s.auth.issue_challenge(&s.client.address()).await.unwrap();
        let body: ChallengeBody = envelope
            .open_json(&s.client, &s.server.public_identity())
            .unwrap();
        body.nonce
    }

    #[tokio::test]
    async fn test_issue_challenge_unknown_account() {
        let s = setup().await;
        let stranger = EnvelopeIdentity::generate().address();

        assert!(matches!(
            s.auth.issue_challenge(&stranger).await,
            Err(NotaryError::UnknownAccount(_))
        ));
    }

    #[tokio::test]
    async fn test_unconfirmed_account_gets_no_challenge() {
        let s = setup().await;
        let pending = EnvelopeIdentity::from_seed(&[0x22; 32]);
        let account = Account::new(pending.public_identity(), None);
        s.store.create_account(&account).await.unwrap();

        assert!(matches!(
            s.auth.issue_challenge(&account.address).await,
            Err(NotaryError::UnknownAccount(_))
        ));
        let stored = s.store.get_account(&account.address).await.unwrap().unwrap();
        assert_eq!(stored.nonce, account.nonce);

        let lenient = SessionAuthenticator::new(s.store.clone(), s.server.clone(), false);
        assert!(lenient.issue_challenge(&account.address).await.is_ok());
    }

    #[tokio::test]
    async fn test_challenge_regenerates_nonce() {
        let s = setup().await;
        let address = s.client.address();
        let before = s.store.get_account(&address).await.unwrap().unwrap().nonce;

        let issued = open_challenge(&s).await;

        let after = s.store.get_account(&address).await.unwrap().unwrap().nonce;
        assert_ne!(before, after);
        assert_eq!(issued, after);
    }

    #[tokio::test]
    async fn test_response_is_one_shot() {
        let s = setup().await;
        let address = s.client.address();
        let n1 = open_challenge(&s).await;

        let t1 = s
            .auth
            .verify_challenge_response(&address, &respond(&s, n1), &fp())
            .await
            .unwrap();
        assert!(s.auth.is_authenticated(&address, &t1, &fp()).await.unwrap());

        assert!(matches!(
            s.auth
                .verify_challenge_response(&address, &respond(&s, n1), &fp())
                .await,
            Err(NotaryError::AuthFailure)
        ));
        // The failed replay did not disturb the session.
        assert!(s.auth.is_authenticated(&address, &t1, &fp()).await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_nonce_does_not_rotate() {
        let s = setup().await;
        let address = s.client.address();
        let n1 = open_challenge(&s).await;

        assert!(matches!(
            s.auth
                .verify_challenge_response(&address, &respond(&s, Nonce::generate()), &fp())
                .await,
            Err(NotaryError::AuthFailure)
        ));

        let stored = s.store.get_account(&address).await.unwrap().unwrap();
        assert_eq!(stored.nonce, n1);
    }

    #[tokio::test]
    async fn test_response_from_other_key_rejected() {
        let s = setup().await;
        let address = s.client.address();
        let n1 = open_challenge(&s).await;

        let impostor = EnvelopeIdentity::generate();
        let forged = SecureEnvelope::seal_json(
            &impostor,
            &s.server.public_identity(),
            &ChallengeBody { nonce: n1 },
        )
        .unwrap();

        assert!(matches!(
            s.auth.verify_challenge_response(&address, &forged, &fp()).await,
            Err(NotaryError::AuthFailure)
        ));
    }

    #[tokio::test]
    async fn test_token_bound_to_fingerprint() {
        let s = setup().await;
        let address = s.client.address();
        let n1 = open_challenge(&s).await;
        let t1 = s
            .auth
            .verify_challenge_response(&address, &respond(&s, n1), &fp())
            .await
            .unwrap();

        let elsewhere = Fingerprint::new("notary-client/1.0", "198.51.100.1");
        assert!(!s
            .auth
            .is_authenticated(&address, &t1, &elsewhere)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_consume_token_single_use() {
        let s = setup().await;
        let address = s.client.address();
        let n1 = open_challenge(&s).await;
        let t1 = s
            .auth
            .verify_challenge_response(&address, &respond(&s, n1), &fp())
            .await
            .unwrap();

        let account = s.store.get_account(&address).await.unwrap().unwrap();
        let session = s.auth.consume_token(account.clone(), &t1, fp()).await.unwrap();
        let t2 = session.token();
        assert_ne!(t1, t2);
        assert!(s.auth.is_authenticated(&address, &t2, &fp()).await.unwrap());

        // Spending t1 again, even against the stale account snapshot, fails.
        assert!(matches!(
            s.auth.consume_token(account, &t1, fp()).await,
            Err(NotaryError::AuthFailure)
        ));
    }

    #[tokio::test]
    async fn test_rotate_token_invalidates_previous() {
        let s = setup().await;
        let address = s.client.address();
        let n1 = open_challenge(&s).await;
        let t1 = s
            .auth
            .verify_challenge_response(&address, &respond(&s, n1), &fp())
            .await
            .unwrap();

        let t2 = s.auth.rotate_token(&address, &fp()).await.unwrap();

        assert!(!s.auth.is_authenticated(&address, &t1, &fp()).await.unwrap());
        assert!(s.auth.is_authenticated(&address, &t2, &fp()).await.unwrap());
    }

    #[tokio::test]
    async fn test_new_challenge_invalidates_token() {
        let s = setup().await;
        let address = s.client.address();
        let n1 = open_challenge(&s).await;
        let t1 = s
            .auth
            .verify_challenge_response(&address, &respond(&s, n1), &fp())
            .await
            .unwrap();

        open_challenge(&s).await;

        assert!(!s.auth.is_authenticated(&address, &t1, &fp()).await.unwrap());
    }
}
