//! The authenticated-request pipeline.
//!
//! Every authenticated operation passes through the same fixed sequence of
//! steps before its handler runs:
//!
//! ```text
//! ResolveAccount -> OpenEnvelope -> VerifySession
//! ```
//!
//! Each step takes the [`RequestContext`] by value and returns it enriched,
//! or fails the request. Only a context that passed every step becomes an
//! [`Authorized`] request.

use std::fmt;
use std::sync::Arc;

use notary_core::{Address, Fingerprint, SessionToken};
use notary_envelope::{EnvelopeIdentity, SecureEnvelope};
use notary_store::{Account, AccountStore};

use crate::error::{auth_failure, Result};
use crate::session::{Session, SessionAuthenticator};

/// A pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Look up the claimed account.
    ResolveAccount,
    /// Open the request envelope against the account's key.
    OpenEnvelope,
    /// Check and spend the session token.
    VerifySession,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ResolveAccount => "resolve_account",
            Step::OpenEnvelope => "open_envelope",
            Step::VerifySession => "verify_session",
        };
        f.write_str(name)
    }
}

const STEPS: [Step; 3] = [Step::ResolveAccount, Step::OpenEnvelope, Step::VerifySession];

/// An inbound authenticated request, as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct Request {
    /// The address the caller claims.
    pub address: Address,
    /// The sealed request body.
    pub envelope: SecureEnvelope,
    /// The session token the caller presented.
    pub token: SessionToken,
    /// The caller's channel fingerprint.
    pub fingerprint: Fingerprint,
}

/// Per-request state threaded through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request: Request,
    pub account: Option<Account>,
    pub message: Option<Vec<u8>>,
    pub session: Option<Session>,
}

impl From<Request> for RequestContext {
    fn from(request: Request) -> Self {
        Self {
            request,
            account: None,
            message: None,
            session: None,
        }
    }
}

impl RequestContext {
    fn finish(self) -> Result<Authorized> {
        match (self.session, self.message) {
            (Some(session), Some(message)) => Ok(Authorized { session, message }),
            _ => Err(auth_failure("pipeline incomplete")),
        }
    }
}

/// A request that passed every step.
#[derive(Debug, Clone)]
pub struct Authorized {
    /// The authenticated session, carrying the rotated token.
    pub session: Session,
    /// The opened request body.
    pub message: Vec<u8>,
}

/// Runs [`Step`]s in order over a request.
pub struct Pipeline {
    accounts: Arc<dyn AccountStore>,
    identity: Arc<EnvelopeIdentity>,
    sessions: Arc<SessionAuthenticator>,
    require_confirmed: bool,
}

impl Pipeline {
    /// Build a pipeline.
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        identity: Arc<EnvelopeIdentity>,
        sessions: Arc<SessionAuthenticator>,
        require_confirmed: bool,
    ) -> Self {
        Self {
            accounts,
            identity,
            sessions,
            require_confirmed,
        }
    }

    /// The steps every request goes through, in order.
    pub fn steps(&self) -> &'static [Step] {
        &STEPS
    }

    /// Authenticate a request.
    ///
    /// On success the presented token has been spent and the session holds
    /// its replacement.
    #[tracing::instrument(skip_all, fields(address = %request.address))]
    pub async fn run(&self, request: Request) -> Result<Authorized> {
        let mut ctx = RequestContext::from(request);
        for step in self.steps() {
            ctx = self.apply(*step, ctx).await?;
        }
        ctx.finish()
    }

    async fn apply(&self, step: Step, ctx: RequestContext) -> Result<RequestContext> {
        match step {
            Step::ResolveAccount => self.resolve_account(ctx).await,
            Step::OpenEnvelope => self.open_envelope(ctx),
            Step::VerifySession => self.verify_session(ctx).await,
        }
    }

    async fn resolve_account(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        let account = self
            .accounts
            .get_account(&ctx.request.address)
            .await?
            .ok_or_else(|| auth_failure("unknown account"))?;

        if self.require_confirmed && !account.confirmed {
            return Err(auth_failure("account not confirmed"));
        }

        ctx.account = Some(account);
        Ok(ctx)
    }

    fn open_envelope(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        let account = ctx
            .account
            .as_ref()
            .ok_or_else(|| auth_failure("account not resolved"))?;

        let message = ctx
            .request
            .envelope
            .open(&self.identity, &account.public_key)
            .map_err(|_| auth_failure("envelope rejected"))?;

        ctx.message = Some(message);
        Ok(ctx)
    }

    async fn verify_session(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        let account = ctx
            .account
            .take()
            .ok_or_else(|| auth_failure("account not resolved"))?;

        let session = self
            .sessions
            .consume_token(account, &ctx.request.token, ctx.request.fingerprint.clone())
            .await?;

        ctx.account = Some(session.account().clone());
        ctx.session = Some(session);
        Ok(ctx)
    }
}
