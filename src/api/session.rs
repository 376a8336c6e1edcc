//! Purpose: Track the signed-in identity used for ownership checks and view gating.
//! Exports: `SessionContext`.
//! Role: Single writer of the current identity (refresh/login/logout); everything else reads.
//! Invariants: Holds at most one identity, always replaced wholesale, never mutated in place.
//! Invariants: A failed identity check degrades to "no identity"; it is never escalated.
#![allow(clippy::result_large_err)]

use std::sync::Arc;

use serde_json::Value;

use super::gateway::{ApiResult, RequestGateway};
use super::model::{Credentials, Identity, SignupForm};
use crate::core::error::{Error, ErrorKind};

const ME_PATH: &str = "/api/me";
const LOGIN_PATH: &str = "/api/login";
const LOGOUT_PATH: &str = "/api/logout";
const USERS_PATH: &str = "/api/users";

pub struct SessionContext {
    gateway: RequestGateway,
    identity: Option<Arc<Identity>>,
}

impl SessionContext {
    pub fn new(gateway: RequestGateway) -> Self {
        Self {
            gateway,
            identity: None,
        }
    }

    pub fn current(&self) -> Option<&Identity> {
        self.identity.as_deref()
    }

    /// Shared handle to the current identity; stays valid after later replacements.
    pub fn snapshot(&self) -> Option<Arc<Identity>> {
        self.identity.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Guard for hosts that must redirect when nobody is signed in.
    pub fn require(&self) -> ApiResult<Arc<Identity>> {
        self.identity.clone().ok_or_else(|| {
            Error::new(ErrorKind::Auth)
                .with_message("not signed in")
                .with_hint("Log in first.")
        })
    }

    /// Re-checks the identity with the service. Any failure clears it.
    pub fn refresh(&mut self) -> Option<Arc<Identity>> {
        match self.gateway.get_data::<Identity>(ME_PATH) {
            Ok(Some(identity)) => {
                self.identity = Some(Arc::new(identity));
            }
            Ok(None) => {
                tracing::debug!("identity check returned no user");
                self.identity = None;
            }
            Err(err) => {
                tracing::debug!(error = %err, "identity check failed; clearing identity");
                self.identity = None;
            }
        }
        self.identity.clone()
    }

    pub fn login(&mut self, credentials: &Credentials) -> ApiResult<Arc<Identity>> {
        if let Err(err) = self.gateway.post(LOGIN_PATH, credentials) {
            self.identity = None;
            return Err(err.into_kind(ErrorKind::Auth));
        }
        self.refresh().ok_or_else(|| {
            Error::new(ErrorKind::Auth)
                .with_message("login accepted but no identity was returned")
                .with_hint("Check that the service sets a session cookie.")
        })
    }

    pub fn logout(&mut self) -> ApiResult<()> {
        self.gateway.post_empty(LOGOUT_PATH)?;
        self.identity = None;
        Ok(())
    }

    /// Registers a new account. Does not sign in.
    pub fn signup(&self, form: &SignupForm) -> ApiResult<Option<Value>> {
        self.gateway.post(USERS_PATH, form)?.into_data()
    }

    pub fn signup_and_login(&mut self, form: &SignupForm) -> ApiResult<Arc<Identity>> {
        self.signup(form)?;
        self.login(&form.credentials())
    }
}
