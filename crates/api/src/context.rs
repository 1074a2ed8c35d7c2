use nesk_auth::Principal;

/// Per-request context built by the session middleware.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    principal: Principal,
    ip_address: Option<String>,
    session_token: Option<String>,
}

impl RequestContext {
    pub fn new(
        principal: Principal,
        ip_address: Option<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            principal,
            ip_address,
            session_token,
        }
    }

    /// Context for calls made outside HTTP (tests, jobs).
    pub fn for_principal(principal: Principal) -> Self {
        Self {
            principal,
            ..Self::default()
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn ip_address(&self) -> Option<String> {
        self.ip_address.clone()
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}
