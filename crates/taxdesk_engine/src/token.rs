use taxdesk_logging::desk_debug;

/// Source of the bearer token for a watch session. Asked once per session;
/// `None` means nobody is signed in.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Reads the token from an environment variable at lookup time, so a token
/// exported after startup is still picked up on retry.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait::async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn get_token(&self) -> Option<String> {
        let token = std::env::var(&self.var)
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        if token.is_none() {
            desk_debug!("no token in ${}", self.var);
        }
        token
    }
}
