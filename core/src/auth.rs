//! Login, logout and the current user.

use reqwest::Method;

use crate::error::ApiResult;
use crate::gateway::HttpGateway;
use crate::models::AuthResponse;
use crate::models::LoginRequest;
use crate::models::MaybeEnveloped;
use crate::models::RegisterRequest;
use crate::models::User;
use crate::resource::ResourceSlot;

#[derive(Debug)]
pub struct AuthApi {
    gateway: HttpGateway,
    user: ResourceSlot<User>,
}

impl AuthApi {
    pub fn new(gateway: HttpGateway) -> Self {
        Self {
            gateway,
            user: ResourceSlot::new(),
        }
    }

    pub fn user(&self) -> &ResourceSlot<User> {
        &self.user
    }

    /// Exchanges credentials for a session token and stores it.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.user
            .run(async {
                let body: MaybeEnveloped<AuthResponse> =
                    self.gateway.post("/auth/login", &request).await?;
                Ok(self.establish(body.into_inner()))
            })
            .await
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> ApiResult<User> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        };
        self.user
            .run(async {
                let body: MaybeEnveloped<AuthResponse> =
                    self.gateway.post("/auth/register", &request).await?;
                Ok(self.establish(body.into_inner()))
            })
            .await
    }

    /// Ends the session. The server call is best effort; the local session is
    /// cleared regardless of its outcome.
    pub async fn logout(&self) {
        if self.gateway.session().is_authenticated()
            && let Err(err) = self
                .gateway
                .request(Method::POST, "/auth/logout", None)
                .await
        {
            tracing::warn!("server-side logout failed: {err}");
        }
        self.gateway.session().logout();
        self.user.reset();
    }

    pub async fn me(&self) -> ApiResult<User> {
        self.user
            .run(async {
                let body: MaybeEnveloped<User> = self.gateway.get("/auth/me").await?;
                Ok(body.into_inner())
            })
            .await
    }

    fn establish(&self, auth: AuthResponse) -> User {
        self.gateway.session().login(auth.token);
        auth.user
    }
}
