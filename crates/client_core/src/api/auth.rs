use serde::de::IgnoredAny;
use serde_json::Value;
use shared::protocol::{LoginBody, RegisterBody, Session};
use tracing::info;

use super::checked_write;
use crate::{
    data_sync::{DataSync, MutationRequest},
    error::{ClientError, RemoteError},
    keys,
    query_cache::QueryOptions,
    transport::ApiRequest,
    validation::{validate_login, validate_registration},
};

pub struct Auth<'a> {
    sync: &'a DataSync,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(sync: &'a DataSync) -> Self {
        Self { sync }
    }

    /// Current session. A signed-out client gets a `NotAuthenticated` error;
    /// it is never retried.
    pub async fn session(&self) -> Result<Session, RemoteError> {
        self.sync
            .query(
                keys::user_session(),
                ApiRequest::get("v1/auth/session"),
                QueryOptions::with_retry(0),
            )
            .await
    }

    /// Signs in and drops every cached resource read under the old session.
    pub async fn login(&self, body: &LoginBody) -> Result<Session, ClientError> {
        validate_login(body)?;
        info!(user_name = %body.user_name, "api: logging in");
        let value: Value = self
            .sync
            .send(ApiRequest::post("v1/auth/login").json(body)?)
            .await?;
        // The server has switched sessions even if the body turns out unusable.
        self.sync.cache().clear().await;
        Ok(serde_json::from_value(value).map_err(RemoteError::malformed)?)
    }

    pub async fn register_user(&self, body: &RegisterBody) -> Result<(), ClientError> {
        self.register("v1/auth/register/user", body).await
    }

    pub async fn register_head(&self, body: &RegisterBody) -> Result<(), ClientError> {
        self.register("v1/auth/register/head", body).await
    }

    async fn register(&self, path: &str, body: &RegisterBody) -> Result<(), ClientError> {
        info!(path, user_name = %body.user_name, "api: registering account");
        let request = ApiRequest::post(path).json(body)?;
        checked_write(
            self.sync,
            validate_registration(body),
            MutationRequest::new(request),
        )
        .await
    }

    pub async fn logout(&self) -> Result<(), RemoteError> {
        info!("api: logging out");
        self.sync
            .send::<IgnoredAny>(ApiRequest::post("v1/auth/logout"))
            .await?;
        self.sync.cache().clear().await;
        Ok(())
    }
}
