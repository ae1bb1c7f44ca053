use shared::{
    domain::{RestaurantId, SocialId},
    protocol::{CreateSocialBody, SocialLink, UpdateSocialBody},
};
use tracing::info;

use super::checked_write;
use crate::{
    data_sync::{DataSync, MutationRequest},
    error::{ClientError, RemoteError},
    keys,
    query_cache::QueryOptions,
    transport::ApiRequest,
    validation::{validate_create_social, validate_update_social},
};

pub struct Socials<'a> {
    sync: &'a DataSync,
}

impl<'a> Socials<'a> {
    pub(crate) fn new(sync: &'a DataSync) -> Self {
        Self { sync }
    }

    pub async fn list(&self, restaurant_id: &RestaurantId) -> Result<Vec<SocialLink>, RemoteError> {
        self.sync
            .query(
                keys::restaurant_socials(restaurant_id),
                ApiRequest::get(socials_path(restaurant_id)),
                QueryOptions::default(),
            )
            .await
    }

    pub async fn create(
        &self,
        restaurant_id: &RestaurantId,
        body: &CreateSocialBody,
    ) -> Result<(), ClientError> {
        info!(
            restaurant_id = %restaurant_id,
            platform = body.platform_type.label(),
            "api: adding social link"
        );
        let request = ApiRequest::post(socials_path(restaurant_id)).json(body)?;
        checked_write(
            self.sync,
            validate_create_social(body),
            social_write(request, restaurant_id),
        )
        .await
    }

    pub async fn update(
        &self,
        restaurant_id: &RestaurantId,
        body: &UpdateSocialBody,
    ) -> Result<(), ClientError> {
        info!(restaurant_id = %restaurant_id, social_id = %body.id, "api: updating social link");
        let path = format!("{}/{}", socials_path(restaurant_id), body.id);
        let request = ApiRequest::put(path).json(body)?;
        checked_write(
            self.sync,
            validate_update_social(body),
            social_write(request, restaurant_id),
        )
        .await
    }

    pub async fn delete(
        &self,
        restaurant_id: &RestaurantId,
        social_id: &SocialId,
    ) -> Result<(), ClientError> {
        info!(restaurant_id = %restaurant_id, social_id = %social_id, "api: deleting social link");
        let request = ApiRequest::delete(format!("{}/{social_id}", socials_path(restaurant_id)));
        checked_write(self.sync, Ok(()), social_write(request, restaurant_id)).await
    }
}

fn socials_path(restaurant_id: &RestaurantId) -> String {
    format!("v1/restaurants/{restaurant_id}/socials")
}

fn social_write(request: ApiRequest, restaurant_id: &RestaurantId) -> MutationRequest {
    MutationRequest::new(request).invalidates(keys::restaurant_socials(restaurant_id))
}
