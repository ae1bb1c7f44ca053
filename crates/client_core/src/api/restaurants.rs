use shared::{
    domain::RestaurantId,
    protocol::{CreateRestaurantBody, Dish, Restaurant},
};
use tracing::info;

use super::checked_write;
use crate::{
    data_sync::{DataSync, MutationRequest},
    error::{ClientError, RemoteError},
    keys,
    map::LatLng,
    query_cache::QueryOptions,
    transport::ApiRequest,
    validation::validate_restaurant,
};

pub struct Restaurants<'a> {
    sync: &'a DataSync,
}

impl<'a> Restaurants<'a> {
    pub(crate) fn new(sync: &'a DataSync) -> Self {
        Self { sync }
    }

    pub async fn detail(&self, restaurant_id: &RestaurantId) -> Result<Restaurant, RemoteError> {
        self.sync
            .query(
                keys::restaurant_detail(restaurant_id),
                ApiRequest::get(format!("v1/restaurants/{restaurant_id}")),
                QueryOptions::default(),
            )
            .await
    }

    pub async fn menu(&self, restaurant_id: &RestaurantId) -> Result<Vec<Dish>, RemoteError> {
        self.sync
            .query(
                keys::restaurant_menu(restaurant_id),
                ApiRequest::get(format!("v1/restaurants/{restaurant_id}/dishes")),
                QueryOptions::default(),
            )
            .await
    }

    pub async fn nearby(&self, position: LatLng) -> Result<Vec<Restaurant>, RemoteError> {
        let request = ApiRequest::get("v1/restaurants/nearby")
            .query("lat", position.lat)
            .query("lng", position.lng);
        self.sync
            .query(
                keys::restaurants_nearby(position),
                request,
                QueryOptions::default(),
            )
            .await
    }

    /// Restaurants owned by the signed-in head user.
    pub async fn managed(&self) -> Result<Vec<Restaurant>, RemoteError> {
        self.sync
            .query(
                keys::head_restaurants(),
                ApiRequest::get("v1/head/restaurants"),
                QueryOptions::default(),
            )
            .await
    }

    /// The response body is ignored; the managed list is refetched instead.
    pub async fn create(&self, body: &CreateRestaurantBody) -> Result<(), ClientError> {
        info!(name = %body.name, "api: creating restaurant");
        let request = ApiRequest::post("v1/head/restaurants").json(body)?;
        checked_write(
            self.sync,
            validate_restaurant(body),
            MutationRequest::new(request).invalidates(keys::head_restaurants()),
        )
        .await
    }
}
