use shared::{
    domain::{DishId, ReviewId, UserId},
    protocol::{Dish, DishReviews, ReviewBody},
};
use tracing::info;

use super::checked_write;
use crate::{
    data_sync::{DataSync, MutationRequest},
    error::{ClientError, RemoteError},
    keys,
    query_cache::QueryOptions,
    transport::ApiRequest,
    validation::validate_review,
};

pub const DEFAULT_RECOMMENDATION_LIMIT: u32 = 10;

pub struct Dishes<'a> {
    sync: &'a DataSync,
}

impl<'a> Dishes<'a> {
    pub(crate) fn new(sync: &'a DataSync) -> Self {
        Self { sync }
    }

    pub async fn info(&self, dish_id: &DishId) -> Result<Dish, RemoteError> {
        self.sync
            .query(
                keys::dish_info(dish_id),
                ApiRequest::get(format!("v1/dishes/{dish_id}")),
                QueryOptions::default(),
            )
            .await
    }

    pub async fn reviews(&self, dish_id: &DishId) -> Result<DishReviews, RemoteError> {
        self.sync
            .query(
                keys::dish_reviews(dish_id),
                ApiRequest::get(reviews_path(dish_id)),
                QueryOptions::default(),
            )
            .await
    }

    pub async fn view_count(&self, dish_id: &DishId) -> Result<u64, RemoteError> {
        self.sync
            .query(
                keys::dish_view_count(dish_id),
                ApiRequest::get(format!("v1/dishes/{dish_id}/viewers/count")),
                QueryOptions::default(),
            )
            .await
    }

    pub async fn recommendations(
        &self,
        user_id: Option<&UserId>,
        limit: u32,
    ) -> Result<Vec<Dish>, RemoteError> {
        let mut request = ApiRequest::get("v1/dishes/recommendations").query("limit", limit);
        if let Some(user_id) = user_id {
            request = request.query("userId", user_id);
        }
        self.sync
            .query(
                keys::dish_recommendation(user_id, limit),
                request,
                QueryOptions::default(),
            )
            .await
    }

    pub async fn create_review(
        &self,
        dish_id: &DishId,
        review: &ReviewBody,
    ) -> Result<(), ClientError> {
        info!(dish_id = %dish_id, rating = review.rating, "api: creating review");
        let request = ApiRequest::post(reviews_path(dish_id)).json(review)?;
        checked_write(
            self.sync,
            validate_review(review),
            review_write(request, dish_id),
        )
        .await
    }

    pub async fn update_review(
        &self,
        dish_id: &DishId,
        review_id: &ReviewId,
        review: &ReviewBody,
    ) -> Result<(), ClientError> {
        info!(dish_id = %dish_id, review_id = %review_id, "api: updating review");
        let request =
            ApiRequest::put(format!("{}/{review_id}", reviews_path(dish_id))).json(review)?;
        checked_write(
            self.sync,
            validate_review(review),
            review_write(request, dish_id),
        )
        .await
    }

    pub async fn delete_review(
        &self,
        dish_id: &DishId,
        review_id: &ReviewId,
    ) -> Result<(), ClientError> {
        info!(dish_id = %dish_id, review_id = %review_id, "api: deleting review");
        let request = ApiRequest::delete(format!("{}/{review_id}", reviews_path(dish_id)));
        checked_write(self.sync, Ok(()), review_write(request, dish_id)).await
    }
}

fn reviews_path(dish_id: &DishId) -> String {
    format!("v1/dishes/{dish_id}/reviews")
}

/// Review writes change both the review list and the dish score.
fn review_write(request: ApiRequest, dish_id: &DishId) -> MutationRequest {
    MutationRequest::new(request)
        .invalidates(keys::dish_reviews(dish_id))
        .invalidates(keys::dish_info(dish_id))
}
