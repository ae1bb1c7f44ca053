//! Cache keys for every cached resource.

use shared::domain::{DishId, RestaurantId, UserId};

use crate::{map::LatLng, query_cache::QueryKey};

pub const DISH_INFO: &str = "dish-info";
pub const DISH_REVIEWS: &str = "dish-reviews";
pub const DISH_VIEW_COUNT: &str = "dish-view-count";
pub const DISH_RECOMMENDATION: &str = "dish-recommendation";
pub const RESTAURANT_DETAIL: &str = "restaurant-detail";
pub const RESTAURANT_MENU: &str = "restaurant-menu";
pub const RESTAURANTS_NEARBY: &str = "restaurants-nearby";
pub const HEAD_RESTAURANTS: &str = "head-restaurants";
pub const RESTAURANT_SOCIALS: &str = "restaurant-socials";
pub const USER_SESSION: &str = "user-session";

const ANONYMOUS: &str = "anonymous";

pub fn dish_info(dish_id: &DishId) -> QueryKey {
    QueryKey::new(DISH_INFO).param(dish_id)
}

pub fn dish_reviews(dish_id: &DishId) -> QueryKey {
    QueryKey::new(DISH_REVIEWS).param(dish_id)
}

pub fn dish_view_count(dish_id: &DishId) -> QueryKey {
    QueryKey::new(DISH_VIEW_COUNT).param(dish_id)
}

pub fn dish_recommendation(user_id: Option<&UserId>, limit: u32) -> QueryKey {
    let user = user_id.map_or(ANONYMOUS, |id| id.as_str());
    QueryKey::new(DISH_RECOMMENDATION).param(user).param(limit)
}

pub fn restaurant_detail(restaurant_id: &RestaurantId) -> QueryKey {
    QueryKey::new(RESTAURANT_DETAIL).param(restaurant_id)
}

pub fn restaurant_menu(restaurant_id: &RestaurantId) -> QueryKey {
    QueryKey::new(RESTAURANT_MENU).param(restaurant_id)
}

pub fn restaurants_nearby(position: LatLng) -> QueryKey {
    QueryKey::new(RESTAURANTS_NEARBY)
        .param(position.lat)
        .param(position.lng)
}

pub fn head_restaurants() -> QueryKey {
    QueryKey::new(HEAD_RESTAURANTS)
}

pub fn restaurant_socials(restaurant_id: &RestaurantId) -> QueryKey {
    QueryKey::new(RESTAURANT_SOCIALS).param(restaurant_id)
}

pub fn user_session() -> QueryKey {
    QueryKey::new(USER_SESSION)
}
