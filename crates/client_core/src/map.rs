//! Map view model: center, restaurant markers, and marker activation.

use shared::{
    domain::RestaurantId,
    protocol::{MapMarker, Restaurant},
};
use tracing::debug;
use url::Url;

pub const DEFAULT_ZOOM: u8 = 16;
pub const MAP_LIBRARIES: &str = "places";

/// Script the map widget loads before rendering: the maps base url carrying
/// the api key and the places library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLoader {
    script_url: Url,
}

impl MapLoader {
    pub fn new(mut base: Url, api_key: &str) -> Self {
        base.query_pairs_mut()
            .append_pair("key", api_key)
            .append_pair("libraries", MAP_LIBRARIES);
        Self { script_url: base }
    }

    pub fn script_url(&self) -> &Url {
        &self.script_url
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng);
        in_range.then_some(Self { lat, lng })
    }

    /// Parses the `"lng,lat"` form used by restaurant records.
    pub fn parse_lng_lat(raw: &str) -> Option<Self> {
        let (lng, lat) = raw.split_once(',')?;
        let lng = lng.trim().parse::<f64>().ok()?;
        let lat = lat.trim().parse::<f64>().ok()?;
        Self::new(lat, lng)
    }

    pub fn to_lng_lat(self) -> String {
        format!("{},{}", self.lng, self.lat)
    }
}

impl From<&MapMarker> for LatLng {
    fn from(marker: &MapMarker) -> Self {
        Self {
            lat: marker.lat,
            lng: marker.lng,
        }
    }
}

/// Receives navigation requests when a marker is activated.
pub trait MarkerNavigator {
    fn navigate(&mut self, route: &str);
}

impl<F> MarkerNavigator for F
where
    F: FnMut(&str),
{
    fn navigate(&mut self, route: &str) {
        self(route)
    }
}

pub fn restaurant_route(restaurant_id: &RestaurantId) -> String {
    format!("/restaurant-detail/{restaurant_id}")
}

/// Markers for restaurants with a parseable location; others are skipped.
pub fn markers_for(restaurants: &[Restaurant]) -> Vec<MapMarker> {
    restaurants
        .iter()
        .filter_map(|restaurant| {
            let position = LatLng::parse_lng_lat(&restaurant.longitude_latitude)?;
            Some(MapMarker {
                lat: position.lat,
                lng: position.lng,
                restaurant_id: Some(restaurant.restaurant_id.clone()),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: LatLng,
    pub markers: Vec<MapMarker>,
    pub zoom: u8,
    /// None when no maps key is configured; the view then renders as a list.
    pub loader: Option<MapLoader>,
}

impl MapView {
    pub fn new(center: LatLng) -> Self {
        Self {
            center,
            markers: Vec::new(),
            zoom: DEFAULT_ZOOM,
            loader: None,
        }
    }

    pub fn with_loader(mut self, loader: Option<MapLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_markers(mut self, markers: Vec<MapMarker>) -> Self {
        self.markers = markers;
        self
    }

    /// Activates the marker at `index`. Markers tied to a restaurant produce
    /// a navigation to its detail page; anything else is ignored.
    pub fn activate(&self, index: usize, navigator: &mut impl MarkerNavigator) -> Option<String> {
        let marker = self.markers.get(index)?;
        let restaurant_id = marker.restaurant_id.as_ref()?;
        let route = restaurant_route(restaurant_id);
        debug!(index, route = %route, "map: marker activated");
        navigator.navigate(&route);
        Some(route)
    }
}
