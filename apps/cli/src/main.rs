use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use client_core::{
    api::DEFAULT_RECOMMENDATION_LIMIT,
    display::{self, StarRating, ALL_CATEGORIES},
    load_settings,
    map::{markers_for, restaurant_route, LatLng, MapView},
    FoodClient,
};
use shared::{
    domain::{DishId, RestaurantId, UserId},
    protocol::Dish,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dishes", about = "Browse dishes and restaurants from the command line")]
struct Cli {
    /// Settings file; defaults to ./client.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print raw records as JSON.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dish info, price, rating and reviews.
    Dish { id: String },
    /// A restaurant's menu, optionally filtered by category.
    Menu {
        restaurant_id: String,
        #[arg(long, default_value = ALL_CATEGORIES)]
        category: String,
    },
    /// Restaurants around a coordinate.
    Nearby { lat: f64, lng: f64 },
    /// Recommended dishes.
    Recommend {
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long, default_value_t = DEFAULT_RECOMMENDATION_LIMIT)]
        limit: u32,
    },
    /// The signed-in account, if any.
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref());
    let client = FoodClient::from_settings(&settings).context("failed to build client")?;

    match cli.command {
        Command::Dish { id } => {
            let dish_id = DishId::from(id);
            let dish = client
                .dishes()
                .info(&dish_id)
                .await
                .with_context(|| format!("failed to load dish {dish_id}"))?;
            let reviews = client
                .dishes()
                .reviews(&dish_id)
                .await
                .with_context(|| format!("failed to load reviews for dish {dish_id}"))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&dish)?);
                println!("{}", serde_json::to_string_pretty(&reviews)?);
                return Ok(());
            }
            print_dish(&dish);
            let views = client.dishes().view_count(&dish_id).await.ok();
            if let Some(views) = views {
                println!("  viewed {views} times");
            }
            for review in reviews.my_review.iter().chain(&reviews.other_reviews) {
                let author = review.reviewer_name.as_deref().unwrap_or("anonymous");
                println!(
                    "  [{}/5] {author}: {}",
                    review.rating,
                    display::truncate(&review.content, 80)
                );
            }
        }
        Command::Menu {
            restaurant_id,
            category,
        } => {
            let restaurant_id = RestaurantId::from(restaurant_id);
            let dishes = client
                .restaurants()
                .menu(&restaurant_id)
                .await
                .with_context(|| format!("failed to load menu of {restaurant_id}"))?;
            let selected = display::filter_by_category(&dishes, &category);
            info!(
                restaurant_id = %restaurant_id,
                total = dishes.len(),
                shown = selected.len(),
                "menu loaded"
            );
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&selected)?);
                return Ok(());
            }
            for dish in selected {
                print_dish(dish);
            }
        }
        Command::Nearby { lat, lng } => {
            let center = LatLng::new(lat, lng).context("coordinate out of range")?;
            let restaurants = client
                .restaurants()
                .nearby(center)
                .await
                .context("failed to load nearby restaurants")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&restaurants)?);
                return Ok(());
            }
            let view = MapView::new(center)
                .with_markers(markers_for(&restaurants))
                .with_loader(settings.map_loader()?);
            println!(
                "{} restaurants around {} ({} on the map, zoom {})",
                restaurants.len(),
                center.to_lng_lat(),
                view.markers.len(),
                view.zoom
            );
            match &view.loader {
                Some(loader) => info!(host = ?loader.script_url().host_str(), "map script ready"),
                None => println!("  (set GOOGLE_MAPS_API_KEY to enable the map)"),
            }
            for restaurant in &restaurants {
                let stars = StarRating::from_average(restaurant.score_overview.average_rating);
                println!(
                    "  {} ({}{} stars) {} - {}  {}",
                    restaurant.name,
                    stars.full,
                    if stars.half { ".5" } else { "" },
                    restaurant.open_time,
                    restaurant.close_time,
                    restaurant_route(&restaurant.restaurant_id)
                );
            }
        }
        Command::Recommend { user_id, limit } => {
            let user_id = user_id.map(UserId::from);
            let dishes = client
                .dishes()
                .recommendations(user_id.as_ref(), limit)
                .await
                .context("failed to load recommendations")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&dishes)?);
                return Ok(());
            }
            for dish in &dishes {
                print_dish(dish);
            }
        }
        Command::Session => match client.auth().session().await {
            Ok(session) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&session)?);
                } else {
                    println!(
                        "signed in as {} <{}> ({:?})",
                        session.display_name, session.email, session.role
                    );
                }
            }
            Err(err) if err.kind == shared::error::ErrorKind::NotAuthenticated => {
                println!("not signed in");
            }
            Err(err) => return Err(err).context("failed to load session"),
        },
    }

    Ok(())
}

fn print_dish(dish: &Dish) {
    let tag = display::price_tag(dish, Utc::now());
    let stars = StarRating::from_average(dish.score_overview.average_rating);
    let price = match &tag.promotional {
        Some(promotional) => format!("{promotional} (was {})", tag.regular),
        None => tag.regular.clone(),
    };
    println!(
        "{} [{}] {price}  {}{} stars",
        dish.name,
        dish.dish_id,
        stars.full,
        if stars.half { ".5" } else { "" }
    );
}
