//! Field rules checked before any request body leaves the client.

use once_cell::sync::Lazy;
use regex::Regex;
use shared::protocol::{
    CreateRestaurantBody, CreateSocialBody, LoginBody, RegisterBody, ReviewBody, UpdateSocialBody,
};
use url::Url;

use crate::{error::ValidationError, map::LatLng, registration::RegistrationDraft};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_DISPLAY_NAME_LEN: usize = 50;
pub const MAX_REVIEW_LEN: usize = 1000;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{10,11}$").expect("phone regex"));
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]{3,32}$").expect("username regex"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("time regex"));

pub type Validation = Result<(), Vec<ValidationError>>;

#[derive(Default)]
struct Checks {
    errors: Vec<ValidationError>,
}

impl Checks {
    fn require(&mut self, ok: bool, field: &'static str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(ValidationError::new(field, message));
        }
        self
    }

    fn finish(self) -> Validation {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn check_email(checks: &mut Checks, email: &str) {
    checks.require(EMAIL_RE.is_match(email.trim()), "email", "Invalid email address");
}

fn check_profile(checks: &mut Checks, display_name: &str, phone_number: &str) {
    let display_name = display_name.trim();
    checks
        .require(!display_name.is_empty(), "displayName", "Display name is required")
        .require(
            display_name.chars().count() <= MAX_DISPLAY_NAME_LEN,
            "displayName",
            "Display name is too long",
        )
        .require(
            PHONE_RE.is_match(phone_number.trim()),
            "phoneNumber",
            "Phone number must have 10 or 11 digits",
        );
}

fn check_credentials(checks: &mut Checks, user_name: &str, password: &str, confirm: &str) {
    checks
        .require(
            USERNAME_RE.is_match(user_name),
            "userName",
            "Username must be 3-32 letters, digits, '_' or '.'",
        )
        .require(
            password.chars().count() >= MIN_PASSWORD_LEN,
            "password",
            "Password must be at least 6 characters",
        )
        .require(password == confirm, "confirmPassword", "Passwords do not match");
}

/// Checks the fields owned by one registration step; the final step (and
/// anything past it) checks everything.
pub fn validate_registration_step(step: u8, draft: &RegistrationDraft) -> Validation {
    let mut checks = Checks::default();
    match step {
        1 => check_email(&mut checks, &draft.email),
        2 => check_profile(&mut checks, &draft.display_name, &draft.phone_number),
        3 => check_credentials(
            &mut checks,
            &draft.user_name,
            &draft.password,
            &draft.confirm_password,
        ),
        _ => {
            check_email(&mut checks, &draft.email);
            check_profile(&mut checks, &draft.display_name, &draft.phone_number);
            check_credentials(
                &mut checks,
                &draft.user_name,
                &draft.password,
                &draft.confirm_password,
            );
        }
    }
    checks.finish()
}

pub fn validate_registration(body: &RegisterBody) -> Validation {
    let mut checks = Checks::default();
    check_email(&mut checks, &body.email);
    check_profile(&mut checks, &body.display_name, &body.phone_number);
    check_credentials(
        &mut checks,
        &body.user_name,
        &body.password,
        &body.confirm_password,
    );
    checks.finish()
}

pub fn validate_login(body: &LoginBody) -> Validation {
    let mut checks = Checks::default();
    checks
        .require(!body.user_name.trim().is_empty(), "userName", "Username is required")
        .require(!body.password.is_empty(), "password", "Password is required");
    checks.finish()
}

pub fn validate_review(body: &ReviewBody) -> Validation {
    let mut checks = Checks::default();
    checks
        .require(
            (1..=5).contains(&body.rating),
            "rating",
            "Rating must be between 1 and 5",
        )
        .require(
            body.content.chars().count() <= MAX_REVIEW_LEN,
            "content",
            "Review is too long",
        );
    checks.finish()
}

pub fn validate_restaurant(body: &CreateRestaurantBody) -> Validation {
    let mut checks = Checks::default();
    checks
        .require(!body.name.trim().is_empty(), "name", "Name is required")
        .require(
            PHONE_RE.is_match(body.phone.trim()),
            "phone",
            "Phone number must have 10 or 11 digits",
        )
        .require(
            TIME_RE.is_match(&body.open_time),
            "openTime",
            "Open time must be HH:MM",
        )
        .require(
            TIME_RE.is_match(&body.close_time),
            "closeTime",
            "Close time must be HH:MM",
        )
        .require(
            LatLng::parse_lng_lat(&body.longitude_latitude).is_some(),
            "longitudeLatitude",
            "Select a location on the map",
        );
    checks.finish()
}

fn check_social_url(checks: &mut Checks, url: &str) {
    let valid = Url::parse(url.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false);
    checks.require(valid, "url", "Url must be an absolute http(s) link");
}

pub fn validate_create_social(body: &CreateSocialBody) -> Validation {
    let mut checks = Checks::default();
    check_social_url(&mut checks, &body.url);
    checks.finish()
}

pub fn validate_update_social(body: &UpdateSocialBody) -> Validation {
    let mut checks = Checks::default();
    checks.require(!body.id.as_str().is_empty(), "id", "Social id is required");
    check_social_url(&mut checks, &body.url);
    checks.finish()
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
