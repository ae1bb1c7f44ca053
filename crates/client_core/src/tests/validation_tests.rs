use super::*;

use shared::domain::{PlatformType, RestaurantStatus, SocialId};

fn complete_draft() -> RegistrationDraft {
    RegistrationDraft {
        email: "a@b.com".into(),
        display_name: "An Nguyen".into(),
        phone_number: "0901234567".into(),
        user_name: "an_nguyen".into(),
        password: "secret1".into(),
        confirm_password: "secret1".into(),
    }
}

fn fields(result: Validation) -> Vec<&'static str> {
    result
        .expect_err("must be invalid")
        .into_iter()
        .map(|err| err.field)
        .collect()
}

#[test]
fn each_step_checks_only_its_own_fields() {
    let draft = RegistrationDraft {
        email: "a@b.com".into(),
        ..RegistrationDraft::default()
    };
    assert!(validate_registration_step(1, &draft).is_ok());
    assert_eq!(
        fields(validate_registration_step(2, &draft)),
        vec!["displayName", "phoneNumber"]
    );
    assert_eq!(
        fields(validate_registration_step(3, &draft)),
        vec!["userName", "password"]
    );
}

#[test]
fn final_step_checks_everything() {
    assert!(validate_registration_step(4, &complete_draft()).is_ok());

    let mut draft = complete_draft();
    draft.email = "not-an-email".into();
    draft.confirm_password = "different".into();
    assert_eq!(
        fields(validate_registration_step(4, &draft)),
        vec!["email", "confirmPassword"]
    );
}

#[test]
fn registration_body_matches_draft_rules() {
    let body = RegisterBody::from(complete_draft());
    assert!(validate_registration(&body).is_ok());

    let body = RegisterBody {
        phone_number: "12345".into(),
        ..body
    };
    assert_eq!(fields(validate_registration(&body)), vec!["phoneNumber"]);
}

#[test]
fn phone_accepts_leading_plus() {
    let mut draft = complete_draft();
    draft.phone_number = "+84901234567".into();
    assert!(validate_registration_step(2, &draft).is_ok());
}

#[test]
fn login_requires_both_fields() {
    let body = LoginBody {
        user_name: " ".into(),
        password: String::new(),
    };
    assert_eq!(fields(validate_login(&body)), vec!["userName", "password"]);
}

#[test]
fn review_rating_must_be_one_to_five() {
    let mut body = ReviewBody {
        rating: 5,
        content: "great".into(),
    };
    assert!(validate_review(&body).is_ok());
    body.rating = 0;
    assert_eq!(fields(validate_review(&body)), vec!["rating"]);
    body.rating = 3;
    body.content = "x".repeat(MAX_REVIEW_LEN + 1);
    assert_eq!(fields(validate_review(&body)), vec!["content"]);
}

#[test]
fn restaurant_needs_location_and_hours() {
    let mut body = CreateRestaurantBody {
        name: "Pho 24".into(),
        phone: "0281234567".into(),
        open_time: "07:00".into(),
        close_time: "22:30".into(),
        longitude_latitude: "106.7009,10.7769".into(),
        status: RestaurantStatus::Open,
    };
    assert!(validate_restaurant(&body).is_ok());

    body.open_time = "7am".into();
    body.longitude_latitude = String::new();
    assert_eq!(
        fields(validate_restaurant(&body)),
        vec!["openTime", "longitudeLatitude"]
    );
}

#[test]
fn social_url_must_be_absolute_http() {
    let mut body = UpdateSocialBody {
        id: SocialId::from("S1"),
        platform_type: PlatformType::Facebook,
        url: "https://facebook.com/pho24".into(),
    };
    assert!(validate_update_social(&body).is_ok());

    body.url = "facebook.com/pho24".into();
    assert_eq!(fields(validate_update_social(&body)), vec!["url"]);

    let create = CreateSocialBody {
        platform_type: PlatformType::Tiktok,
        url: "ftp://example.com".into(),
    };
    assert_eq!(fields(validate_create_social(&create)), vec!["url"]);
}
