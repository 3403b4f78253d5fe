use roost_types::api::{CreateReviewRequest, RegisterRequest};
use roost_types::models::ImageRef;

use crate::error::ApiError;

/// Every failed check is collected and reported in one message, joined with
/// ", ", so a form round-trip shows the full list at once.
pub fn listing(
    title: &str,
    description: &str,
    location: &str,
    price: i64,
    images: &[ImageRef],
) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if title.trim().is_empty() {
        errors.push("title must not be empty".to_string());
    }
    if description.trim().is_empty() {
        errors.push("description must not be empty".to_string());
    }
    if location.trim().is_empty() {
        errors.push("location must not be empty".to_string());
    }
    if price < 0 {
        errors.push("price must be greater than or equal to 0".to_string());
    }
    if images
        .iter()
        .any(|image| image.url.trim().is_empty() || image.filename.trim().is_empty())
    {
        errors.push("images need both a url and a filename".to_string());
    }
    if images
        .iter()
        .any(|image| image.filename.split(['/', '\\']).any(|segment| segment == ".."))
    {
        errors.push("image filenames must not traverse directories".to_string());
    }
    let mut seen = std::collections::HashSet::new();
    if images.iter().any(|image| !seen.insert(image.filename.as_str())) {
        errors.push("image filenames must be unique".to_string());
    }

    collect(errors)
}

pub fn review(req: &CreateReviewRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if req.body.trim().is_empty() {
        errors.push("body must not be empty".to_string());
    }
    if !(1..=5).contains(&req.rating) {
        errors.push("rating must be between 1 and 5".to_string());
    }

    collect(errors)
}

pub fn registration(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    let username_len = req.username.chars().count();
    if !(3..=32).contains(&username_len) {
        errors.push("username must be between 3 and 32 characters".to_string());
    }
    if !req.email.contains('@') || req.email.len() < 3 {
        errors.push("email must be a valid email address".to_string());
    }
    if req.password.chars().count() < 8 {
        errors.push("password must be at least 8 characters".to_string());
    }

    collect(errors)
}

fn collect(errors: Vec<String>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(url: &str, filename: &str) -> ImageRef {
        ImageRef {
            url: url.to_string(),
            filename: filename.to_string(),
        }
    }

    #[test]
    fn valid_listing_passes() {
        assert!(listing("Hilltop", "Great views", "Bengaluru", 100, &[image("https://x/a.png", "a.png")]).is_ok());
        assert!(listing("Free Spot", "No charge", "Pune", 0, &[]).is_ok());
    }

    #[test]
    fn listing_failures_join_with_commas() {
        let err = listing("", "", "somewhere", -5, &[]).unwrap_err();
        let ApiError::Validation(message) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(
            message,
            "title must not be empty, description must not be empty, price must be greater than or equal to 0"
        );
    }

    #[test]
    fn listing_rejects_traversing_image_names() {
        let err = listing("T", "D", "L", 1, &[image("https://x/a.png", "../a.png")]).unwrap_err();
        let ApiError::Validation(message) = err else {
            panic!("expected a validation error");
        };
        assert!(message.contains("traverse"));
    }

    #[test]
    fn listing_rejects_repeated_image_filenames() {
        let images = [image("https://x/a.png", "a.png"), image("https://y/a.png", "a.png")];
        let ApiError::Validation(message) = listing("T", "D", "L", 1, &images).unwrap_err() else {
            panic!("expected a validation error");
        };
        assert_eq!(message, "image filenames must be unique");
    }

    #[test]
    fn review_rating_must_be_in_range() {
        let ok = CreateReviewRequest { body: "Nice".to_string(), rating: 5 };
        assert!(review(&ok).is_ok());

        for rating in [0, 6, -1] {
            let bad = CreateReviewRequest { body: "Nice".to_string(), rating };
            assert!(review(&bad).is_err());
        }

        let empty = CreateReviewRequest { body: "   ".to_string(), rating: 3 };
        let ApiError::Validation(message) = review(&empty).unwrap_err() else {
            panic!("expected a validation error");
        };
        assert_eq!(message, "body must not be empty");
    }

    #[test]
    fn registration_bounds() {
        let good = RegisterRequest {
            username: "sam".to_string(),
            email: "sam@example.com".to_string(),
            password: "longenough".to_string(),
        };
        assert!(registration(&good).is_ok());

        let bad = RegisterRequest {
            username: "ab".to_string(),
            email: "nope".to_string(),
            password: "short".to_string(),
        };
        let ApiError::Validation(message) = registration(&bad).unwrap_err() else {
            panic!("expected a validation error");
        };
        assert_eq!(
            message,
            "username must be between 3 and 32 characters, email must be a valid email address, password must be at least 8 characters"
        );
    }
}
