use super::ApiError;
use crate::models::Category;

const MIN_STARTING_BID: f64 = 1.00;
const MAX_STARTING_BID: f64 = 100_000_000.00;

pub fn validate_listing_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid listing ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

pub fn validate_title(title: &str) -> Result<&str, ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Title cannot be empty"));
    }
    if trimmed.chars().count() > 100 {
        return Err(ApiError::validation("Title must be 100 characters or less"));
    }
    Ok(trimmed)
}

pub fn validate_description(description: &str) -> Result<&str, ApiError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Description cannot be empty"));
    }
    Ok(trimmed)
}

pub fn validate_starting_bid(amount: f64) -> Result<f64, ApiError> {
    if !amount.is_finite() {
        return Err(ApiError::validation("Starting bid must be a number"));
    }
    if !(MIN_STARTING_BID..=MAX_STARTING_BID).contains(&amount) {
        return Err(ApiError::validation(format!(
            "Starting bid must be between {:.2} and {:.2}",
            MIN_STARTING_BID, MAX_STARTING_BID
        )));
    }
    Ok(amount)
}

pub fn validate_bid_amount(amount: f64) -> Result<f64, ApiError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::validation("Bid amount must be a positive number"));
    }
    Ok(amount)
}

pub fn validate_category(name: &str) -> Result<Category, ApiError> {
    name.parse::<Category>()
        .map_err(|e| ApiError::validation(e.to_string()))
}

pub fn validate_comment_text(text: &str) -> Result<&str, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Comment cannot be empty"));
    }
    if trimmed.chars().count() > 2000 {
        return Err(ApiError::validation(
            "Comment must be 2000 characters or less",
        ));
    }
    Ok(trimmed)
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    let length = trimmed.chars().count();
    if length < 3 {
        return Err(ApiError::validation(
            "Username must be at least 3 characters",
        ));
    }
    if length > 100 {
        return Err(ApiError::validation(
            "Username must be 100 characters or less",
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "Username can only contain letters, numbers, hyphens, and underscores",
        ));
    }
    Ok(trimmed)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();
    let looks_valid = trimmed.len() >= 3
        && trimmed.contains('@')
        && !trimmed.starts_with('@')
        && !trimmed.ends_with('@');
    if !looks_valid {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(trimmed)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_listing_id() {
        assert!(validate_listing_id(1).is_ok());
        assert!(validate_listing_id(12345).is_ok());
        assert!(validate_listing_id(0).is_err());
        assert!(validate_listing_id(-1).is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Vintage lamp").is_ok());
        assert_eq!(validate_title("  padded  ").unwrap(), "padded");
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title("a".repeat(101).as_str()).is_err());
    }

    // Limits count characters, not bytes
    #[test]
    fn test_length_limits_count_characters() {
        assert!(validate_title("é".repeat(100).as_str()).is_ok());
        assert!(validate_title("é".repeat(101).as_str()).is_err());
        assert!(validate_comment_text("日".repeat(2000).as_str()).is_ok());
        assert!(validate_comment_text("日".repeat(2001).as_str()).is_err());
        assert!(validate_username("ü".repeat(100).as_str()).is_ok());
        assert!(validate_username("ü".repeat(101).as_str()).is_err());
    }

    #[test]
    fn test_validate_starting_bid() {
        assert!(validate_starting_bid(1.00).is_ok());
        assert!(validate_starting_bid(99.99).is_ok());
        assert!(validate_starting_bid(100_000_000.00).is_ok());
        assert!(validate_starting_bid(0.99).is_err());
        assert!(validate_starting_bid(0.0).is_err());
        assert!(validate_starting_bid(-5.0).is_err());
        assert!(validate_starting_bid(f64::NAN).is_err());
        assert!(validate_starting_bid(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_bid_amount() {
        assert!(validate_bid_amount(0.01).is_ok());
        assert!(validate_bid_amount(500.0).is_ok());
        assert!(validate_bid_amount(0.0).is_err());
        assert!(validate_bid_amount(-1.0).is_err());
        assert!(validate_bid_amount(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_category() {
        assert!(validate_category("Electronics").is_ok());
        assert!(validate_category("Home").is_ok());
        assert!(validate_category("Boats").is_err());
        assert!(validate_category("electronics").is_err());
    }

    #[test]
    fn test_validate_comment_text() {
        assert!(validate_comment_text("Nice lamp!").is_ok());
        assert!(validate_comment_text("").is_err());
        assert!(validate_comment_text("   ").is_err());
        assert!(validate_comment_text("a".repeat(2001).as_str()).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("bob_42").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@start").is_err());
        assert!(validate_email("end@").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }
}
