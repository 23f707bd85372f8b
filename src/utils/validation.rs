use crate::error::ApiError;
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_JOURNAL_TITLE_LEN: usize = 255;
pub const MAX_JOURNAL_CONTENT_LEN: usize = 10_000;
pub const MAX_TAGS: usize = 20;
pub const MIN_PASSWORD_LEN: usize = 8;

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("static regex"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex")
    })
}

fn due_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("static regex"))
}

/// Strip HTML tags and collapse runs of whitespace.
pub fn sanitize_text(input: &str) -> String {
    let stripped = html_tag_re().replace_all(input, "");
    whitespace_re().replace_all(stripped.trim(), " ").into_owned()
}

/// Sanitized, non-empty name of at most `MAX_NAME_LEN` characters.
pub fn validate_name(field: &str, name: &str) -> Result<String, ApiError> {
    let cleaned = sanitize_text(name);
    if cleaned.is_empty() {
        return Err(ApiError::validation(format!("{} is required", field)));
    }
    if cleaned.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LEN
        )));
    }
    Ok(cleaned)
}

pub fn validate_description(description: &str) -> Result<String, ApiError> {
    let cleaned = sanitize_text(description);
    if cleaned.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::validation(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(cleaned)
}

/// `#RRGGBB`, normalized to uppercase.
pub fn validate_color(color: &str) -> Result<String, ApiError> {
    let trimmed = color.trim();
    if !color_re().is_match(trimmed) {
        return Err(ApiError::validation(
            "Color must be a hex value like #3B82F6",
        ));
    }
    Ok(trimmed.to_uppercase())
}

pub fn validate_importance(importance: i32) -> Result<i32, ApiError> {
    if !(1..=5).contains(&importance) {
        return Err(ApiError::validation("Importance must be between 1 and 5"));
    }
    Ok(importance)
}

pub fn validate_percentage(field: &str, value: f64) -> Result<f64, ApiError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ApiError::validation(format!(
            "{} must be between 0 and 100",
            field
        )));
    }
    Ok(value)
}

/// Estimated duration in minutes, 1 to 480.
pub fn validate_estimated_duration(minutes: i32) -> Result<i32, ApiError> {
    if !(1..=480).contains(&minutes) {
        return Err(ApiError::validation(
            "Estimated duration must be between 1 and 480 minutes",
        ));
    }
    Ok(minutes)
}

/// `HH:MM`, 24-hour clock.
pub fn validate_due_time(value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if !due_time_re().is_match(trimmed) {
        return Err(ApiError::validation("Due time must use HH:MM format"));
    }
    Ok(trimmed.to_string())
}

/// Lowercased, trimmed email address.
pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let normalized = email.trim().to_lowercase();
    if !email_re().is_match(&normalized) {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(normalized)
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn validate_journal_title(title: &str) -> Result<String, ApiError> {
    let cleaned = sanitize_text(title);
    if cleaned.is_empty() {
        return Err(ApiError::validation("Title is required"));
    }
    if cleaned.chars().count() > MAX_JOURNAL_TITLE_LEN {
        return Err(ApiError::validation(format!(
            "Title must be at most {} characters",
            MAX_JOURNAL_TITLE_LEN
        )));
    }
    Ok(cleaned)
}

/// Journal content keeps its line breaks; only tags are stripped.
pub fn validate_journal_content(content: &str) -> Result<String, ApiError> {
    let cleaned = html_tag_re().replace_all(content.trim(), "").into_owned();
    if cleaned.chars().count() > MAX_JOURNAL_CONTENT_LEN {
        return Err(ApiError::validation(format!(
            "Content must be at most {} characters",
            MAX_JOURNAL_CONTENT_LEN
        )));
    }
    Ok(cleaned)
}

/// Sanitized, de-duplicated tags with empties dropped.
pub fn validate_tags(tags: &[String]) -> Result<Vec<String>, ApiError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let cleaned = sanitize_text(tag);
        if !cleaned.is_empty() && !out.contains(&cleaned) {
            out.push(cleaned);
        }
    }
    if out.len() > MAX_TAGS {
        return Err(ApiError::validation(format!(
            "At most {} tags are allowed",
            MAX_TAGS
        )));
    }
    Ok(out)
}

/// Pagination guard shared by list endpoints.
pub fn validate_limit(limit: i64, max: i64) -> Result<i64, ApiError> {
    if limit < 1 || limit > max {
        return Err(ApiError::validation(format!(
            "limit must be between 1 and {}",
            max
        )));
    }
    Ok(limit)
}
