use crate::utils::error::{MonitorError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty".to_string()));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(field_name, url_str, format!("Invalid URL format: {}", e))),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty".to_string()));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes".to_string()));
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            &value.to_string(),
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only".to_string(),
        ));
    }
    Ok(())
}

/// Categories look like `cs.CL` or `math.AG`.
pub fn validate_category(field_name: &str, category: &str) -> Result<()> {
    let valid = category
        .split_once('.')
        .map(|(archive, subject)| {
            !archive.is_empty()
                && !subject.is_empty()
                && archive.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
                && subject.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        .unwrap_or(false);

    if !valid {
        return Err(invalid(
            field_name,
            category,
            "Expected an arXiv category such as cs.CL".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_ordered<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    low: T,
    high: T,
) -> Result<()> {
    if low > high {
        return Err(invalid(
            field_name,
            &format!("{}..{}", low, high),
            "Minimum must not exceed maximum".to_string(),
        ));
    }
    Ok(())
}

fn invalid(field: &str, value: &str, reason: String) -> MonitorError {
    MonitorError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason,
    }
}
