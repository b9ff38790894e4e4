use url::Url;

/// Validate that the OpenAI credential is present
pub fn validate_api_key(api_key: &str) -> Result<(), Box<dyn std::error::Error>> {
    if api_key.trim().is_empty() {
        return Err("OPENAI_API_KEY is required (set it in the environment or openai.api_key)".into());
    }
    Ok(())
}

/// Validate that an endpoint override parses and uses one of the allowed schemes
pub fn validate_url(
    name: &str,
    value: &str,
    schemes: &[&str],
) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(value).map_err(|e| format!("{name} is not a valid URL ({value}): {e}"))?;

    if !schemes.contains(&url.scheme()) {
        return Err(format!(
            "{name} must use one of the schemes [{}], got '{}'",
            schemes.join(", "),
            url.scheme()
        )
        .into());
    }

    Ok(())
}

/// Validate that a numeric setting is strictly positive
pub fn validate_positive(name: &str, value: u64) -> Result<(), Box<dyn std::error::Error>> {
    if value == 0 {
        return Err(format!("{name} must be greater than zero").into());
    }
    Ok(())
}
