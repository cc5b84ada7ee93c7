use anyhow::Result;
use regex::Regex;
use std::env;
use tracing::{debug, warn};

/// Substitute environment variables in the format ${VAR_NAME} or
/// ${VAR_NAME:-default}.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::-([^}]*))?\}")?;
    let mut result = content.to_string();
    let mut missing_vars = Vec::new();

    for caps in re.captures_iter(content) {
        let var_name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let placeholder = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let fallback = caps.get(2).map(|m| m.as_str());

        match env::var(var_name) {
            Ok(value) => {
                debug!("Substituting environment variable: {}", var_name);
                result = result.replace(placeholder, &value);
            }
            Err(_) => match fallback {
                Some(default) => {
                    debug!(
                        "Environment variable '{}' not set, using inline default",
                        var_name
                    );
                    result = result.replace(placeholder, default);
                }
                None => {
                    warn!("Environment variable '{}' not set", var_name);
                    missing_vars.push(var_name.to_string());
                    // Keep the placeholder; the validator reports it later
                }
            },
        }
    }

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (will fail validation if required): {:?}",
            missing_vars
        );
    }

    Ok(result)
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    Regex::new(r"\$\{(\w+)(?::-([^}]*))?\}")
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}
