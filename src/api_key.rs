use anyhow::Result;
use std::env;

use crate::constants::{API_KEY_ENV_VARS, GEMINI_API_KEY_ENV};
use crate::logging::{log_error, log_info};

/// Look up the API key for the given provider.
///
/// Missing keys are a configuration error: the caller aborts before the session starts.
pub fn get_api_key(provider: &str) -> Result<String> {
    let candidates: &[&str] = if provider == "gemini" {
        &[GEMINI_API_KEY_ENV]
    } else {
        API_KEY_ENV_VARS
    };

    for name in candidates {
        match env::var(name) {
            Ok(key) if !key.trim().is_empty() => {
                log_info(&format!("Found {name} environment variable"));
                return Ok(key.trim().to_string());
            }
            Ok(_) => log_error(&format!("{name} environment variable is empty")),
            Err(_) => {}
        }
    }

    log_error(&format!(
        "No API key found for provider '{provider}' (checked: {})",
        candidates.join(", ")
    ));
    handle_api_key_error(candidates)
}

fn handle_api_key_error(candidates: &[&str]) -> Result<String> {
    let primary = candidates[0];

    eprintln!();
    eprintln!("🔑 API Key Required");
    eprintln!("===================");
    eprintln!();
    eprintln!("The planning model needs an API key, but none was found.");
    eprintln!();
    eprintln!("Set it as an environment variable:");
    eprintln!();
    eprintln!("Windows (PowerShell):");
    eprintln!("  $env:{primary}=\"your_api_key_here\"");
    eprintln!();
    eprintln!("Linux/macOS:");
    eprintln!("  export {primary}=\"your_api_key_here\"");
    eprintln!();
    eprintln!("Local models need no key: use --model ollama::<model>.");
    eprintln!();

    Err(anyhow::anyhow!(
        "{} environment variable is required",
        candidates.join(" or ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in API_KEY_ENV_VARS.iter().chain([GEMINI_API_KEY_ENV].iter()) {
            unsafe { env::remove_var(name) };
        }
    }

    #[test]
    #[serial]
    fn test_missing_key_is_an_error() {
        clear_env();

        let err = get_api_key("openai").unwrap_err();
        assert!(err.to_string().contains("DASHSCOPE_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_blank_key_is_skipped() {
        clear_env();
        unsafe { env::set_var("DASHSCOPE_API_KEY", "   ") };
        unsafe { env::set_var("OPENAI_API_KEY", "sk-test") };

        assert_eq!(get_api_key("openai").unwrap(), "sk-test");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_gemini_uses_its_own_variable() {
        clear_env();
        unsafe { env::set_var("DASHSCOPE_API_KEY", "sk-test") };
        assert!(get_api_key("gemini").is_err());

        unsafe { env::set_var(GEMINI_API_KEY_ENV, "AIza-test") };
        assert_eq!(get_api_key("gemini").unwrap(), "AIza-test");

        clear_env();
    }
}
