//! Configuration validation rules.

use super::schema::Config;

const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.assistant.model.trim().is_empty() {
        errors.push("assistant.model must not be empty".to_string());
    }
    if config.assistant.max_tokens == 0 {
        errors.push("assistant.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.assistant.temperature) {
        errors.push("assistant.temperature must be in [0.0, 2.0]".to_string());
    }
    let has_instruction_file = config
        .assistant
        .instruction_file
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());
    if config.assistant.instruction.trim().is_empty() && !has_instruction_file {
        errors.push(
            "assistant.instruction must not be empty unless assistant.instruction_file is set"
                .to_string(),
        );
    }

    if let Some(base) = config.provider.api_base.as_deref() {
        if !base.starts_with("http://") && !base.starts_with("https://") {
            errors.push("provider.api_base must be an http(s) URL".to_string());
        }
    }

    if config.transcripts.enabled && config.transcripts.dir.trim().is_empty() {
        errors.push("transcripts.dir is required when transcripts are enabled".to_string());
    }

    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".to_string());
    }
    if config.server.port == 0 {
        errors.push("server.port must be > 0".to_string());
    }

    if !LOG_FORMATS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(config.logging.format.trim()))
    {
        errors.push(format!(
            "logging.format must be one of {}",
            LOG_FORMATS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
