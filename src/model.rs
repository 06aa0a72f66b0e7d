//! Model name resolution and endpoint family detection.

/// How a model is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Gemini image models, called through `:generateContent`.
    GenerateContent,
    /// Imagen models, called through `:predict`.
    Predict,
}

/// Short name aliases for popular models.
const ALIASES: &[(&str, &str)] = &[
    ("nano-banana", "gemini-2.5-flash-image"),
    ("nano-banana-pro", "gemini-3-pro-image-preview"),
    ("imagen-4", "imagen-4.0-generate-001"),
    ("imagen-4-ultra", "imagen-4.0-ultra-generate-001"),
];

/// Resolve a model name (alias or exact) to the full model identifier.
///
/// A leading `models/` prefix is accepted and stripped.
#[must_use]
pub fn resolve_model(name: &str) -> String {
    let name = name.strip_prefix("models/").unwrap_or(name);
    ALIASES
        .iter()
        .find(|&&(alias, _)| alias == name)
        .map_or_else(|| name.to_string(), |&(_, full)| full.to_string())
}

/// Detect the endpoint family from a resolved model name.
///
/// # Errors
///
/// Returns an error if the model name doesn't match a known prefix.
pub fn detect_family(model: &str) -> Result<ModelFamily, String> {
    if model.starts_with("gemini") {
        Ok(ModelFamily::GenerateContent)
    } else if model.starts_with("imagen") {
        Ok(ModelFamily::Predict)
    } else {
        Err(format!("Unknown model '{model}'. Expected 'gemini-*' or 'imagen-*'."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRO: &str = "gemini-3-pro-image-preview";
    const FLASH: &str = "gemini-2.5-flash-image";

    #[test]
    fn resolve_aliases() {
        assert_eq!(resolve_model("nano-banana"), FLASH);
        assert_eq!(resolve_model("nano-banana-pro"), PRO);
        assert_eq!(resolve_model("imagen-4"), "imagen-4.0-generate-001");
    }

    #[test]
    fn resolve_exact_name_passthrough() {
        assert_eq!(resolve_model(PRO), PRO);
    }

    #[test]
    fn resolve_strips_models_prefix() {
        assert_eq!(resolve_model("models/gemini-3-pro-image-preview"), PRO);
        assert_eq!(resolve_model("models/nano-banana"), FLASH);
    }

    #[test]
    fn detect_families() {
        let flash = detect_family(FLASH).unwrap();
        assert_eq!(flash, ModelFamily::GenerateContent);
        let imagen = detect_family("imagen-4.0-generate-001").unwrap();
        assert_eq!(imagen, ModelFamily::Predict);
    }

    #[test]
    fn detect_unknown_model() {
        assert!(detect_family("dall-e-3").is_err());
        assert!(detect_family("gpt-image-1").is_err());
    }
}
