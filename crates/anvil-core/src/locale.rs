//! Localization contract.
//!
//! The pipeline never hardcodes user-visible text; it resolves message keys
//! through a [`Localizer`] using the invoker's culture, falling back to the
//! default culture when a translation is missing.

use std::collections::HashMap;

/// The culture used when the invoker's locale is absent or untranslated.
pub const DEFAULT_CULTURE: &str = "en";

/// Message keys the pipeline itself resolves.
///
/// Handlers are free to define their own keys; these are only the ones the
/// access policy, dispatcher and renderer need.
pub mod keys {
    /// "You're blacklisted."
    pub const BLACKLISTED: &str = "blacklisted";
    /// "You're blacklisted with reason: {0}"
    pub const BLACKLISTED_WITH_REASON: &str = "blacklisted-with-reason";
    /// "Command \"{0}\" not found."
    pub const COMMAND_NOT_FOUND: &str = "command-not-found";
    /// "This command is rate limited, try again later."
    pub const RATE_LIMITED: &str = "rate-limited";
    /// "An error occurred."
    pub const ERROR_OCCURRED: &str = "error-occurred";
    /// "Error message: {0}"
    pub const ERROR_DETAIL: &str = "error-detail";
}

/// Resolves a message key to display text for a culture.
///
/// Implementations must fall back to [`DEFAULT_CULTURE`] when the requested
/// culture has no translation, and should return the key itself as a last
/// resort so a missing entry never turns into an empty response.
pub trait Localizer: Send + Sync {
    /// Resolves `key` for `culture`, substituting `{0}`, `{1}`, … with `args`.
    fn localize(&self, key: &str, culture: &str, args: &[&str]) -> String;
}

/// Substitutes `{0}`, `{1}`, … placeholders in `template`.
fn apply_args(template: &str, args: &[&str]) -> String {
    let mut text = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        text = text.replace(&format!("{{{i}}}"), arg);
    }
    text
}

/// A [`Localizer`] backed by in-memory per-culture catalogs.
///
/// Lookup order: exact culture → primary language subtag (`"es"` for
/// `"es-MX"`) → the default culture → the key itself.
pub struct CatalogLocalizer {
    catalogs: HashMap<String, HashMap<String, String>>,
    default_culture: String,
}

impl CatalogLocalizer {
    /// Creates an empty localizer with the given default culture.
    pub fn new(default_culture: impl Into<String>) -> Self {
        Self {
            catalogs: HashMap::new(),
            default_culture: default_culture.into(),
        }
    }

    /// Creates a localizer preloaded with the English strings for the
    /// pipeline's own message keys.
    pub fn with_defaults() -> Self {
        let mut localizer = Self::new(DEFAULT_CULTURE);
        localizer.extend(
            DEFAULT_CULTURE,
            [
                (keys::BLACKLISTED, "You're blacklisted."),
                (
                    keys::BLACKLISTED_WITH_REASON,
                    "You're blacklisted with reason: {0}",
                ),
                (keys::COMMAND_NOT_FOUND, "Command \"{0}\" not found."),
                (
                    keys::RATE_LIMITED,
                    "This command is rate limited, try again later.",
                ),
                (keys::ERROR_OCCURRED, "An error occurred."),
                (keys::ERROR_DETAIL, "Error message: {0}"),
            ],
        );
        localizer
    }

    /// Adds or replaces a single entry in a culture's catalog.
    pub fn insert(
        &mut self,
        culture: impl Into<String>,
        key: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.catalogs
            .entry(culture.into())
            .or_default()
            .insert(key.into(), text.into());
    }

    /// Adds many entries to a culture's catalog.
    pub fn extend<'a>(
        &mut self,
        culture: &str,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        let catalog = self.catalogs.entry(culture.to_string()).or_default();
        for (key, text) in entries {
            catalog.insert(key.to_string(), text.to_string());
        }
    }

    fn lookup(&self, key: &str, culture: &str) -> Option<&str> {
        if let Some(text) = self.catalogs.get(culture).and_then(|c| c.get(key)) {
            return Some(text);
        }

        // "es-MX" → "es"
        if let Some((language, _)) = culture.split_once('-')
            && let Some(text) = self.catalogs.get(language).and_then(|c| c.get(key))
        {
            return Some(text);
        }

        self.catalogs
            .get(&self.default_culture)
            .and_then(|c| c.get(key))
            .map(String::as_str)
    }
}

impl Localizer for CatalogLocalizer {
    fn localize(&self, key: &str, culture: &str, args: &[&str]) -> String {
        match self.lookup(key, culture) {
            Some(template) => apply_args(template, args),
            None => {
                tracing::debug!(key, culture, "No translation found, returning the key");
                key.to_string()
            }
        }
    }
}

impl Default for CatalogLocalizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exact_culture_first() {
        let mut localizer = CatalogLocalizer::with_defaults();
        localizer.insert("es", keys::ERROR_OCCURRED, "Ocurrió un error.");
        localizer.insert("es-MX", keys::ERROR_OCCURRED, "Ocurrió un error, compa.");

        assert_eq!(
            localizer.localize(keys::ERROR_OCCURRED, "es-MX", &[]),
            "Ocurrió un error, compa."
        );
    }

    #[test]
    fn falls_back_to_language_then_default() {
        let mut localizer = CatalogLocalizer::with_defaults();
        localizer.insert("es", keys::ERROR_OCCURRED, "Ocurrió un error.");

        assert_eq!(
            localizer.localize(keys::ERROR_OCCURRED, "es-AR", &[]),
            "Ocurrió un error."
        );
        assert_eq!(
            localizer.localize(keys::ERROR_OCCURRED, "fr", &[]),
            "An error occurred."
        );
    }

    #[test]
    fn unknown_key_comes_back_verbatim() {
        let localizer = CatalogLocalizer::with_defaults();
        assert_eq!(localizer.localize("no-such-key", "en", &[]), "no-such-key");
    }

    #[test]
    fn placeholders_are_substituted() {
        let localizer = CatalogLocalizer::with_defaults();
        assert_eq!(
            localizer.localize(keys::BLACKLISTED_WITH_REASON, "en", &["spam"]),
            "You're blacklisted with reason: spam"
        );
    }
}
