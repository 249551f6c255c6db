//! Language name ↔ code mapping
//!
//! The workflow speaks human-readable names ("Chinese", "English"); the
//! store speaks canonical codes ("zh-CN", "en"). Unknown names pass through
//! unchanged, and `display(normalize(name))` is stable for every name in
//! the table.

use std::collections::{BTreeMap, HashMap};

/// Built-in table of poetry languages: (code, name)
const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("zh-CN", "Chinese"),
    ("lzh", "Classical Chinese"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
];

/// Aliases normalized to a canonical code
const CODE_ALIASES: &[(&str, &str)] = &[("zh", "zh-CN"), ("cmn", "zh-CN"), ("zh-cn", "zh-CN")];

/// Bidirectional mapping between language names and canonical codes
#[derive(Debug, Clone)]
pub struct LanguageMapper {
    code_to_name: HashMap<String, String>,
    /// Lowercased name → code
    name_to_code: HashMap<String, String>,
}

impl Default for LanguageMapper {
    fn default() -> Self {
        let mut mapper = Self {
            code_to_name: HashMap::new(),
            name_to_code: HashMap::new(),
        };
        for (code, name) in LANGUAGES {
            mapper.insert(code, name);
        }
        mapper
    }
}

impl LanguageMapper {
    /// A mapper with extra name → code entries merged over the built-ins
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut mapper = Self::default();
        for (name, code) in overrides {
            mapper.insert(code, name);
        }
        mapper
    }

    fn insert(&mut self, code: &str, name: &str) {
        self.code_to_name.insert(code.to_string(), name.to_string());
        self.name_to_code
            .insert(name.to_lowercase(), code.to_string());
    }

    /// Code for a human-readable name, if known
    pub fn code_for_name(&self, name: &str) -> Option<&str> {
        self.name_to_code
            .get(&name.trim().to_lowercase())
            .map(|s| s.as_str())
    }

    /// Display name for a code, if known
    pub fn name_for_code(&self, code: &str) -> Option<&str> {
        self.code_to_name
            .get(&self.normalize_code(code))
            .map(|s| s.as_str())
    }

    /// Canonicalize a code's shape: trimmed, `_` → `-`, lowercase language,
    /// uppercase region, known aliases resolved
    pub fn normalize_code(&self, code: &str) -> String {
        let cleaned = code.trim().replace('_', "-");
        let mut parts = cleaned.splitn(2, '-');
        let lang = parts.next().unwrap_or("").to_lowercase();
        let normalized = match parts.next() {
            Some(region) => format!("{}-{}", lang, region.to_uppercase()),
            None => lang,
        };

        for (alias, canonical) in CODE_ALIASES {
            if normalized.eq_ignore_ascii_case(alias) {
                return canonical.to_string();
            }
        }
        normalized
    }

    /// Resolve a name or code to a canonical code
    ///
    /// Names found in the table map to their code; anything else is
    /// shape-normalized and passed through unchanged.
    pub fn resolve(&self, name_or_code: &str) -> String {
        match self.code_for_name(name_or_code) {
            Some(code) => code.to_string(),
            None => self.normalize_code(name_or_code),
        }
    }

    /// Display name for a name-or-code, falling back to the input
    pub fn display(&self, name_or_code: &str) -> String {
        let code = self.resolve(name_or_code);
        self.name_for_code(&code)
            .map(|s| s.to_string())
            .unwrap_or_else(|| name_or_code.trim().to_string())
    }

    /// Names in the built-in (and override) table
    pub fn known_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.code_to_name.values().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_to_code() {
        let mapper = LanguageMapper::default();
        assert_eq!(mapper.code_for_name("Chinese"), Some("zh-CN"));
        assert_eq!(mapper.code_for_name("english"), Some("en"));
        assert_eq!(mapper.code_for_name(" Classical Chinese "), Some("lzh"));
        assert_eq!(mapper.code_for_name("Klingon"), None);
    }

    #[test]
    fn test_normalize_code_shapes() {
        let mapper = LanguageMapper::default();
        assert_eq!(mapper.normalize_code("ZH_cn"), "zh-CN");
        assert_eq!(mapper.normalize_code("en"), "en");
        assert_eq!(mapper.normalize_code("zh"), "zh-CN");
        assert_eq!(mapper.normalize_code("PT"), "pt");
        assert_eq!(mapper.normalize_code(" ja "), "ja");
    }

    #[test]
    fn test_resolve_passes_unknown_through() {
        let mapper = LanguageMapper::default();
        assert_eq!(mapper.resolve("Chinese"), "zh-CN");
        assert_eq!(mapper.resolve("Esperanto"), "esperanto");
    }

    #[test]
    fn test_display_roundtrip_is_stable() {
        let mapper = LanguageMapper::default();
        for name in mapper.known_names() {
            let code = mapper.resolve(name);
            assert_eq!(mapper.display(&code), *name, "unstable for {}", name);
            // Resolving twice lands on the same code
            assert_eq!(mapper.resolve(&code), code);
        }
    }

    #[test]
    fn test_overrides_extend_table() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Welsh".to_string(), "cy".to_string());
        let mapper = LanguageMapper::with_overrides(&overrides);
        assert_eq!(mapper.resolve("Welsh"), "cy");
        assert_eq!(mapper.display("cy"), "Welsh");
        // Built-ins still present
        assert_eq!(mapper.resolve("Russian"), "ru");
    }
}
