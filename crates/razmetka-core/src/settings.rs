//! # Language Settings
//!
//! Per-language resources read from a JSON file:
//!
//! ```json
//! {
//!   "languages": [
//!     {
//!       "language": "ru",
//!       "model": "ru/model.json",
//!       "tags": "ru/tags.txt",
//!       "exceptions": "ru/exceptions.txt",
//!       "dictionary": "ru/dictionary.txt",
//!       "transformer": "full_morphology",
//!       "finder": "full_morphology",
//!       "post_rule": "transitivity",
//!       "schema_features": true
//!     }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the settings file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crf::CrfModel;
use crate::disambiguator::PostRule;
use crate::error::{RazmetkaError, Result};
use crate::features::LexiconDictionary;
use crate::states::{
    load_exception_lexicon, ExceptionLexicon, FinderStrategy, PossibleStateFinder,
};
use crate::transform::ChainTransformer;

/// Resources and pipeline choices for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSettings {
    pub language: String,
    /// Trained model (JSON)
    pub model: PathBuf,
    /// Tag list; the model's output alphabet is used when absent
    #[serde(default)]
    pub tags: Option<PathBuf>,
    #[serde(default)]
    pub exceptions: Option<PathBuf>,
    /// `surface<TAB>lemma<TAB>tag` dictionary
    #[serde(default)]
    pub dictionary: Option<PathBuf>,
    #[serde(default)]
    pub transformer: ChainTransformer,
    #[serde(default)]
    pub finder: FinderStrategy,
    #[serde(default)]
    pub post_rule: PostRule,
    /// Append context-window schema features to the dictionary features
    #[serde(default)]
    pub schema_features: bool,
}

impl LanguageSettings {
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.model);
        for path in [&mut self.tags, &mut self.exceptions, &mut self.dictionary]
            .into_iter()
            .flatten()
        {
            resolve(path);
        }
    }

    pub fn load_model(&self) -> Result<CrfModel> {
        CrfModel::load(&self.model)
    }

    pub fn load_exceptions(&self) -> Result<ExceptionLexicon> {
        match &self.exceptions {
            Some(path) => load_exception_lexicon(path),
            None => Ok(ExceptionLexicon::new()),
        }
    }

    pub fn load_dictionary(&self) -> Result<Option<LexiconDictionary>> {
        self.dictionary
            .as_ref()
            .map(LexiconDictionary::load)
            .transpose()
    }

    /// Build the possible state finder from the tag list, or from the
    /// output alphabet of `model` when no tag list is configured.
    pub fn build_finder(&self, model: &CrfModel) -> Result<PossibleStateFinder> {
        match &self.tags {
            Some(tags) => {
                PossibleStateFinder::from_files(self.finder, tags, self.exceptions.as_deref())
            }
            None => PossibleStateFinder::from_output_alphabet(
                self.finder,
                model.output_alphabet(),
                self.load_exceptions()?,
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    languages: Vec<LanguageSettings>,
}

/// All configured languages, keyed by language code.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: BTreeMap<String, LanguageSettings>,
}

impl LanguageRegistry {
    /// Parse settings JSON, resolving relative paths against `base`.
    pub fn from_json_str(json: &str, base: &Path) -> Result<Self> {
        let file: SettingsFile =
            serde_json::from_str(json).map_err(|e| RazmetkaError::Settings(e.to_string()))?;
        let mut registry = Self::default();
        for mut settings in file.languages {
            settings.resolve_paths(base);
            if registry.languages.contains_key(&settings.language) {
                return Err(RazmetkaError::Settings(format!(
                    "language {} is configured twice",
                    settings.language
                )));
            }
            debug!(
                language = %settings.language,
                model = %settings.model.display(),
                "registered language"
            );
            registry.insert(settings);
        }
        Ok(registry)
    }

    /// Load a settings file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| RazmetkaError::io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let registry = Self::from_json_str(&json, base)?;
        info!(path = %path.display(), languages = registry.len(), "loaded language settings");
        Ok(registry)
    }

    pub fn insert(&mut self, settings: LanguageSettings) {
        self.languages.insert(settings.language.clone(), settings);
    }

    pub fn get(&self, language: &str) -> Result<&LanguageSettings> {
        self.languages
            .get(language)
            .ok_or_else(|| RazmetkaError::UnknownLanguage(language.to_string()))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = r#"{
        "languages": [
            {
                "language": "ru",
                "model": "ru/model.json",
                "exceptions": "/abs/exceptions.txt",
                "transformer": "full_morphology",
                "finder": "full_morphology",
                "post_rule": "transitivity",
                "schema_features": true
            },
            { "language": "en", "model": "en.json" }
        ]
    }"#;

    #[test]
    fn test_parse_settings() {
        let registry = LanguageRegistry::from_json_str(SETTINGS, Path::new("/data")).unwrap();
        assert_eq!(registry.languages().collect::<Vec<_>>(), ["en", "ru"]);

        let ru = registry.get("ru").unwrap();
        assert_eq!(ru.model, Path::new("/data/ru/model.json"));
        assert_eq!(ru.exceptions.as_deref(), Some(Path::new("/abs/exceptions.txt")));
        assert_eq!(ru.transformer, ChainTransformer::FullMorphology);
        assert_eq!(ru.finder, FinderStrategy::FullMorphology);
        assert_eq!(ru.post_rule, PostRule::Transitivity);
        assert!(ru.schema_features);

        let en = registry.get("en").unwrap();
        assert_eq!(en.transformer, ChainTransformer::Identity);
        assert_eq!(en.finder, FinderStrategy::Default);
        assert!(en.tags.is_none());
        assert!(!en.schema_features);
    }

    #[test]
    fn test_unknown_language() {
        let registry = LanguageRegistry::from_json_str(SETTINGS, Path::new("")).unwrap();
        assert!(matches!(
            registry.get("de"),
            Err(RazmetkaError::UnknownLanguage(lang)) if lang == "de"
        ));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            LanguageRegistry::from_json_str("{}", Path::new("")),
            Err(RazmetkaError::Settings(_))
        ));
        let twice = r#"{"languages": [{"language": "ru", "model": "a"}, {"language": "ru", "model": "b"}]}"#;
        assert!(matches!(
            LanguageRegistry::from_json_str(twice, Path::new("")),
            Err(RazmetkaError::Settings(_))
        ));
    }

    #[test]
    fn test_load_resources() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = CrfModel::new();
        model.register_label("S@ЕД@ИМ");
        model.register_label("POS_S");
        model.save(dir.path().join("model.json")).unwrap();
        fs::write(dir.path().join("exceptions.txt"), "себя\tSPRO@ЕД@ВИН\n").unwrap();
        fs::write(dir.path().join("dictionary.txt"), "кот\tкот\tS@ЕД@ИМ\n").unwrap();
        let settings_path = dir.path().join("settings.json");
        fs::write(
            &settings_path,
            r#"{"languages": [{
                "language": "ru",
                "model": "model.json",
                "exceptions": "exceptions.txt",
                "dictionary": "dictionary.txt"
            }]}"#,
        )
        .unwrap();

        let registry = LanguageRegistry::from_json_file(&settings_path).unwrap();
        let settings = registry.get("ru").unwrap();
        let model = settings.load_model().unwrap();
        let finder = settings.build_finder(&model).unwrap();
        assert_eq!(finder.all_tags().len(), 1);
        assert_eq!(settings.load_exceptions().unwrap()["себя"], ["SPRO@ЕД@ВИН"]);
        assert_eq!(settings.load_dictionary().unwrap().unwrap().len(), 1);
    }
}
