//! Normalization of the loosely-typed term arguments accepted by `add_term`.

use serde::Deserialize;
use serde_json::Value;

use super::locale::LocaleMap;
use crate::errors::{Error, Result, ValidationError};

/// A term argument: a plain name in the active locale, a set of translations,
/// or a sequence of either.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub enum TermInput {
    Name(String),
    Translations(LocaleMap),
    Many(Vec<TermInput>),
}

impl TermInput {
    /// Flattens the input into single terms, preserving order.
    pub fn into_items(self) -> Vec<TermInput> {
        match self {
            TermInput::Many(items) => items.into_iter().flat_map(Self::into_items).collect(),
            single => vec![single],
        }
    }

    /// Wraps a plain name under `locale`; translations pass through. Names
    /// are kept verbatim, so `" Drama "` and `"Drama"` are different terms.
    ///
    /// Fails on sequences and on blank names or locales.
    pub fn to_multilingual(&self, locale: &str) -> Result<LocaleMap> {
        let map = match self {
            TermInput::Name(name) => {
                let mut map = LocaleMap::new();
                map.insert(locale.to_string(), name.clone());
                map
            }
            TermInput::Translations(map) => map.clone(),
            TermInput::Many(_) => {
                return Err(ValidationError::InvalidInput(
                    "a sequence of terms cannot be used as a single term".to_string(),
                )
                .into())
            }
        };

        if map.is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        let blank = map
            .iter()
            .find(|(l, n)| l.trim().is_empty() || n.trim().is_empty());
        if let Some((locale, _)) = blank {
            return Err(ValidationError::InvalidInput(format!(
                "term name for locale '{}' must not be empty",
                locale
            ))
            .into());
        }
        Ok(map)
    }
}

/// True for a non-empty JSON object whose keys are exactly the indices
/// `0..n`, i.e. a list that was serialized as an object.
pub fn is_sequential_object(object: &serde_json::Map<String, Value>) -> bool {
    let mut indices: Vec<usize> = match object.keys().map(|k| k.parse::<usize>()).collect() {
        Ok(indices) => indices,
        Err(_) => return false,
    };
    indices.sort_unstable();
    !indices.is_empty() && indices.iter().enumerate().all(|(i, idx)| i == *idx)
}

impl TryFrom<Value> for TermInput {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(TermInput::Name(name)),
            Value::Array(items) => items
                .into_iter()
                .map(TermInput::try_from)
                .collect::<Result<Vec<_>>>()
                .map(TermInput::Many),
            Value::Object(object) if is_sequential_object(&object) => {
                let mut entries: Vec<(usize, Value)> = object
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                    .collect();
                entries.sort_by_key(|(i, _)| *i);
                entries
                    .into_iter()
                    .map(|(_, v)| TermInput::try_from(v))
                    .collect::<Result<Vec<_>>>()
                    .map(TermInput::Many)
            }
            Value::Object(object) => object
                .into_iter()
                .map(|(locale, v)| match v {
                    Value::String(name) => Ok((locale, name)),
                    other => Err(ValidationError::InvalidInput(format!(
                        "translation for '{}' must be a string, got {}",
                        locale, other
                    ))
                    .into()),
                })
                .collect::<Result<LocaleMap>>()
                .map(TermInput::Translations),
            other => Err(ValidationError::InvalidInput(format!(
                "unsupported term value: {}",
                other
            ))
            .into()),
        }
    }
}

impl From<&str> for TermInput {
    fn from(name: &str) -> Self {
        TermInput::Name(name.to_string())
    }
}

impl From<String> for TermInput {
    fn from(name: String) -> Self {
        TermInput::Name(name)
    }
}

impl From<LocaleMap> for TermInput {
    fn from(map: LocaleMap) -> Self {
        TermInput::Translations(map)
    }
}

impl<T: Into<TermInput>> From<Vec<T>> for TermInput {
    fn from(items: Vec<T>) -> Self {
        TermInput::Many(items.into_iter().map(Into::into).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TermInput {
    fn from(items: [&str; N]) -> Self {
        TermInput::Many(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_name_wraps_under_locale() {
        let map = TermInput::from("Drama").to_multilingual("en").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("en").map(String::as_str), Some("Drama"));
    }

    #[test]
    fn test_translations_pass_through() {
        let mut translations = LocaleMap::new();
        translations.insert("en".to_string(), "Drama".to_string());
        translations.insert("de".to_string(), "Drama".to_string());

        let map = TermInput::from(translations.clone())
            .to_multilingual("fr")
            .unwrap();
        assert_eq!(map, translations);
    }

    #[test]
    fn test_names_are_not_trimmed() {
        let padded = TermInput::from(" Drama ").to_multilingual("en").unwrap();
        let plain = TermInput::from("Drama").to_multilingual("en").unwrap();
        assert_eq!(padded.get("en").map(String::as_str), Some(" Drama "));
        assert_ne!(padded, plain);
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(TermInput::from("   ").to_multilingual("en").is_err());
        assert!(TermInput::Translations(LocaleMap::new())
            .to_multilingual("en")
            .is_err());
        assert!(TermInput::from(vec!["a"]).to_multilingual("en").is_err());
    }

    #[test]
    fn test_into_items_flattens_in_order() {
        let input = TermInput::Many(vec![
            TermInput::from("Fiction"),
            TermInput::from(vec!["Drama", "Comedy"]),
        ]);
        assert_eq!(
            input.into_items(),
            vec![
                TermInput::from("Fiction"),
                TermInput::from("Drama"),
                TermInput::from("Comedy"),
            ]
        );
    }

    #[test]
    fn test_from_json_distinguishes_lists_and_maps() {
        let input: TermInput = serde_json::from_value(json!(["Fiction", "Drama"])).unwrap();
        assert_eq!(input, TermInput::from(vec!["Fiction", "Drama"]));

        let input: TermInput = serde_json::from_value(json!({"0": "Fiction", "1": "Drama"})).unwrap();
        assert_eq!(input, TermInput::from(vec!["Fiction", "Drama"]));

        let input: TermInput = serde_json::from_value(json!({"en": "Drama", "de": "Drama"})).unwrap();
        assert!(matches!(input, TermInput::Translations(ref m) if m.len() == 2));

        let input: TermInput = serde_json::from_value(json!("Drama")).unwrap();
        assert_eq!(input, TermInput::from("Drama"));

        assert!(serde_json::from_value::<TermInput>(json!(42)).is_err());
        assert!(serde_json::from_value::<TermInput>(json!({"en": 1})).is_err());
    }

    #[test]
    fn test_is_sequential_object() {
        let list = json!({"0": "a", "1": "b"});
        let long: serde_json::Map<String, Value> =
            (0..12).map(|i| (i.to_string(), json!("x"))).collect();
        let sparse = json!({"0": "a", "2": "b"});
        let map = json!({"en": "a"});
        let empty = json!({});

        assert!(is_sequential_object(list.as_object().unwrap()));
        assert!(is_sequential_object(&long));
        assert!(!is_sequential_object(sparse.as_object().unwrap()));
        assert!(!is_sequential_object(map.as_object().unwrap()));
        assert!(!is_sequential_object(empty.as_object().unwrap()));
    }
}
