// Fitted categorical encoders, restored from exported artifacts
use serde::Deserialize;
use std::collections::HashMap;

use super::error::EncodingError;

/// One column per known category, named `<feature>_<category>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawOneHotEncoder")]
pub struct OneHotEncoder {
    feature: String,
    categories: Vec<String>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct RawOneHotEncoder {
    feature: String,
    categories: Vec<String>,
}

impl TryFrom<RawOneHotEncoder> for OneHotEncoder {
    type Error = String;

    fn try_from(raw: RawOneHotEncoder) -> Result<Self, Self::Error> {
        if raw.categories.is_empty() {
            return Err(format!("one-hot encoder for '{}' has no categories", raw.feature));
        }
        let index = index_labels(&raw.categories)?;
        Ok(Self {
            feature: raw.feature,
            categories: raw.categories,
            index,
        })
    }
}

impl OneHotEncoder {
    pub fn new(feature: impl Into<String>, categories: Vec<String>) -> Result<Self, String> {
        RawOneHotEncoder {
            feature: feature.into(),
            categories,
        }
        .try_into()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.feature, c))
            .collect()
    }

    pub fn transform(&self, value: &str) -> Result<Vec<f64>, EncodingError> {
        let position = self
            .index
            .get(value)
            .copied()
            .ok_or_else(|| EncodingError::UnseenLabel {
                encoder: self.feature.clone(),
                label: value.to_string(),
            })?;

        let mut encoded = vec![0.0; self.categories.len()];
        encoded[position] = 1.0;
        Ok(encoded)
    }
}

/// Maps each class of a fixed vocabulary to its position.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawLabelEncoder")]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct RawLabelEncoder {
    classes: Vec<String>,
}

impl TryFrom<RawLabelEncoder> for LabelEncoder {
    type Error = String;

    fn try_from(raw: RawLabelEncoder) -> Result<Self, Self::Error> {
        let index = index_labels(&raw.classes)?;
        Ok(Self {
            classes: raw.classes,
            index,
        })
    }
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        RawLabelEncoder { classes }.try_into()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform(&self, encoder: &str, label: &str) -> Result<usize, EncodingError> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| EncodingError::UnseenLabel {
                encoder: encoder.to_string(),
                label: label.to_string(),
            })
    }

    pub fn inverse_transform(&self, index: usize) -> Result<&str, EncodingError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(EncodingError::IndexOutOfRange {
                index,
                len: self.classes.len(),
            })
    }
}

fn index_labels(labels: &[String]) -> Result<HashMap<String, usize>, String> {
    let mut index = HashMap::with_capacity(labels.len());
    for (position, label) in labels.iter().enumerate() {
        if index.insert(label.clone(), position).is_some() {
            return Err(format!("duplicate label '{}'", label));
        }
    }
    Ok(index)
}
