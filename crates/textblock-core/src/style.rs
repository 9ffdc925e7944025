use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resolves style keys to class names. Provided by the host.
///
/// Composite style maps are compiled asynchronously; callers that await one
/// must re-read the document afterwards.
pub trait StyleResolver {
    fn class_name_by_color_key(&self, color_key: &str) -> Option<String>;

    fn class_name_by_style_key(&self, style_key: &str) -> impl Future<Output = Option<String>>;

    fn class_names_for_style_map(
        &self,
        styles: &LocalStyles,
    ) -> impl Future<Output = Option<String>>;
}

/// The `styles` attribute of a block: alignment per viewport plus a named
/// appearance. Unknown entries are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalStyles {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub alignment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl LocalStyles {
    pub fn from_attr(value: Option<&Value>) -> Self {
        match value {
            Some(value @ Value::Object(_)) => {
                serde_json::from_value(value.clone()).unwrap_or_else(|err| {
                    tracing::debug!(%err, "ignoring malformed block styles");
                    Self::default()
                })
            }
            _ => Self::default(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn is_empty(&self) -> bool {
        self.alignment.is_empty() && self.appearance.is_none() && self.other.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleChange {
    Alignment { viewport: String, key: String },
    /// `None` clears the appearance.
    Appearance(Option<String>),
}

impl StyleChange {
    pub fn apply(&self, styles: &mut LocalStyles) {
        match self {
            StyleChange::Alignment { viewport, key } => {
                styles.alignment.insert(viewport.clone(), key.clone());
            }
            StyleChange::Appearance(Some(key)) if !key.is_empty() => {
                styles.appearance = Some(key.clone());
            }
            StyleChange::Appearance(_) => {
                styles.appearance = None;
            }
        }
    }
}

/// A style change waiting on class-name resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingStyle {
    generation: u64,
    change: StyleChange,
    styles: LocalStyles,
}

impl PendingStyle {
    pub(crate) fn new(generation: u64, change: StyleChange, mut styles: LocalStyles) -> Self {
        change.apply(&mut styles);
        Self {
            generation,
            change,
            styles,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn change(&self) -> &StyleChange {
        &self.change
    }

    /// The merged styles to resolve a class name for.
    pub fn styles(&self) -> &LocalStyles {
        &self.styles
    }
}
