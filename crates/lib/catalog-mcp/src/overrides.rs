//! Three-tier resolution of customizable tool facets.

use std::collections::HashMap;

use crate::host::{JsonObject, ToolAnnotations, ToolIcon};
use crate::registry::ToolName;

/// First present value wins: per registration, then per toolkit, then default.
pub fn resolve<T: Clone>(
    per_registration: Option<&T>,
    per_toolkit: Option<&T>,
    default: Option<&T>,
) -> Option<T> {
    per_registration.or(per_toolkit).or(default).cloned()
}

/// Toolkit-level facet values keyed by tool.
#[derive(Debug, Clone, Default)]
pub struct FacetOverrides {
    pub descriptions: HashMap<ToolName, String>,
    pub titles: HashMap<ToolName, String>,
    pub icons: HashMap<ToolName, Vec<ToolIcon>>,
    pub annotations: HashMap<ToolName, ToolAnnotations>,
    pub output_schemas: HashMap<ToolName, JsonObject>,
}

/// Facet values supplied for a single registration.
#[derive(Debug, Clone, Default)]
pub struct FacetValues {
    pub description: Option<String>,
    pub title: Option<String>,
    pub icons: Option<Vec<ToolIcon>>,
    pub annotations: Option<ToolAnnotations>,
    pub output_schema: Option<JsonObject>,
}

/// Facets after resolution; `None` means the facet is omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFacets {
    pub description: Option<String>,
    pub title: Option<String>,
    pub icons: Option<Vec<ToolIcon>>,
    pub annotations: Option<ToolAnnotations>,
    pub output_schema: Option<JsonObject>,
}

pub(crate) fn bulk_insert<T: Clone>(
    map: &mut HashMap<ToolName, T>,
    names: impl IntoIterator<Item = ToolName>,
    value: &T,
) {
    for name in names {
        map.insert(name, value.clone());
    }
}

impl FacetOverrides {
    #[must_use]
    pub fn resolve(&self, name: ToolName, per_registration: &FacetValues) -> ResolvedFacets {
        let description = name.default_description().to_string();
        let title = name.default_title().to_string();
        let annotations = name.default_annotations();
        let output_schema = name.default_output_schema();
        ResolvedFacets {
            description: resolve(
                per_registration.description.as_ref(),
                self.descriptions.get(&name),
                Some(&description),
            ),
            title: resolve(
                per_registration.title.as_ref(),
                self.titles.get(&name),
                Some(&title),
            ),
            icons: resolve(per_registration.icons.as_ref(), self.icons.get(&name), None),
            annotations: resolve(
                per_registration.annotations.as_ref(),
                self.annotations.get(&name),
                Some(&annotations),
            ),
            output_schema: resolve(
                per_registration.output_schema.as_ref(),
                self.output_schemas.get(&name),
                output_schema.as_ref(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_present_tier_wins() {
        let registration = String::from("registration");
        let toolkit = String::from("toolkit");
        let default = String::from("default");
        assert_eq!(
            resolve(Some(&registration), Some(&toolkit), Some(&default)).as_deref(),
            Some("registration")
        );
        assert_eq!(resolve(None, Some(&toolkit), Some(&default)).as_deref(), Some("toolkit"));
        assert_eq!(resolve(None, None, Some(&default)).as_deref(), Some("default"));
        assert_eq!(resolve::<String>(None, None, None), None);
    }

    #[test]
    fn facets_fall_back_to_compiled_defaults() {
        let overrides = FacetOverrides::default();
        let facets = overrides.resolve(ToolName::Search, &FacetValues::default());
        assert_eq!(
            facets.description.as_deref(),
            Some(ToolName::Search.default_description())
        );
        assert_eq!(facets.annotations, Some(ToolAnnotations::read_only()));
        assert!(facets.icons.is_none());
    }

    #[test]
    fn toolkit_values_apply_only_to_named_tools() {
        let mut overrides = FacetOverrides::default();
        bulk_insert(
            &mut overrides.titles,
            [ToolName::Search, ToolName::GetEntity],
            &"Catalog lookup".to_string(),
        );
        bulk_insert(
            &mut overrides.icons,
            [ToolName::Search],
            &vec![ToolIcon::new("https://icons.example/search.svg")],
        );

        let search = overrides.resolve(ToolName::Search, &FacetValues::default());
        assert_eq!(search.title.as_deref(), Some("Catalog lookup"));
        assert_eq!(search.icons.map(|icons| icons.len()), Some(1));

        let ping = overrides.resolve(ToolName::Ping, &FacetValues::default());
        assert_eq!(ping.title.as_deref(), Some(ToolName::Ping.default_title()));
        assert!(ping.icons.is_none());
    }

    #[test]
    fn registration_values_beat_toolkit_values() {
        let mut overrides = FacetOverrides::default();
        bulk_insert(
            &mut overrides.descriptions,
            [ToolName::GetSchema],
            &"toolkit description".to_string(),
        );
        let per_registration = FacetValues {
            description: Some("registration description".to_string()),
            ..FacetValues::default()
        };

        let facets = overrides.resolve(ToolName::GetSchema, &per_registration);
        assert_eq!(facets.description.as_deref(), Some("registration description"));

        let facets = overrides.resolve(ToolName::GetSchema, &FacetValues::default());
        assert_eq!(facets.description.as_deref(), Some("toolkit description"));
    }
}
