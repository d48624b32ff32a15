pub const URN_PREFIX: &str = "urn:li:";

pub const ENTITY_DATASET: &str = "dataset";
pub const ENTITY_DASHBOARD: &str = "dashboard";
pub const ENTITY_CHART: &str = "chart";
pub const ENTITY_DATA_FLOW: &str = "dataFlow";
pub const ENTITY_DATA_JOB: &str = "dataJob";
pub const ENTITY_GLOSSARY_TERM: &str = "glossaryTerm";
pub const ENTITY_TAG: &str = "tag";
pub const ENTITY_DOMAIN: &str = "domain";
pub const ENTITY_DATA_PRODUCT: &str = "dataProduct";
pub const ENTITY_QUERY: &str = "query";

/// Returns true when `value` is already in the catalog's native urn form.
#[must_use]
pub fn is_canonical_urn(value: &str) -> bool {
    value.strip_prefix(URN_PREFIX).is_some_and(|rest| {
        rest.split_once(':')
            .is_some_and(|(kind, id)| !kind.is_empty() && !id.is_empty())
    })
}

/// Extracts the entity type segment of a canonical urn.
#[must_use]
pub fn entity_type_of(urn: &str) -> Option<&str> {
    let rest = urn.strip_prefix(URN_PREFIX)?;
    let (kind, _) = rest.split_once(':')?;
    (!kind.is_empty()).then_some(kind)
}

pub fn make_tag_urn(name: &str) -> String {
    if is_canonical_urn(name) {
        name.to_string()
    } else {
        format!("{URN_PREFIX}{ENTITY_TAG}:{name}")
    }
}

pub fn make_glossary_term_urn(name: &str) -> String {
    if is_canonical_urn(name) {
        name.to_string()
    } else {
        format!("{URN_PREFIX}{ENTITY_GLOSSARY_TERM}:{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_canonical_urns() {
        assert!(is_canonical_urn(
            "urn:li:dataset:(urn:li:dataPlatform:hive,db.table,PROD)"
        ));
        assert!(is_canonical_urn("urn:li:tag:pii"));
        assert!(!is_canonical_urn("db.table"));
        assert!(!is_canonical_urn("urn:li:"));
        assert!(!is_canonical_urn("urn:li:tag:"));
    }

    #[test]
    fn extracts_entity_type() {
        assert_eq!(entity_type_of("urn:li:glossaryTerm:Revenue"), Some("glossaryTerm"));
        assert_eq!(entity_type_of("hive.db.table"), None);
    }

    #[test]
    fn tag_urns_are_not_double_prefixed() {
        assert_eq!(make_tag_urn("pii"), "urn:li:tag:pii");
        assert_eq!(make_tag_urn("urn:li:tag:pii"), "urn:li:tag:pii");
        assert_eq!(make_glossary_term_urn("Revenue"), "urn:li:glossaryTerm:Revenue");
    }
}
