//! Maps GraphQL payloads onto the catalog data model.

use std::collections::BTreeMap;

use catalog_core::client::{ClientError, ClientResult};
use catalog_store::models::{
    ColumnLineage,
    ColumnMapping,
    DataProduct,
    DataProductList,
    Domain,
    DomainList,
    Entity,
    EntitySummary,
    GlossaryTerm,
    Link,
    LineageDirection,
    LineageNode,
    LineageResult,
    NamedRef,
    Owner,
    QueryList,
    SavedQuery,
    SchemaField,
    SchemaMetadata,
    SearchResult,
    Tag,
    TagList,
};
use catalog_store::schema::entity_type_of;
use serde_json::Value;

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    str_at(value, pointer).map(str::to_string)
}

fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn usize_at(value: &Value, pointer: &str) -> Option<usize> {
    value
        .pointer(pointer)
        .and_then(Value::as_u64)
        .and_then(|number| usize::try_from(number).ok())
}

fn required_urn(value: &Value) -> ClientResult<String> {
    string_at(value, "/urn").ok_or_else(|| ClientError::Decode("entity without urn".to_string()))
}

/// Resolves the nested object at `pointer`, reporting a null as not found.
pub fn object_at<'a>(data: &'a Value, pointer: &str, urn: &str) -> ClientResult<&'a Value> {
    match data.pointer(pointer) {
        Some(Value::Null) | None => Err(ClientError::NotFound(urn.to_string())),
        Some(value) => Ok(value),
    }
}

fn entity_type(entity: &Value, urn: &str) -> String {
    entity_type_of(urn)
        .map(str::to_string)
        .or_else(|| string_at(entity, "/type").map(|kind| kind.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn display_name(entity: &Value) -> Option<String> {
    string_at(entity, "/properties/name").or_else(|| string_at(entity, "/name"))
}

fn description(entity: &Value) -> Option<String> {
    string_at(entity, "/editableProperties/description")
        .or_else(|| string_at(entity, "/properties/description"))
        .or_else(|| string_at(entity, "/properties/definition"))
}

fn named_ref(value: &Value) -> Option<NamedRef> {
    let urn = string_at(value, "/urn")?;
    Some(NamedRef {
        urn,
        name: display_name(value),
    })
}

fn tag_refs(value: &Value, pointer: &str) -> Vec<NamedRef> {
    array_at(value, pointer)
        .iter()
        .filter_map(|item| item.get("tag").and_then(named_ref))
        .collect()
}

fn term_refs(value: &Value, pointer: &str) -> Vec<NamedRef> {
    array_at(value, pointer)
        .iter()
        .filter_map(|item| item.get("term").and_then(named_ref))
        .collect()
}

/// Decodes the common summary fields shared by search and lineage results.
///
/// # Errors
/// Returns `ClientError::Decode` when the entity carries no urn.
pub fn entity_summary(entity: &Value) -> ClientResult<EntitySummary> {
    let urn = required_urn(entity)?;
    Ok(EntitySummary {
        entity_type: entity_type(entity, &urn),
        name: display_name(entity),
        platform: string_at(entity, "/platform/name"),
        description: description(entity),
        urn,
    })
}

pub fn search_result(data: &Value, offset: usize, limit: usize) -> ClientResult<SearchResult> {
    let root = object_at(data, "/searchAcrossEntities", "search")?;
    let entities = array_at(root, "/searchResults")
        .iter()
        .filter_map(|hit| hit.get("entity"))
        .map(entity_summary)
        .collect::<ClientResult<Vec<_>>>()?;
    Ok(SearchResult {
        total: usize_at(root, "/total").unwrap_or(entities.len()),
        entities,
        offset,
        limit,
    })
}

pub fn entity(data: &Value, urn: &str) -> ClientResult<Entity> {
    let root = object_at(data, "/entity", urn)?;
    let urn = required_urn(root)?;
    let owners = array_at(root, "/ownership/owners")
        .iter()
        .filter_map(|item| {
            let owner = item.get("owner")?;
            Some(Owner {
                urn: string_at(owner, "/urn")?,
                owner_type: string_at(item, "/type"),
                name: string_at(owner, "/username").or_else(|| string_at(owner, "/name")),
            })
        })
        .collect();
    let links = array_at(root, "/institutionalMemory/elements")
        .iter()
        .filter_map(|item| {
            Some(Link {
                url: string_at(item, "/url")?,
                description: string_at(item, "/description"),
            })
        })
        .collect();
    let properties: BTreeMap<String, String> = array_at(root, "/properties/customProperties")
        .iter()
        .filter_map(|item| Some((string_at(item, "/key")?, string_at(item, "/value")?)))
        .collect();

    Ok(Entity {
        entity_type: entity_type(root, &urn),
        name: display_name(root),
        platform: string_at(root, "/platform/name"),
        description: description(root),
        owners,
        tags: tag_refs(root, "/tags/tags"),
        glossary_terms: term_refs(root, "/glossaryTerms/terms"),
        domain: root.pointer("/domain/domain").and_then(named_ref),
        links,
        properties,
        last_modified_ms: root.pointer("/lastModified/time").and_then(Value::as_i64),
        urn,
    })
}

pub fn schema(data: &Value, urn: &str) -> ClientResult<SchemaMetadata> {
    let root = object_at(data, "/dataset", urn)?;
    let metadata = object_at(root, "/schemaMetadata", urn)?;
    let fields = array_at(metadata, "/fields")
        .iter()
        .filter_map(|field| {
            Some(SchemaField {
                field_path: string_at(field, "/fieldPath")?,
                native_type: string_at(field, "/nativeDataType"),
                description: string_at(field, "/description"),
                nullable: field
                    .get("nullable")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                tags: tag_refs(field, "/globalTags/tags"),
                glossary_terms: term_refs(field, "/glossaryTerms/terms"),
            })
        })
        .collect();
    let primary_keys = array_at(metadata, "/primaryKeys")
        .iter()
        .filter_map(|key| key.as_str().map(str::to_string))
        .collect();
    Ok(SchemaMetadata {
        urn: required_urn(root)?,
        name: string_at(metadata, "/name").or_else(|| string_at(root, "/name")),
        fields,
        primary_keys,
    })
}

pub fn lineage(
    data: &Value,
    urn: &str,
    direction: LineageDirection,
    depth: u32,
) -> ClientResult<LineageResult> {
    let root = object_at(data, "/searchAcrossLineage", urn)?;
    let mut nodes = Vec::new();
    for hit in array_at(root, "/searchResults") {
        let Some(entity) = hit.get("entity") else {
            continue;
        };
        let summary = entity_summary(entity)?;
        let degree = hit
            .get("degree")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(1);
        if degree > depth {
            continue;
        }
        nodes.push(LineageNode {
            urn: summary.urn,
            entity_type: summary.entity_type,
            name: summary.name,
            platform: summary.platform,
            degree,
        });
    }
    Ok(LineageResult {
        urn: urn.to_string(),
        direction,
        depth,
        total: nodes.len(),
        nodes,
    })
}

fn field_of(schema_field_urn: &str) -> String {
    schema_field_urn
        .rsplit_once(',')
        .map_or(schema_field_urn, |(_, field)| field.trim_end_matches(')'))
        .to_string()
}

pub fn column_lineage(data: &Value, urn: &str) -> ClientResult<ColumnLineage> {
    let root = object_at(data, "/dataset", urn)?;
    let mut mappings = Vec::new();
    for lineage in array_at(root, "/fineGrainedLineages") {
        let transform = string_at(lineage, "/transformOperation");
        for downstream in array_at(lineage, "/downstreams") {
            let Some(downstream_field) = string_at(downstream, "/path")
                .or_else(|| string_at(downstream, "/urn").map(|value| field_of(&value)))
            else {
                continue;
            };
            for upstream in array_at(lineage, "/upstreams") {
                let Some(upstream_urn) = string_at(upstream, "/urn") else {
                    continue;
                };
                let upstream_field =
                    string_at(upstream, "/path").unwrap_or_else(|| field_of(&upstream_urn));
                mappings.push(ColumnMapping {
                    downstream_field: downstream_field.clone(),
                    upstream_urn,
                    upstream_field,
                    transform: transform.clone(),
                });
            }
        }
    }
    Ok(ColumnLineage {
        urn: urn.to_string(),
        mappings,
    })
}

pub fn queries(data: &Value, urn: &str) -> ClientResult<QueryList> {
    let root = object_at(data, "/listQueries", urn)?;
    let queries: Vec<SavedQuery> = array_at(root, "/queries")
        .iter()
        .filter_map(|query| {
            Some(SavedQuery {
                urn: string_at(query, "/urn")?,
                name: string_at(query, "/properties/name"),
                statement: string_at(query, "/properties/statement/value")?,
                description: string_at(query, "/properties/description"),
                created_by: string_at(query, "/properties/created/actor"),
            })
        })
        .collect();
    Ok(QueryList {
        urn: urn.to_string(),
        total: usize_at(root, "/total").unwrap_or(queries.len()),
        queries,
    })
}

pub fn glossary_term(data: &Value, urn: &str) -> ClientResult<GlossaryTerm> {
    let root = object_at(data, "/glossaryTerm", urn)?;
    Ok(GlossaryTerm {
        urn: required_urn(root)?,
        name: display_name(root),
        definition: string_at(root, "/properties/definition"),
        parent_node: array_at(root, "/parentNodes/nodes").first().and_then(named_ref),
        related_terms: array_at(root, "/isRelatedTerms/relationships")
            .iter()
            .filter_map(|item| item.get("entity").and_then(named_ref))
            .collect(),
    })
}

pub fn tags(data: &Value) -> ClientResult<TagList> {
    let root = object_at(data, "/search", "tags")?;
    let tags: Vec<Tag> = array_at(root, "/searchResults")
        .iter()
        .filter_map(|hit| hit.get("entity"))
        .filter_map(|entity| {
            Some(Tag {
                urn: string_at(entity, "/urn")?,
                name: display_name(entity),
                description: string_at(entity, "/properties/description"),
            })
        })
        .collect();
    Ok(TagList {
        total: usize_at(root, "/total").unwrap_or(tags.len()),
        tags,
    })
}

pub fn domains(data: &Value) -> ClientResult<DomainList> {
    let root = object_at(data, "/listDomains", "domains")?;
    let domains: Vec<Domain> = array_at(root, "/domains")
        .iter()
        .filter_map(|domain| {
            Some(Domain {
                urn: string_at(domain, "/urn")?,
                name: display_name(domain),
                description: string_at(domain, "/properties/description"),
                entity_count: usize_at(domain, "/entities/total"),
            })
        })
        .collect();
    Ok(DomainList {
        total: usize_at(root, "/total").unwrap_or(domains.len()),
        domains,
    })
}

fn data_product_record(entity: &Value) -> ClientResult<DataProduct> {
    let assets = array_at(entity, "/entities/searchResults")
        .iter()
        .filter_map(|hit| hit.get("entity"))
        .map(entity_summary)
        .collect::<ClientResult<Vec<_>>>()?;
    Ok(DataProduct {
        urn: required_urn(entity)?,
        name: display_name(entity),
        description: string_at(entity, "/properties/description"),
        domain: entity.pointer("/domain/domain").and_then(named_ref),
        assets,
    })
}

pub fn data_products(data: &Value) -> ClientResult<DataProductList> {
    let root = object_at(data, "/searchAcrossEntities", "data products")?;
    let data_products = array_at(root, "/searchResults")
        .iter()
        .filter_map(|hit| hit.get("entity"))
        .map(data_product_record)
        .collect::<ClientResult<Vec<_>>>()?;
    Ok(DataProductList {
        total: usize_at(root, "/total").unwrap_or(data_products.len()),
        data_products,
    })
}

pub fn data_product(data: &Value, urn: &str) -> ClientResult<DataProduct> {
    data_product_record(object_at(data, "/dataProduct", urn)?)
}

/// Interprets a boolean mutation result.
///
/// # Errors
/// Returns `ClientError::GraphQl` when the catalog reports `false`.
pub fn mutation_applied(data: &Value, field: &str) -> ClientResult<()> {
    match data.get(field).and_then(Value::as_bool) {
        Some(true) => Ok(()),
        Some(false) => Err(ClientError::GraphQl(format!("{field} was not applied"))),
        None => Err(ClientError::Decode(format!("missing {field} result"))),
    }
}

/// Splits a GraphQL envelope into its data, surfacing reported errors.
///
/// # Errors
/// Returns `ClientError::GraphQl` when the envelope carries errors and
/// `ClientError::Decode` when it carries no data.
pub fn envelope_data(mut payload: Value) -> ClientResult<Value> {
    let messages: Vec<String> = array_at(&payload, "/errors")
        .iter()
        .filter_map(|error| string_at(error, "/message"))
        .collect();
    if !messages.is_empty() {
        return Err(ClientError::GraphQl(messages.join("; ")));
    }
    match payload.get_mut("data").map(Value::take) {
        Some(Value::Null) | None => Err(ClientError::Decode("response has no data".to_string())),
        Some(data) => Ok(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_search_results() {
        let data = json!({
            "searchAcrossEntities": {
                "start": 0,
                "count": 2,
                "total": 12,
                "searchResults": [
                    {"entity": {
                        "urn": "urn:li:dataset:(urn:li:dataPlatform:hive,db.orders,PROD)",
                        "type": "DATASET",
                        "name": "db.orders",
                        "platform": {"name": "hive"},
                        "properties": {"name": "orders", "description": "raw"},
                        "editableProperties": {"description": "Curated orders"}
                    }},
                    {"entity": {"urn": "urn:li:tag:pii", "type": "TAG", "name": "pii"}}
                ]
            }
        });
        let result = search_result(&data, 0, 2).expect("decodes");
        assert_eq!(result.total, 12);
        assert_eq!(result.entities.len(), 2);
        let first = &result.entities[0];
        assert_eq!(first.entity_type, "dataset");
        assert_eq!(first.name.as_deref(), Some("orders"));
        assert_eq!(first.platform.as_deref(), Some("hive"));
        assert_eq!(first.description.as_deref(), Some("Curated orders"));
        assert_eq!(result.entities[1].entity_type, "tag");
    }

    #[test]
    fn missing_entity_is_not_found() {
        let data = json!({"entity": null});
        assert!(matches!(
            entity(&data, "urn:li:dataset:x"),
            Err(ClientError::NotFound(urn)) if urn == "urn:li:dataset:x"
        ));
    }

    #[test]
    fn decodes_entity_details() {
        let data = json!({"entity": {
            "urn": "urn:li:dataset:orders",
            "type": "DATASET",
            "properties": {
                "name": "orders",
                "customProperties": [{"key": "team", "value": "core"}]
            },
            "ownership": {"owners": [{
                "type": "TECHNICAL_OWNER",
                "owner": {"urn": "urn:li:corpuser:ana", "username": "ana"}
            }]},
            "tags": {"tags": [{"tag": {"urn": "urn:li:tag:pii", "name": "pii"}}]},
            "glossaryTerms": {"terms": [{
                "term": {"urn": "urn:li:glossaryTerm:Revenue", "name": "Revenue"}
            }]},
            "domain": {"domain": {"urn": "urn:li:domain:sales", "properties": {"name": "Sales"}}},
            "institutionalMemory": {"elements": [
                {"url": "https://wiki", "description": "Runbook"}
            ]},
            "lastModified": {"time": 1_700_000_000_000_i64}
        }});
        let decoded = entity(&data, "urn:li:dataset:orders").expect("decodes");
        assert_eq!(decoded.owners[0].name.as_deref(), Some("ana"));
        assert_eq!(decoded.tags[0].urn, "urn:li:tag:pii");
        assert_eq!(decoded.glossary_terms[0].name.as_deref(), Some("Revenue"));
        assert_eq!(decoded.domain.as_ref().and_then(|d| d.name.as_deref()), Some("Sales"));
        assert_eq!(decoded.links[0].url, "https://wiki");
        assert_eq!(decoded.properties["team"], "core");
        assert_eq!(decoded.last_modified_ms, Some(1_700_000_000_000));
    }

    #[test]
    fn lineage_respects_depth() {
        let data = json!({"searchAcrossLineage": {
            "total": 3,
            "searchResults": [
                {"degree": 1, "entity": {"urn": "urn:li:dataset:a", "type": "DATASET"}},
                {"degree": 2, "entity": {"urn": "urn:li:dataset:b", "type": "DATASET"}},
                {"degree": 3, "entity": {"urn": "urn:li:dataset:c", "type": "DATASET"}}
            ]
        }});
        let result = lineage(&data, "urn:li:dataset:root", LineageDirection::Downstream, 2)
            .expect("decodes");
        assert_eq!(result.total, 2);
        assert_eq!(result.nodes[1].urn, "urn:li:dataset:b");
    }

    #[test]
    fn column_lineage_pairs_every_upstream() {
        let data = json!({"dataset": {
            "urn": "urn:li:dataset:t",
            "fineGrainedLineages": [{
                "upstreams": [
                    {"urn": "urn:li:schemaField:(urn:li:dataset:a,id)", "path": "id"},
                    {"urn": "urn:li:schemaField:(urn:li:dataset:b,order_id)"}
                ],
                "downstreams": [{"urn": "urn:li:schemaField:(urn:li:dataset:t,order_key)"}],
                "transformOperation": "COALESCE"
            }]
        }});
        let result = column_lineage(&data, "urn:li:dataset:t").expect("decodes");
        assert_eq!(result.mappings.len(), 2);
        assert_eq!(result.mappings[0].downstream_field, "order_key");
        assert_eq!(result.mappings[0].upstream_field, "id");
        assert_eq!(result.mappings[1].upstream_field, "order_id");
        assert_eq!(result.mappings[1].transform.as_deref(), Some("COALESCE"));
    }

    #[test]
    fn envelope_surfaces_graphql_errors() {
        let payload = json!({"errors": [{"message": "Unauthorized"}], "data": null});
        assert!(matches!(
            envelope_data(payload),
            Err(ClientError::GraphQl(message)) if message == "Unauthorized"
        ));
        let payload = json!({"data": {"ok": true}});
        assert_eq!(envelope_data(payload).expect("data"), json!({"ok": true}));
    }

    #[test]
    fn mutation_false_is_an_error() {
        assert!(mutation_applied(&json!({"addTag": true}), "addTag").is_ok());
        assert!(matches!(
            mutation_applied(&json!({"addTag": false}), "addTag"),
            Err(ClientError::GraphQl(_))
        ));
    }
}
