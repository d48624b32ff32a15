//! GraphQL documents sent to the catalog.

pub const ENTITY_SUMMARY_FIELDS: &str = r"
    urn
    type
    ... on Dataset { name platform { name } properties { name description } editableProperties { description } }
    ... on Dashboard { platform { name } properties { name description } }
    ... on Chart { platform { name } properties { name description } }
    ... on DataFlow { platform { name } properties { name description } }
    ... on DataJob { properties { name description } }
    ... on GlossaryTerm { name properties { name definition } }
    ... on Tag { name properties { name description } }
    ... on Domain { properties { name description } }
    ... on DataProduct { properties { name description } }
";

pub fn search_query() -> String {
    format!(
        r"query search($input: SearchAcrossEntitiesInput!) {{
  searchAcrossEntities(input: $input) {{
    start
    count
    total
    searchResults {{ entity {{ {ENTITY_SUMMARY_FIELDS} }} }}
  }}
}}"
    )
}

pub const ENTITY_QUERY: &str = r"query entity($urn: String!) {
  entity(urn: $urn) {
    urn
    type
    ... on Dataset {
      name
      platform { name }
      properties { name description customProperties { key value } }
      editableProperties { description }
      ownership { owners { type owner { ... on CorpUser { urn username } ... on CorpGroup { urn name } } } }
      tags { tags { tag { urn name } } }
      glossaryTerms { terms { term { urn name } } }
      domain { domain { urn properties { name } } }
      institutionalMemory { elements { url description } }
      lastModified { time }
    }
    ... on Dashboard {
      platform { name }
      properties { name description customProperties { key value } }
      ownership { owners { type owner { ... on CorpUser { urn username } ... on CorpGroup { urn name } } } }
      tags { tags { tag { urn name } } }
      glossaryTerms { terms { term { urn name } } }
      domain { domain { urn properties { name } } }
      institutionalMemory { elements { url description } }
    }
    ... on Chart {
      platform { name }
      properties { name description customProperties { key value } }
      ownership { owners { type owner { ... on CorpUser { urn username } ... on CorpGroup { urn name } } } }
      tags { tags { tag { urn name } } }
      glossaryTerms { terms { term { urn name } } }
      domain { domain { urn properties { name } } }
    }
  }
}";

pub const SCHEMA_QUERY: &str = r"query schema($urn: String!) {
  dataset(urn: $urn) {
    urn
    name
    schemaMetadata {
      name
      primaryKeys
      fields {
        fieldPath
        nativeDataType
        description
        nullable
        globalTags { tags { tag { urn name } } }
        glossaryTerms { terms { term { urn name } } }
      }
    }
  }
}";

pub fn lineage_query() -> String {
    format!(
        r"query lineage($input: SearchAcrossLineageInput!) {{
  searchAcrossLineage(input: $input) {{
    total
    searchResults {{ degree entity {{ {ENTITY_SUMMARY_FIELDS} }} }}
  }}
}}"
    )
}

pub const COLUMN_LINEAGE_QUERY: &str = r"query columnLineage($urn: String!) {
  dataset(urn: $urn) {
    urn
    fineGrainedLineages {
      upstreams { urn path }
      downstreams { urn path }
      transformOperation
    }
  }
}";

pub const QUERIES_QUERY: &str = r"query queries($input: ListQueriesInput!) {
  listQueries(input: $input) {
    total
    queries {
      urn
      properties { name description statement { value } created { actor } }
    }
  }
}";

pub const GLOSSARY_TERM_QUERY: &str = r#"query glossaryTerm($urn: String!) {
  glossaryTerm(urn: $urn) {
    urn
    name
    properties { name definition }
    parentNodes { nodes { urn properties { name } } }
    isRelatedTerms: relationships(input: { types: ["IsA"], direction: OUTGOING, start: 0, count: 50 }) {
      relationships { entity { urn ... on GlossaryTerm { name properties { name } } } }
    }
  }
}"#;

pub const TAGS_QUERY: &str = r"query tags($input: SearchInput!) {
  search(input: $input) {
    total
    searchResults { entity { urn ... on Tag { name properties { name description } } } }
  }
}";

pub const DOMAINS_QUERY: &str = r"query domains($input: ListDomainsInput!) {
  listDomains(input: $input) {
    total
    domains { urn properties { name description } entities(input: { start: 0, count: 0 }) { total } }
  }
}";

pub const DATA_PRODUCTS_QUERY: &str = r"query dataProducts($input: SearchAcrossEntitiesInput!) {
  searchAcrossEntities(input: $input) {
    total
    searchResults {
      entity {
        urn
        ... on DataProduct { properties { name description } domain { domain { urn properties { name } } } }
      }
    }
  }
}";

pub fn data_product_query() -> String {
    format!(
        r"query dataProduct($urn: String!) {{
  dataProduct(urn: $urn) {{
    urn
    properties {{ name description }}
    domain {{ domain {{ urn properties {{ name }} }} }}
    entities(input: {{ start: 0, count: 100 }}) {{ searchResults {{ entity {{ {ENTITY_SUMMARY_FIELDS} }} }} }}
  }}
}}"
    )
}

pub const PING_QUERY: &str = r"query ping { appConfig { appVersion } }";

pub const UPDATE_DESCRIPTION_MUTATION: &str =
    r"mutation updateDescription($input: DescriptionUpdateInput!) { updateDescription(input: $input) }";
pub const ADD_TAG_MUTATION: &str =
    r"mutation addTag($input: TagAssociationInput!) { addTag(input: $input) }";
pub const REMOVE_TAG_MUTATION: &str =
    r"mutation removeTag($input: TagAssociationInput!) { removeTag(input: $input) }";
pub const ADD_TERM_MUTATION: &str =
    r"mutation addTerm($input: TermAssociationInput!) { addTerm(input: $input) }";
pub const REMOVE_TERM_MUTATION: &str =
    r"mutation removeTerm($input: TermAssociationInput!) { removeTerm(input: $input) }";
pub const ADD_LINK_MUTATION: &str =
    r"mutation addLink($input: AddLinkInput!) { addLink(input: $input) }";
pub const REMOVE_LINK_MUTATION: &str =
    r"mutation removeLink($input: RemoveLinkInput!) { removeLink(input: $input) }";
