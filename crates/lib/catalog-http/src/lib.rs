//! GraphQL-over-HTTP catalog client.
//!
//! [`HttpCatalogClient`] implements [`CatalogClient`] against the catalog's
//! `/api/graphql` endpoint. Transport failures, `429` and `5xx` responses are
//! retried up to the connection's retry budget with exponential backoff; all
//! other failures are returned to the caller unchanged.

mod decode;
mod graphql;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use catalog_core::client::{CatalogClient, ClientError, ClientResult, LineageQuery};
use catalog_core::config::ClientConfig;
use catalog_core::services::{BuildClientFn, BuildClientFuture, ConnectionError, SharedClient};
use catalog_store::models::{
    ColumnLineage,
    DataProduct,
    DataProductList,
    DomainList,
    Entity,
    GlossaryTerm,
    LineageResult,
    MutationReport,
    PingReport,
    QueryList,
    SchemaMetadata,
    SearchRequest,
    SearchResult,
    TagList,
};
use catalog_store::schema::{ENTITY_DATA_PRODUCT, ENTITY_TAG};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::{debug, warn};

const GRAPHQL_PATH: &str = "/api/graphql";
const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Catalog client speaking the GraphQL API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    retry_max: u32,
}

impl HttpCatalogClient {
    /// Builds a client for a resolved connection config.
    ///
    /// # Errors
    /// Returns `ClientError::InvalidInput` for a blank url and
    /// `ClientError::Transport` when the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base = config.url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(ClientError::InvalidInput("catalog url is required".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("{base}{GRAPHQL_PATH}"),
            token: config.token.clone(),
            retry_max: config.retry_max,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(&self, document: &str, variables: Value) -> ClientResult<Value> {
        let body = json!({ "query": document, "variables": variables });
        let mut attempt = 0_u32;
        loop {
            let mut request = self.http.post(&self.endpoint).json(&body);
            if !self.token.is_empty() {
                request = request.bearer_auth(&self.token);
            }

            let failure = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let payload: Value = response
                            .json()
                            .await
                            .map_err(|err| ClientError::Decode(err.to_string()))?;
                        return decode::envelope_data(payload);
                    }
                    let body = response.text().await.unwrap_or_default();
                    let error = ClientError::Status {
                        status: status.as_u16(),
                        body,
                    };
                    if !is_retryable_status(status) {
                        return Err(error);
                    }
                    error
                }
                Err(err) => {
                    let retryable = err.is_timeout() || err.is_connect() || err.is_request();
                    let error = ClientError::Transport(err.to_string());
                    if !retryable {
                        return Err(error);
                    }
                    error
                }
            };

            if attempt >= self.retry_max {
                return Err(failure);
            }
            attempt += 1;
            let delay = backoff(attempt);
            warn!(
                endpoint = %self.endpoint,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "retrying catalog request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn mutate(
        &self,
        document: &str,
        field: &str,
        input: Value,
        urn: &str,
        operation: &str,
    ) -> ClientResult<MutationReport> {
        debug!(urn, operation, "applying catalog mutation");
        let data = self.execute(document, json!({ "input": input })).await?;
        decode::mutation_applied(&data, field)?;
        Ok(MutationReport::applied(urn, operation))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status.as_u16() == StatusCode::TOO_MANY_REQUESTS.as_u16()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS << attempt.min(MAX_BACKOFF_EXPONENT))
}

fn subresource(urn: &str, field_path: Option<&str>) -> Value {
    match field_path.filter(|path| !path.is_empty()) {
        Some(path) => json!({
            "resourceUrn": urn,
            "subResource": path,
            "subResourceType": "DATASET_FIELD",
        }),
        None => json!({ "resourceUrn": urn }),
    }
}

fn with_subresource(mut input: Value, urn: &str, field_path: Option<&str>) -> Value {
    if let (Value::Object(target), Value::Object(extra)) =
        (&mut input, subresource(urn, field_path))
    {
        target.extend(extra);
    }
    input
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn search(&self, request: SearchRequest) -> ClientResult<SearchResult> {
        let mut input = json!({
            "query": if request.query.trim().is_empty() { "*" } else { request.query.as_str() },
            "start": request.offset,
            "count": request.limit,
        });
        if let Some(entity_type) = request.entity_type.as_deref() {
            input["types"] = json!([entity_type.to_ascii_uppercase()]);
        }
        if let Some(platform) = request.platform.as_deref() {
            input["orFilters"] = json!([{
                "and": [{ "field": "platform", "values": [platform] }]
            }]);
        }
        let data = self
            .execute(&graphql::search_query(), json!({ "input": input }))
            .await?;
        decode::search_result(&data, request.offset, request.limit)
    }

    async fn get_entity(&self, urn: &str) -> ClientResult<Entity> {
        let data = self
            .execute(graphql::ENTITY_QUERY, json!({ "urn": urn }))
            .await?;
        decode::entity(&data, urn)
    }

    async fn get_schema(&self, urn: &str) -> ClientResult<SchemaMetadata> {
        let data = self
            .execute(graphql::SCHEMA_QUERY, json!({ "urn": urn }))
            .await?;
        decode::schema(&data, urn)
    }

    async fn get_lineage(&self, urn: &str, query: LineageQuery) -> ClientResult<LineageResult> {
        let degrees: Vec<String> = (1..=query.depth.max(1))
            .map(|degree| degree.to_string())
            .collect();
        let input = json!({
            "urn": urn,
            "direction": query.direction.as_str(),
            "query": "*",
            "start": 0,
            "count": query.limit,
            "orFilters": [{ "and": [{
                "field": "degree",
                "values": degrees,
            }] }],
        });
        let data = self
            .execute(&graphql::lineage_query(), json!({ "input": input }))
            .await?;
        decode::lineage(&data, urn, query.direction, query.depth.max(1))
    }

    async fn get_column_lineage(&self, urn: &str) -> ClientResult<ColumnLineage> {
        let data = self
            .execute(graphql::COLUMN_LINEAGE_QUERY, json!({ "urn": urn }))
            .await?;
        decode::column_lineage(&data, urn)
    }

    async fn get_queries(&self, urn: &str, limit: usize) -> ClientResult<QueryList> {
        let input = json!({ "datasetUrn": urn, "start": 0, "count": limit });
        let data = self
            .execute(graphql::QUERIES_QUERY, json!({ "input": input }))
            .await?;
        decode::queries(&data, urn)
    }

    async fn get_glossary_term(&self, urn: &str) -> ClientResult<GlossaryTerm> {
        let data = self
            .execute(graphql::GLOSSARY_TERM_QUERY, json!({ "urn": urn }))
            .await?;
        decode::glossary_term(&data, urn)
    }

    async fn list_tags(&self, filter: Option<&str>, limit: usize) -> ClientResult<TagList> {
        let input = json!({
            "type": ENTITY_TAG.to_ascii_uppercase(),
            "query": filter.filter(|value| !value.trim().is_empty()).unwrap_or("*"),
            "start": 0,
            "count": limit,
        });
        let data = self
            .execute(graphql::TAGS_QUERY, json!({ "input": input }))
            .await?;
        decode::tags(&data)
    }

    async fn list_domains(&self, limit: usize) -> ClientResult<DomainList> {
        let input = json!({ "start": 0, "count": limit });
        let data = self
            .execute(graphql::DOMAINS_QUERY, json!({ "input": input }))
            .await?;
        decode::domains(&data)
    }

    async fn list_data_products(
        &self,
        domain_urn: Option<&str>,
        limit: usize,
    ) -> ClientResult<DataProductList> {
        let mut input = json!({
            "types": ["DATA_PRODUCT"],
            "query": "*",
            "start": 0,
            "count": limit,
        });
        if let Some(domain) = domain_urn.filter(|value| !value.is_empty()) {
            input["orFilters"] = json!([{ "and": [{ "field": "domains", "values": [domain] }] }]);
        }
        debug!(entity_type = ENTITY_DATA_PRODUCT, "listing data products");
        let data = self
            .execute(graphql::DATA_PRODUCTS_QUERY, json!({ "input": input }))
            .await?;
        decode::data_products(&data)
    }

    async fn get_data_product(&self, urn: &str) -> ClientResult<DataProduct> {
        let data = self
            .execute(&graphql::data_product_query(), json!({ "urn": urn }))
            .await?;
        decode::data_product(&data, urn)
    }

    async fn ping(&self) -> ClientResult<PingReport> {
        let started = Instant::now();
        let data = self.execute(graphql::PING_QUERY, json!({})).await?;
        Ok(PingReport {
            ok: true,
            version: data
                .pointer("/appConfig/appVersion")
                .and_then(Value::as_str)
                .map(str::to_string),
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn update_description(
        &self,
        urn: &str,
        description: &str,
        field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        let input = with_subresource(json!({ "description": description }), urn, field_path);
        self.mutate(
            graphql::UPDATE_DESCRIPTION_MUTATION,
            "updateDescription",
            input,
            urn,
            "update_description",
        )
        .await
    }

    async fn add_tag(
        &self,
        urn: &str,
        tag_urn: &str,
        field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        let input = with_subresource(json!({ "tagUrn": tag_urn }), urn, field_path);
        self.mutate(graphql::ADD_TAG_MUTATION, "addTag", input, urn, "add_tag")
            .await
    }

    async fn remove_tag(
        &self,
        urn: &str,
        tag_urn: &str,
        field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        let input = with_subresource(json!({ "tagUrn": tag_urn }), urn, field_path);
        self.mutate(graphql::REMOVE_TAG_MUTATION, "removeTag", input, urn, "remove_tag")
            .await
    }

    async fn add_glossary_term(
        &self,
        urn: &str,
        term_urn: &str,
        field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        let input = with_subresource(json!({ "termUrn": term_urn }), urn, field_path);
        self.mutate(graphql::ADD_TERM_MUTATION, "addTerm", input, urn, "add_glossary_term")
            .await
    }

    async fn remove_glossary_term(
        &self,
        urn: &str,
        term_urn: &str,
        field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        let input = with_subresource(json!({ "termUrn": term_urn }), urn, field_path);
        self.mutate(
            graphql::REMOVE_TERM_MUTATION,
            "removeTerm",
            input,
            urn,
            "remove_glossary_term",
        )
        .await
    }

    async fn add_link(
        &self,
        urn: &str,
        url: &str,
        description: &str,
    ) -> ClientResult<MutationReport> {
        let input = json!({ "resourceUrn": urn, "linkUrl": url, "label": description });
        self.mutate(graphql::ADD_LINK_MUTATION, "addLink", input, urn, "add_link")
            .await
    }

    async fn remove_link(&self, urn: &str, url: &str) -> ClientResult<MutationReport> {
        let input = json!({ "resourceUrn": urn, "linkUrl": url });
        self.mutate(graphql::REMOVE_LINK_MUTATION, "removeLink", input, urn, "remove_link")
            .await
    }
}

/// Factory for the connection manager that builds one [`HttpCatalogClient`]
/// per connection.
#[must_use]
pub fn http_client_factory() -> BuildClientFn {
    Arc::new(|name: String, config: ClientConfig| {
        Box::pin(async move {
            let client = HttpCatalogClient::new(&config).map_err(|err| {
                ConnectionError::BuildFailed {
                    name,
                    message: err.to_string(),
                }
            })?;
            Ok(Arc::new(client) as SharedClient)
        }) as BuildClientFuture
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_normalized() {
        let client = HttpCatalogClient::new(&ClientConfig::new("https://catalog.example/", "t"))
            .expect("client builds");
        assert_eq!(client.endpoint(), "https://catalog.example/api/graphql");
    }

    #[test]
    fn blank_url_is_rejected() {
        assert!(matches!(
            HttpCatalogClient::new(&ClientConfig::new("  ", "t")),
            Err(ClientError::InvalidInput(_))
        ));
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(400));
        assert_eq!(backoff(50), Duration::from_millis(6_400));
    }

    #[test]
    fn field_path_becomes_subresource() {
        let tag = json!({ "tagUrn": "urn:li:tag:pii" });
        let input = with_subresource(tag.clone(), "urn:li:dataset:x", Some("email"));
        assert_eq!(input["subResource"], "email");
        assert_eq!(input["subResourceType"], "DATASET_FIELD");
        let input = with_subresource(tag, "urn:li:dataset:x", None);
        assert!(input.get("subResource").is_none());
        assert_eq!(input["resourceUrn"], "urn:li:dataset:x");
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
    }
}
