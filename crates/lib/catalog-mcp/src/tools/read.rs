use std::sync::Arc;

use catalog_core::client::LineageQuery;
use catalog_store::models::SearchRequest;
use serde_json::{Map, Value};

use super::params::{
    ConnectionList,
    ConnectionParams,
    LineageParams,
    ListConnectionsParams,
    ListDataProductsParams,
    ListDomainsParams,
    ListTagsParams,
    QueriesParams,
    SearchParams,
    UrnParams,
};
use super::{
    DEFAULT_LINEAGE_DEPTH,
    MAX_LINEAGE_DEPTH,
    Outcome,
    ToolState,
    guarded,
    subject_urn,
    to_json,
};
use crate::context::{CallContext, ToolOutput};
use crate::query_context::{
    EXECUTION_CONTEXT_KEY,
    entity_context,
    execution_context,
    merge_top_level,
};

/// Adds `execution_context` for the urns of a result set when a provider knows them.
async fn with_execution_context(
    state: &ToolState,
    call: &CallContext,
    payload: Value,
    urns: Vec<String>,
) -> Value {
    let Some(provider) = state.query_context.as_deref() else {
        return payload;
    };
    match execution_context(provider, call, &urns).await {
        Some(context) => {
            let mut fields = Map::new();
            fields.insert(EXECUTION_CONTEXT_KEY.to_string(), context);
            merge_top_level(payload, fields)
        }
        None => payload,
    }
}

pub(super) async fn search(
    state: Arc<ToolState>,
    call: CallContext,
    params: SearchParams,
) -> Outcome<ToolOutput> {
    let target = state.target(&call, params.connection.as_deref()).await?;
    let request = SearchRequest {
        query: params.query.trim().to_string(),
        entity_type: params.entity_type.filter(|value| !value.trim().is_empty()),
        platform: params.platform.filter(|value| !value.trim().is_empty()),
        offset: params.offset.unwrap_or(0),
        limit: target.config.effective_limit(params.limit),
    };
    let result = guarded(&call, target.client.search(request)).await?;
    let urns = result.entities.iter().map(|entity| entity.urn.clone()).collect();
    let payload = with_execution_context(&state, &call, to_json(&result)?, urns).await;
    Ok(ToolOutput::json_value(payload))
}

pub(super) async fn get_entity(
    state: Arc<ToolState>,
    call: CallContext,
    params: UrnParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let entity = guarded(&call, target.client.get_entity(&urn)).await?;
    let mut payload = to_json(&entity)?;
    if let Some(provider) = state.query_context.as_deref() {
        let fields = entity_context(provider, &call, &urn).await;
        payload = merge_top_level(payload, fields);
    }
    Ok(ToolOutput::json_value(payload))
}

pub(super) async fn get_schema(
    state: Arc<ToolState>,
    call: CallContext,
    params: UrnParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let schema = guarded(&call, target.client.get_schema(&urn)).await?;
    Ok(ToolOutput::json(&schema))
}

pub(super) async fn get_lineage(
    state: Arc<ToolState>,
    call: CallContext,
    params: LineageParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let query = LineageQuery {
        direction: params.direction.unwrap_or_default(),
        depth: params
            .depth
            .unwrap_or(DEFAULT_LINEAGE_DEPTH)
            .clamp(1, MAX_LINEAGE_DEPTH),
        limit: target.config.effective_limit(params.limit),
    };
    let lineage = guarded(&call, target.client.get_lineage(&urn, query)).await?;
    let urns = lineage.nodes.iter().map(|node| node.urn.clone()).collect();
    let payload = with_execution_context(&state, &call, to_json(&lineage)?, urns).await;
    Ok(ToolOutput::json_value(payload))
}

pub(super) async fn get_column_lineage(
    state: Arc<ToolState>,
    call: CallContext,
    params: UrnParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let lineage = guarded(&call, target.client.get_column_lineage(&urn)).await?;
    Ok(ToolOutput::json(&lineage))
}

pub(super) async fn get_queries(
    state: Arc<ToolState>,
    call: CallContext,
    params: QueriesParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let limit = target.config.effective_limit(params.limit);
    let queries = guarded(&call, target.client.get_queries(&urn, limit)).await?;
    Ok(ToolOutput::json(&queries))
}

pub(super) async fn get_glossary_term(
    state: Arc<ToolState>,
    call: CallContext,
    params: UrnParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let term = guarded(&call, target.client.get_glossary_term(&urn)).await?;
    Ok(ToolOutput::json(&term))
}

pub(super) async fn list_tags(
    state: Arc<ToolState>,
    call: CallContext,
    params: ListTagsParams,
) -> Outcome<ToolOutput> {
    let target = state.target(&call, params.connection.as_deref()).await?;
    let limit = target.config.effective_limit(params.limit);
    let tags = guarded(&call, target.client.list_tags(params.filter.as_deref(), limit)).await?;
    Ok(ToolOutput::json(&tags))
}

pub(super) async fn list_domains(
    state: Arc<ToolState>,
    call: CallContext,
    params: ListDomainsParams,
) -> Outcome<ToolOutput> {
    let target = state.target(&call, params.connection.as_deref()).await?;
    let limit = target.config.effective_limit(params.limit);
    let domains = guarded(&call, target.client.list_domains(limit)).await?;
    Ok(ToolOutput::json(&domains))
}

pub(super) async fn list_data_products(
    state: Arc<ToolState>,
    call: CallContext,
    params: ListDataProductsParams,
) -> Outcome<ToolOutput> {
    let target = state.target(&call, params.connection.as_deref()).await?;
    let limit = target.config.effective_limit(params.limit);
    let domain = params
        .domain_urn
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let products = guarded(&call, target.client.list_data_products(domain, limit)).await?;
    Ok(ToolOutput::json(&products))
}

pub(super) async fn get_data_product(
    state: Arc<ToolState>,
    call: CallContext,
    params: UrnParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let product = guarded(&call, target.client.get_data_product(&urn)).await?;
    Ok(ToolOutput::json(&product))
}

pub(super) async fn list_connections(
    state: Arc<ToolState>,
    _call: CallContext,
    _params: ListConnectionsParams,
) -> Outcome<ToolOutput> {
    let connections = &state.connections;
    Ok(ToolOutput::json(&ConnectionList {
        default: connections.default_name().to_string(),
        connections: connections.connection_infos(),
    }))
}

pub(super) async fn ping(
    state: Arc<ToolState>,
    call: CallContext,
    params: ConnectionParams,
) -> Outcome<ToolOutput> {
    let target = state.target(&call, params.connection.as_deref()).await?;
    let report = guarded(&call, target.client.ping()).await?;
    Ok(ToolOutput::json(&report))
}
