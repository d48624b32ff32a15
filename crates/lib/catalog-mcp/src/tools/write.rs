use std::sync::Arc;

use catalog_store::schema::{make_glossary_term_urn, make_tag_urn};
use tracing::info;

use super::params::{
    AddLinkParams,
    GlossaryTermParams,
    RemoveLinkParams,
    TagParams,
    UpdateDescriptionParams,
};
use super::{Failure, Outcome, ToolState, guarded, subject_urn};
use crate::context::{CallContext, ToolOutput};

fn field_path(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|path| !path.is_empty())
}

/// Accepts a full urn or a bare name turned into one by `make`.
fn label_urn(value: &str, what: &str, make: fn(&str) -> String) -> Outcome<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Failure::soft(format!("{what} is required")));
    }
    Ok(make(value))
}

fn required<'a>(value: &'a str, what: &str) -> Outcome<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Failure::soft(format!("{what} is required")));
    }
    Ok(value)
}

pub(super) async fn update_description(
    state: Arc<ToolState>,
    call: CallContext,
    params: UpdateDescriptionParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let path = field_path(params.field_path.as_deref());
    let report = guarded(
        &call,
        target.client.update_description(&urn, &params.description, path),
    )
    .await?;
    info!(urn = %urn, field_path = ?path, "updated description");
    Ok(ToolOutput::json(&report))
}

pub(super) async fn add_tag(
    state: Arc<ToolState>,
    call: CallContext,
    params: TagParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let tag = label_urn(&params.tag, "tag", make_tag_urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let path = field_path(params.field_path.as_deref());
    let report = guarded(&call, target.client.add_tag(&urn, &tag, path)).await?;
    info!(urn = %urn, tag = %tag, "added tag");
    Ok(ToolOutput::json(&report))
}

pub(super) async fn remove_tag(
    state: Arc<ToolState>,
    call: CallContext,
    params: TagParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let tag = label_urn(&params.tag, "tag", make_tag_urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let path = field_path(params.field_path.as_deref());
    let report = guarded(&call, target.client.remove_tag(&urn, &tag, path)).await?;
    info!(urn = %urn, tag = %tag, "removed tag");
    Ok(ToolOutput::json(&report))
}

pub(super) async fn add_glossary_term(
    state: Arc<ToolState>,
    call: CallContext,
    params: GlossaryTermParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let term = label_urn(&params.term, "term", make_glossary_term_urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let path = field_path(params.field_path.as_deref());
    let report = guarded(&call, target.client.add_glossary_term(&urn, &term, path)).await?;
    info!(urn = %urn, term = %term, "added glossary term");
    Ok(ToolOutput::json(&report))
}

pub(super) async fn remove_glossary_term(
    state: Arc<ToolState>,
    call: CallContext,
    params: GlossaryTermParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let term = label_urn(&params.term, "term", make_glossary_term_urn)?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let path = field_path(params.field_path.as_deref());
    let report = guarded(&call, target.client.remove_glossary_term(&urn, &term, path)).await?;
    info!(urn = %urn, term = %term, "removed glossary term");
    Ok(ToolOutput::json(&report))
}

pub(super) async fn add_link(
    state: Arc<ToolState>,
    call: CallContext,
    params: AddLinkParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let url = required(&params.url, "url")?;
    let label = params
        .description
        .as_deref()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(url);
    let target = state.target(&call, params.connection.as_deref()).await?;
    let report = guarded(&call, target.client.add_link(&urn, url, label)).await?;
    info!(urn = %urn, url, "added link");
    Ok(ToolOutput::json(&report))
}

pub(super) async fn remove_link(
    state: Arc<ToolState>,
    call: CallContext,
    params: RemoveLinkParams,
) -> Outcome<ToolOutput> {
    let urn = subject_urn(&call, &params.urn)?;
    let url = required(&params.url, "url")?;
    let target = state.target(&call, params.connection.as_deref()).await?;
    let report = guarded(&call, target.client.remove_link(&urn, url)).await?;
    info!(urn = %urn, url, "removed link");
    Ok(ToolOutput::json(&report))
}
