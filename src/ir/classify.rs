//! Channel-operation classification.
//!
//! Walks the document's single channel and reconciles its publish and
//! subscribe message sets into operation seeds: every publish message becomes
//! a request seed annotated with its matched response union; subscribe
//! messages consumed as responses are excluded from re-emission; the leftover
//! subscribe messages become server-push seeds. Close-frame sentinels are
//! excluded everywhere, handled by the generic close machinery instead.

use std::collections::BTreeSet;

use crate::error::GenerateError;
use crate::spec::{AsyncApiDoc, Channel, ResponseTypeMode, Schema, SchemaKind};

use super::catalog::Catalog;
use super::dispatch::dispatcher_present;
use super::plan::{DispatcherConfig, OperationSeed, ResolvedResponse};
use super::response::{is_close_frame, resolve_return_type};

/// The classified single channel: request seeds and push seeds in order.
#[derive(Debug)]
pub struct ClassifiedChannel {
    /// Channel path, e.g. `/chat/{roomId}`.
    pub channel_path: String,
    /// Seeds from publish messages, in declaration order.
    pub requests: Vec<OperationSeed>,
    /// Seeds from subscribe-only messages not consumed as responses.
    pub pushes: Vec<OperationSeed>,
}

/// Classify the document's channel operations into operation seeds.
///
/// Fails with [`GenerateError::MultipleChannelsUnsupported`] unless the
/// document declares exactly one channel.
pub fn classify(
    doc: &AsyncApiDoc,
    catalog: &Catalog<'_>,
    dispatcher: &DispatcherConfig,
) -> Result<ClassifiedChannel, GenerateError> {
    let (path, channel) = single_channel(doc)?;

    // Subscribe-side message names not yet consumed as a response to some
    // publish request.
    let mut remaining: BTreeSet<String> = BTreeSet::new();
    if let Some(subscribe) = &channel.subscribe {
        if let Some(message) = &subscribe.message {
            for mref in message.members() {
                let (name, definition) = catalog.deref_message(mref)?;
                if is_close_frame(catalog, name, definition) {
                    continue;
                }
                remaining.insert(name.to_string());
            }
        }
    }

    let mut requests = Vec::new();
    if let Some(publish) = &channel.publish {
        if let Some(message) = &publish.message {
            for mref in message.members() {
                let (name, definition) = catalog.deref_message(mref)?;
                if is_close_frame(catalog, name, definition) {
                    continue;
                }
                let (payload_name, payload) = catalog.message_payload(name, definition)?;
                if !dispatcher_present(catalog, payload, payload_name, &dispatcher.key, true)? {
                    return Err(GenerateError::DispatcherMissing {
                        key: dispatcher.key.clone(),
                        schema: payload_name.to_string(),
                    });
                }

                let response = resolve_return_type(catalog, name, definition, &dispatcher.key)?;
                if let Some(resolved) = &response {
                    // Response unions carry PascalCase type names; compare the
                    // subscribe names under the same normalization.
                    remaining
                        .retain(|n| !resolved.type_names.contains(&super::utils::to_pascal_case(n)));
                }

                requests.push(OperationSeed {
                    request_name: name.to_string(),
                    summary: definition.summary.clone(),
                    uses_correlation_id: uses_correlation_id(catalog, payload, dispatcher)?,
                    is_subscribe_push: false,
                    response,
                });
            }
        }
    }

    let mut pushes = Vec::new();
    if let Some(subscribe) = &channel.subscribe {
        if let Some(message) = &subscribe.message {
            for mref in message.members() {
                let (name, definition) = catalog.deref_message(mref)?;
                if !remaining.contains(name) {
                    continue;
                }
                remaining.remove(name);
                let (payload_name, payload) = catalog.message_payload(name, definition)?;
                if !dispatcher_present(catalog, payload, payload_name, &dispatcher.key, true)? {
                    return Err(GenerateError::DispatcherMissing {
                        key: dispatcher.key.clone(),
                        schema: payload_name.to_string(),
                    });
                }

                // A push with an explicit simple-rpc marker yields one message
                // per registration; everything else is an unbounded push stream.
                let streaming = definition.response_type != Some(ResponseTypeMode::SimpleRpc);
                pushes.push(OperationSeed {
                    request_name: name.to_string(),
                    summary: definition.summary.clone(),
                    response: Some(ResolvedResponse {
                        type_names: vec![super::utils::to_pascal_case(name)],
                        streaming,
                    }),
                    uses_correlation_id: false,
                    is_subscribe_push: true,
                });
            }
        }
    }

    Ok(ClassifiedChannel {
        channel_path: path.to_string(),
        requests,
        pushes,
    })
}

/// Extract the document's single channel.
fn single_channel(doc: &AsyncApiDoc) -> Result<(&str, &Channel), GenerateError> {
    let count = doc.channels.len();
    if count != 1 {
        return Err(GenerateError::MultipleChannelsUnsupported { count });
    }
    doc.channels
        .iter()
        .next()
        .map(|(path, channel)| (path.as_str(), channel))
        .ok_or(GenerateError::MultipleChannelsUnsupported { count })
}

/// Whether the request schema carries the configured stream-id field.
///
/// Objects check their own properties; refs follow the target; `allOf`
/// succeeds if any member carries it; `oneOf` only if every branch does,
/// since the id is stamped onto whichever variant is sent.
fn uses_correlation_id(
    catalog: &Catalog<'_>,
    schema: &Schema,
    dispatcher: &DispatcherConfig,
) -> Result<bool, GenerateError> {
    let Some(stream_id) = &dispatcher.stream_id_key else {
        return Ok(false);
    };
    schema_has_property(catalog, schema, stream_id)
}

fn schema_has_property(
    catalog: &Catalog<'_>,
    schema: &Schema,
    name: &str,
) -> Result<bool, GenerateError> {
    match schema.kind() {
        SchemaKind::Ref(ref_path) => {
            let target = catalog.resolve_schema(ref_path)?;
            schema_has_property(catalog, target, name)
        }
        SchemaKind::Object(obj) => Ok(obj
            .properties
            .as_ref()
            .is_some_and(|props| props.contains_key(name))),
        SchemaKind::AllOf(members) => {
            for member in members {
                if schema_has_property(catalog, member, name)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        SchemaKind::OneOf(branches) => {
            for branch in branches {
                if !schema_has_property(catalog, branch, name)? {
                    return Ok(false);
                }
            }
            Ok(!branches.is_empty())
        }
        SchemaKind::Primitive(_) | SchemaKind::Unspecified => Ok(false),
    }
}
