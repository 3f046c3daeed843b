//! Whole-document client assembly.
//!
//! Drives the catalog, classifier and planner over the parsed document and
//! produces the final [`ClientPlan`]: dispatcher config, server URL with
//! template-variable substitution, auth config, handshake parameter groups,
//! message-type declarations, the two background loop specs, and the ordered
//! member list (fields, init, loops, remote operations, close).

use tracing::debug;
use url::Url;

use crate::error::GenerateError;
use crate::spec::{AsyncApiDoc, SchemaKind, Server};

use super::catalog::Catalog;
use super::classify::classify;
use super::plan::{
    AuthPlan, ClientPlan, ClosePlan, CloseStep, DispatcherConfig, FieldDecl, InitPlan, InitStep,
    MemberDecl, MessageTypeDecl, OperationPlan, ParamDecl, ReadLoopPlan, ResponseMode, RouteRule,
    StreamAdapterDecl, WRITE_QUEUE_CAPACITY, WriteLoopPlan,
};
use super::planner::plan_operation;
use super::response::is_close_frame;
use super::utils::{sanitize_identifier, schema_display_type, to_pascal_case};

/// Default endpoint when the document declares no servers.
const DEFAULT_SERVER_URL: &str = "ws://localhost:8080";

/// Accumulated generation state threaded through assembly.
///
/// Explicit context instead of shared mutable state: every assembly step
/// appends here and the final plan is built from it in one place.
#[derive(Debug, Default)]
struct GenContext {
    message_types: Vec<MessageTypeDecl>,
    members: Vec<MemberDecl>,
    stream_adapters: Vec<StreamAdapterDecl>,
    routes: Vec<RouteRule>,
}

/// Produce the complete generation plan for a parsed document.
pub fn plan_client(doc: &AsyncApiDoc) -> Result<ClientPlan, GenerateError> {
    let catalog = Catalog::new(doc);

    // Dispatcher extraction happens first: a missing key aborts before any
    // operation classification.
    let dispatcher = extract_dispatcher(doc)?;
    let classified = classify(doc, &catalog, &dispatcher)?;
    debug!(
        channel = %classified.channel_path,
        requests = classified.requests.len(),
        pushes = classified.pushes.len(),
        "classified channel operations"
    );

    let server_url = resolve_server_url(doc)?;
    let auth = extract_auth(doc);
    let (path_params, query_params, header_params) = extract_params(doc, &catalog)?;

    let mut ctx = GenContext::default();
    collect_message_types(&catalog, &mut ctx);

    let mut operations: Vec<OperationPlan> = Vec::new();
    for seed in classified
        .requests
        .iter()
        .chain(classified.pushes.iter())
    {
        let op = plan_operation(seed, &dispatcher);
        collect_routes(&op, &mut ctx);
        if op.response_mode == ResponseMode::Streaming {
            ctx.stream_adapters.push(StreamAdapterDecl {
                name: format!("{}Stream", to_pascal_case(&op.request_name)),
                item_union: op.response_type_union.clone(),
            });
        }
        operations.push(op);
    }

    assemble_members(&dispatcher, operations, &mut ctx);
    let envelope_types = envelope_types(&dispatcher);

    Ok(ClientPlan {
        client_name: client_name(doc),
        dispatcher,
        server_url,
        auth,
        path_params,
        query_params,
        header_params,
        message_types: ctx.message_types,
        envelope_types,
        members: ctx.members,
        stream_adapters: ctx.stream_adapters,
    })
}

/// The internal envelope records the read loop decodes routing fields into.
///
/// Only the dispatcher key (and the correlation id, when configured) is
/// decoded before routing; full payload binding happens at the consumer.
fn envelope_types(dispatcher: &DispatcherConfig) -> Vec<MessageTypeDecl> {
    let key_field = FieldDecl {
        name: dispatcher.key.clone(),
        type_name: "string".to_string(),
        required: true,
    };
    let mut envelopes = vec![MessageTypeDecl {
        name: "RawEnvelope".to_string(),
        description: None,
        fields: vec![key_field.clone()],
    }];
    if let Some(id) = &dispatcher.stream_id_key {
        envelopes.push(MessageTypeDecl {
            name: "CorrelatedEnvelope".to_string(),
            description: None,
            fields: vec![
                key_field,
                FieldDecl {
                    name: id.clone(),
                    type_name: "string".to_string(),
                    required: true,
                },
            ],
        });
    }
    envelopes
}

/// Parse a document from JSON and produce its generation plan.
pub fn plan_from_json(json: &str) -> Result<ClientPlan, GenerateError> {
    let doc = AsyncApiDoc::from_json(json)?;
    plan_client(&doc)
}

/// Extract the process-wide dispatcher config from the document extensions.
fn extract_dispatcher(doc: &AsyncApiDoc) -> Result<DispatcherConfig, GenerateError> {
    let key = doc
        .dispatcher_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(GenerateError::NoDispatcherKey)?;
    let stream_id_key = doc
        .dispatcher_stream_id
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from);
    Ok(DispatcherConfig {
        key: key.to_string(),
        stream_id_key,
    })
}

/// Resolve the default server URL, substituting template variables with their
/// declared defaults.
fn resolve_server_url(doc: &AsyncApiDoc) -> Result<String, GenerateError> {
    // Deterministic pick: lowest server name wins.
    let mut servers: Vec<(&String, &Server)> = doc.servers.iter().collect();
    servers.sort_by_key(|(name, _)| *name);
    let Some((_, server)) = servers.first() else {
        return Ok(DEFAULT_SERVER_URL.to_string());
    };

    let mut resolved = server.url.clone();
    for (name, variable) in &server.variables {
        let placeholder = format!("{{{name}}}");
        if !resolved.contains(&placeholder) {
            continue;
        }
        let Some(default) = &variable.default else {
            return Err(GenerateError::InvalidSchema {
                context: format!("server variable '{name}' has no default value"),
            });
        };
        resolved = resolved.replace(&placeholder, default);
    }
    if resolved.contains('{') {
        return Err(GenerateError::InvalidSchema {
            context: format!("server url '{resolved}' has unresolved template variables"),
        });
    }

    // The scheme may be implied by `protocol` when the url is host:port only.
    let with_scheme = if resolved.contains("://") {
        resolved
    } else {
        let scheme = server.protocol.as_deref().unwrap_or("ws");
        format!("{scheme}://{resolved}")
    };
    Url::parse(&with_scheme).map_err(|e| GenerateError::InvalidSchema {
        context: format!("server url '{with_scheme}' is not a valid URL: {e}"),
    })?;
    Ok(with_scheme)
}

/// Derive the auth plan from the first server's security requirements.
fn extract_auth(doc: &AsyncApiDoc) -> AuthPlan {
    let schemes = doc
        .components
        .as_ref()
        .and_then(|c| c.security_schemes.as_ref());
    let Some(schemes) = schemes else {
        return AuthPlan::None;
    };

    let mut servers: Vec<(&String, &Server)> = doc.servers.iter().collect();
    servers.sort_by_key(|(name, _)| *name);
    let required = servers
        .first()
        .and_then(|(_, s)| s.security.as_ref())
        .into_iter()
        .flatten()
        .flat_map(|req| req.keys());

    for scheme_name in required {
        let Some(scheme) = schemes.get(scheme_name) else {
            continue;
        };
        match scheme.scheme_type.as_str() {
            "http" if scheme.scheme.as_deref() == Some("bearer") => {
                return AuthPlan::BearerToken;
            }
            "userPassword" => return AuthPlan::BasicAuth,
            "apiKey" => {
                return AuthPlan::ApiKey {
                    name: scheme.name.clone().unwrap_or_default(),
                    location: scheme.location.clone().unwrap_or_else(|| "query".to_string()),
                };
            }
            _ => {}
        }
    }
    AuthPlan::None
}

/// Extract path, query and header parameter groups from the channel.
fn extract_params(
    doc: &AsyncApiDoc,
    catalog: &Catalog<'_>,
) -> Result<(Vec<ParamDecl>, Vec<ParamDecl>, Vec<ParamDecl>), GenerateError> {
    let Some(channel) = doc.channels.values().next() else {
        return Ok((Vec::new(), Vec::new(), Vec::new()));
    };

    let mut path_params = Vec::new();
    if let Some(parameters) = &channel.parameters {
        let mut names: Vec<_> = parameters.keys().collect();
        names.sort();
        for name in names {
            let schema = parameters.get(name).and_then(|p| p.schema.as_ref());
            path_params.push(ParamDecl {
                name: sanitize_identifier(name),
                type_name: schema.map_or_else(|| "string".to_string(), schema_display_type),
                required: true,
            });
        }
    }

    let ws = channel.bindings.as_ref().and_then(|b| b.ws.as_ref());
    let query_params = ws
        .and_then(|ws| ws.query.as_ref())
        .map(|schema| object_schema_params(catalog, schema))
        .transpose()?
        .unwrap_or_default();
    let header_params = ws
        .and_then(|ws| ws.headers.as_ref())
        .map(|schema| object_schema_params(catalog, schema))
        .transpose()?
        .unwrap_or_default();

    Ok((path_params, query_params, header_params))
}

/// Flatten an object schema into a sorted parameter list.
fn object_schema_params(
    catalog: &Catalog<'_>,
    schema: &crate::spec::Schema,
) -> Result<Vec<ParamDecl>, GenerateError> {
    let schema = match schema.kind() {
        SchemaKind::Ref(ref_path) => catalog.resolve_schema(ref_path)?,
        _ => schema,
    };
    let Some(properties) = &schema.properties else {
        return Ok(Vec::new());
    };
    let mut names: Vec<_> = properties.keys().collect();
    names.sort();
    let mut params = Vec::new();
    for name in names {
        let Some(prop) = properties.get(name) else {
            continue;
        };
        params.push(ParamDecl {
            name: sanitize_identifier(name),
            type_name: schema_display_type(prop),
            required: schema.requires(name),
        });
    }
    Ok(params)
}

/// Declare a type for every catalogued message except close-frame sentinels.
fn collect_message_types(catalog: &Catalog<'_>, ctx: &mut GenContext) {
    for (name, message) in catalog.all_messages() {
        if is_close_frame(catalog, name, message) {
            continue;
        }
        let Ok((_, payload)) = catalog.message_payload(name, message) else {
            continue;
        };
        let mut fields = Vec::new();
        if let Some(properties) = &payload.properties {
            let mut prop_names: Vec<_> = properties.keys().collect();
            prop_names.sort();
            for prop_name in prop_names {
                let Some(prop) = properties.get(prop_name) else {
                    continue;
                };
                fields.push(FieldDecl {
                    name: sanitize_identifier(prop_name),
                    type_name: schema_display_type(prop),
                    required: payload.requires(prop_name),
                });
            }
        }
        ctx.message_types.push(MessageTypeDecl {
            name: to_pascal_case(name),
            description: message
                .summary
                .clone()
                .or_else(|| message.description.clone()),
            fields,
        });
    }
}

/// Record the read-loop routes an operation's replies follow.
fn collect_routes(op: &OperationPlan, ctx: &mut GenContext) {
    let Some(pipe) = &op.pipe else {
        return;
    };
    for type_name in &op.response_type_union {
        ctx.routes.push(RouteRule {
            dispatcher_value: type_name.clone(),
            target: pipe.key.clone(),
        });
    }
}

/// Assemble the final ordered member list.
fn assemble_members(
    dispatcher: &DispatcherConfig,
    operations: Vec<OperationPlan>,
    ctx: &mut GenContext,
) {
    for field in client_fields(dispatcher) {
        ctx.members.push(MemberDecl::Field(field));
    }

    ctx.members.push(MemberDecl::Init(InitPlan {
        steps: vec![
            InitStep::ValidateUrl,
            InitStep::ConfigureAuth,
            InitStep::CreateWriteQueue,
            InitStep::CreateRegistries,
            InitStep::OpenSocket,
            InitStep::StartReadLoop,
            InitStep::StartWriteLoop,
        ],
    }));

    ctx.members.push(MemberDecl::ReadLoop(ReadLoopPlan {
        dispatcher_key: dispatcher.key.clone(),
        stream_id_key: dispatcher.stream_id_key.clone(),
        routes: ctx.routes.clone(),
    }));
    ctx.members.push(MemberDecl::WriteLoop(WriteLoopPlan {
        queue_name: "write_message_queue".to_string(),
        capacity: WRITE_QUEUE_CAPACITY,
    }));

    for op in operations {
        ctx.members.push(MemberDecl::RemoteOperation(op));
    }

    ctx.members.push(MemberDecl::Close(ClosePlan {
        steps: vec![
            CloseStep::MarkInactive,
            CloseStep::CloseStreamAdapters,
            CloseStep::ClosePipes,
            CloseStep::CloseWriteQueue,
            CloseStep::CloseSocket,
        ],
    }));
}

/// The generated client's field declarations.
fn client_fields(dispatcher: &DispatcherConfig) -> Vec<FieldDecl> {
    let mut fields = vec![
        FieldDecl {
            name: "socket".to_string(),
            type_name: "WebSocket".to_string(),
            required: true,
        },
        FieldDecl {
            name: "write_message_queue".to_string(),
            type_name: "Pipe".to_string(),
            required: true,
        },
        FieldDecl {
            name: "pipe_registry".to_string(),
            type_name: "PipeRegistry".to_string(),
            required: true,
        },
        FieldDecl {
            name: "stream_registry".to_string(),
            type_name: "StreamRegistry".to_string(),
            required: true,
        },
        FieldDecl {
            name: "is_active".to_string(),
            type_name: "bool".to_string(),
            required: true,
        },
    ];
    if dispatcher.stream_id_key.is_some() {
        fields.push(FieldDecl {
            name: "stream_id_key".to_string(),
            type_name: "string".to_string(),
            required: true,
        });
    }
    fields
}

/// Derive the generated client type name from the document title.
fn client_name(doc: &AsyncApiDoc) -> String {
    let title = doc
        .info
        .as_ref()
        .and_then(|i| i.title.as_deref())
        .unwrap_or("Ws");
    format!("{}Client", to_pascal_case(title))
}
