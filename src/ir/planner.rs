//! Per-operation generation planning.
//!
//! Consumes classified operation seeds and produces the full body-statement
//! plan for each remote operation: liveness guard, correlation-id stamping,
//! pipe registration, produce/consume ordering, and stream-adapter
//! construction. The register-then-send ordering is load-bearing: a dynamic
//! pipe must exist in the registry before the request leaves the client, or
//! a fast reply races the registration and is dropped.

use super::plan::{
    BodyStep, DispatcherConfig, OperationPlan, OperationSeed, ParamDecl, PipeBinding, PipeKey,
    RPC_PIPE_CAPACITY, ResponseMode, ReturnType, STREAM_PIPE_CAPACITY,
};
use super::utils::{sanitize_identifier, to_pascal_case};

/// Assemble the full generation plan for one classified seed.
pub fn plan_operation(seed: &OperationSeed, dispatcher: &DispatcherConfig) -> OperationPlan {
    let response_mode = match &seed.response {
        None => ResponseMode::None,
        Some(r) if r.streaming => ResponseMode::Streaming,
        Some(_) => ResponseMode::SimpleRpc,
    };
    let type_union = seed
        .response
        .as_ref()
        .map(|r| r.type_names.clone())
        .unwrap_or_default();

    let fn_name = if seed.is_subscribe_push {
        format!("on_{}", sanitize_identifier(&seed.request_name))
    } else {
        sanitize_identifier(&seed.request_name)
    };

    let pipe = pipe_binding(seed, response_mode);
    let body = body_steps(seed, dispatcher, response_mode, pipe.as_ref(), &type_union);

    let mut params = Vec::new();
    if !seed.is_subscribe_push {
        params.push(ParamDecl {
            name: sanitize_identifier(&seed.request_name),
            type_name: to_pascal_case(&seed.request_name),
            required: true,
        });
    }
    params.push(ParamDecl {
        name: "timeout".to_string(),
        type_name: "decimal".to_string(),
        required: true,
    });

    let return_type = match response_mode {
        ResponseMode::None => ReturnType::UnitOrError,
        ResponseMode::SimpleRpc => ReturnType::UnionOrError(type_union.clone()),
        ResponseMode::Streaming => ReturnType::StreamOfUnionOrError(type_union.clone()),
    };

    OperationPlan {
        request_name: seed.request_name.clone(),
        fn_name,
        summary: seed.summary.clone(),
        response_mode,
        response_type_union: type_union,
        uses_correlation_id: seed.uses_correlation_id,
        is_subscribe_push: seed.is_subscribe_push,
        pipe,
        params,
        body,
        return_type,
    }
}

/// The pipe this operation consumes from, if it consumes at all.
fn pipe_binding(seed: &OperationSeed, mode: ResponseMode) -> Option<PipeBinding> {
    if mode == ResponseMode::None {
        return None;
    }
    let capacity = match mode {
        ResponseMode::Streaming => STREAM_PIPE_CAPACITY,
        _ => RPC_PIPE_CAPACITY,
    };
    let key = if seed.uses_correlation_id {
        PipeKey::CorrelationId
    } else {
        PipeKey::RequestType(seed.request_name.clone())
    };
    Some(PipeBinding {
        pipe_name: format!("{}_pipe", sanitize_identifier(&seed.request_name)),
        key,
        capacity,
    })
}

/// The ordered body-statement plan (the decision table).
fn body_steps(
    seed: &OperationSeed,
    dispatcher: &DispatcherConfig,
    mode: ResponseMode,
    pipe: Option<&PipeBinding>,
    type_union: &[String],
) -> Vec<BodyStep> {
    let mut steps = Vec::new();

    // Pure server pushes have no caller blocked on liveness.
    if !seed.is_subscribe_push {
        steps.push(BodyStep::CheckConnectionActive);
    }

    if seed.uses_correlation_id {
        if let Some(field) = &dispatcher.stream_id_key {
            steps.push(BodyStep::GenerateCorrelationId {
                field: field.clone(),
            });
        }
    }

    // Register before anything is sent.
    if let Some(binding) = pipe {
        steps.push(BodyStep::RegisterPipe {
            pipe: binding.pipe_name.clone(),
            key: binding.key.clone(),
            capacity: binding.capacity,
        });
    }

    if !seed.is_subscribe_push {
        steps.push(BodyStep::ProduceRequest);
    }

    match mode {
        ResponseMode::None => {}
        ResponseMode::SimpleRpc => {
            if let Some(binding) = pipe {
                steps.push(BodyStep::ConsumeReply {
                    pipe: binding.pipe_name.clone(),
                });
                steps.push(BodyStep::DecodeReply {
                    type_union: type_union.to_vec(),
                });
                if seed.uses_correlation_id {
                    steps.push(BodyStep::DeregisterPipe {
                        pipe: binding.pipe_name.clone(),
                    });
                }
            }
        }
        ResponseMode::Streaming => {
            if let Some(binding) = pipe {
                steps.push(BodyStep::BuildStreamAdapter {
                    pipe: binding.pipe_name.clone(),
                    item_union: type_union.to_vec(),
                });
            }
        }
    }

    steps
}
