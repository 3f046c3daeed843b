//! End-to-end planning test over a realistic trading-feed document.
//!
//! Exercises the full pipeline on one document combining bearer auth, an
//! `allOf`-composed request schema, a correlated streaming subscription, a
//! fire-and-forget heartbeat, a server push and a close-frame sentinel.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use wsgen::ir::{AuthPlan, PipeKey, ResponseMode, ReturnType, STREAM_PIPE_CAPACITY};
use wsgen::plan_from_json;

const TRADE_FEED_JSON: &str = r##"{
  "asyncapi": "2.5.0",
  "info": { "title": "Trade Feed", "version": "2.1.0" },
  "x-dispatcherKey": "event",
  "x-dispatcherStreamId": "id",
  "servers": {
    "production": {
      "url": "wss://api.trade.example/v1",
      "protocol": "wss",
      "security": [{ "bearerAuth": [] }]
    }
  },
  "channels": {
    "/stream": {
      "bindings": {
        "ws": {
          "query": {
            "type": "object",
            "required": ["token"],
            "properties": { "token": { "type": "string" } }
          }
        }
      },
      "publish": {
        "message": {
          "oneOf": [
            { "$ref": "#/components/messages/SubscribeTrades" },
            { "$ref": "#/components/messages/Heartbeat" }
          ]
        }
      },
      "subscribe": {
        "message": {
          "oneOf": [
            { "$ref": "#/components/messages/TradeUpdate" },
            { "$ref": "#/components/messages/SubscriptionAck" },
            { "$ref": "#/components/messages/SystemStatus" },
            { "$ref": "#/components/messages/CloseFrame" }
          ]
        }
      }
    }
  },
  "components": {
    "securitySchemes": {
      "bearerAuth": { "type": "http", "scheme": "bearer" }
    },
    "schemas": {
      "EventBase": {
        "type": "object",
        "required": ["event"],
        "properties": {
          "event": { "type": "string" },
          "id": { "type": "string" }
        }
      },
      "TradeFilter": {
        "type": "object",
        "properties": {
          "symbol": { "type": "string" },
          "depth": { "type": "integer" }
        }
      },
      "SubscribeTrades": {
        "allOf": [
          { "$ref": "#/components/schemas/EventBase" },
          { "$ref": "#/components/schemas/TradeFilter" }
        ]
      },
      "Heartbeat": {
        "type": "object",
        "required": ["event"],
        "properties": { "event": { "type": "string" } }
      },
      "TradeUpdate": {
        "type": "object",
        "required": ["event"],
        "properties": {
          "event": { "type": "string" },
          "id": { "type": "string" },
          "price": { "type": "number" },
          "volume": { "type": "number" }
        }
      },
      "SubscriptionAck": {
        "type": "object",
        "required": ["event"],
        "properties": {
          "event": { "type": "string" },
          "id": { "type": "string" }
        }
      },
      "SystemStatus": {
        "type": "object",
        "required": ["event"],
        "properties": {
          "event": { "type": "string" },
          "status": { "type": "string" }
        }
      },
      "CloseFrame": {
        "type": "object",
        "properties": {
          "statusCode": { "type": "integer" },
          "reason": { "type": "string" }
        }
      }
    },
    "messages": {
      "SubscribeTrades": {
        "payload": { "$ref": "#/components/schemas/SubscribeTrades" },
        "x-response": {
          "oneOf": [
            { "$ref": "#/components/messages/TradeUpdate" },
            { "$ref": "#/components/messages/SubscriptionAck" }
          ]
        },
        "x-response-type": "server-streaming"
      },
      "Heartbeat": { "payload": { "$ref": "#/components/schemas/Heartbeat" } },
      "TradeUpdate": { "payload": { "$ref": "#/components/schemas/TradeUpdate" } },
      "SubscriptionAck": { "payload": { "$ref": "#/components/schemas/SubscriptionAck" } },
      "SystemStatus": { "payload": { "$ref": "#/components/schemas/SystemStatus" } },
      "CloseFrame": { "payload": { "$ref": "#/components/schemas/CloseFrame" } }
    }
  }
}"##;

#[test]
fn test_trade_feed_plan() {
    let plan = plan_from_json(TRADE_FEED_JSON).unwrap();

    assert_eq!(plan.client_name, "TradeFeedClient");
    assert_eq!(plan.server_url, "wss://api.trade.example/v1");
    assert_eq!(plan.auth, AuthPlan::BearerToken);
    assert_eq!(plan.query_params.len(), 1);
    assert_eq!(plan.query_params[0].name, "token");

    let names: Vec<&str> = plan
        .operations()
        .iter()
        .map(|op| op.fn_name.as_str())
        .collect();
    assert_eq!(names, vec!["subscribe_trades", "heartbeat", "on_system_status"]);
}

#[test]
fn test_all_of_request_is_correlated_streaming() {
    let plan = plan_from_json(TRADE_FEED_JSON).unwrap();
    let subscribe = plan
        .operations()
        .into_iter()
        .find(|op| op.fn_name == "subscribe_trades")
        .unwrap();

    assert_eq!(subscribe.response_mode, ResponseMode::Streaming);
    assert!(subscribe.uses_correlation_id);
    assert_eq!(
        subscribe.response_type_union,
        vec!["TradeUpdate".to_string(), "SubscriptionAck".to_string()]
    );
    let pipe = subscribe.pipe.as_ref().unwrap();
    assert_eq!(pipe.key, PipeKey::CorrelationId);
    assert_eq!(pipe.capacity, STREAM_PIPE_CAPACITY);
}

#[test]
fn test_heartbeat_is_fire_and_forget() {
    let plan = plan_from_json(TRADE_FEED_JSON).unwrap();
    let heartbeat = plan
        .operations()
        .into_iter()
        .find(|op| op.fn_name == "heartbeat")
        .unwrap();
    assert_eq!(heartbeat.response_mode, ResponseMode::None);
    assert!(heartbeat.pipe.is_none());
    assert_eq!(heartbeat.return_type, ReturnType::UnitOrError);
}

#[test]
fn test_routes_and_close_frame_exclusion() {
    let plan = plan_from_json(TRADE_FEED_JSON).unwrap();

    let read_loop = plan.read_loop().unwrap();
    let route = |value: &str| {
        read_loop
            .routes
            .iter()
            .find(|r| r.dispatcher_value == value)
            .unwrap()
    };
    assert_eq!(route("TradeUpdate").target, PipeKey::CorrelationId);
    assert_eq!(route("SubscriptionAck").target, PipeKey::CorrelationId);
    assert_eq!(
        route("SystemStatus").target,
        PipeKey::RequestType("SystemStatus".to_string())
    );

    assert!(plan.message_types.iter().all(|t| t.name != "CloseFrame"));
}
