//! Canvas API wire messages
//!
//! Outbound messages are typed structs serialized with serde; inbound
//! messages are only inspected for the few fields the agent relies on.

use placer_core::{ColorIndex, TileAddress};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscription query announcing full-frame snapshots
pub const SUBSCRIBE_QUERY: &str = "subscription replace($input: SubscribeInput!) {\n  subscribe(input: $input) {\n    id\n    ... on BasicMessage {\n      data {\n        __typename\n        ... on FullFrameMessageData {\n          __typename\n          name\n          timestamp\n        }\n      }\n      __typename\n    }\n    __typename\n  }\n}";

/// Mutation painting one pixel
pub const SET_PIXEL_QUERY: &str = "mutation setPixel($input: ActInput!) {\n  act(input: $input) {\n    data {\n      ... on BasicMessage {\n        id\n        data {\n          ... on GetUserCooldownResponseMessageData {\n            nextAvailablePixelTimestamp\n            __typename\n          }\n          ... on SetPixelResponseMessageData {\n            timestamp\n            __typename\n          }\n          __typename\n        }\n        __typename\n      }\n      __typename\n    }\n    __typename\n  }\n}\n";

/// Websocket sub-protocol spoken by the realtime endpoint
pub const WS_SUBPROTOCOL: &str = "graphql-ws";

const SET_PIXEL_ACTION: &str = "r/replace:set_pixel";
const CANVAS_CATEGORY: &str = "CANVAS";

/// Messages sent over the subscription socket
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage<'a> {
    /// Authenticate the socket
    ConnectionInit {
        /// Auth payload
        payload: InitPayload,
    },
    /// Start a subscription
    Start {
        /// Subscription id
        id: &'a str,
        /// Operation
        payload: StartPayload<'a>,
    },
}

impl<'a> ClientMessage<'a> {
    /// Build the `connection_init` message for `token`
    #[must_use]
    pub fn connection_init(token: &str) -> Self {
        Self::ConnectionInit {
            payload: InitPayload {
                authorization: format!("Bearer {token}"),
            },
        }
    }

    /// Build the `start` message subscribing to a tile's snapshots
    #[must_use]
    pub fn subscribe_tile(team_owner: &'a str, tag: &'a str) -> Self {
        Self::Start {
            id: "1",
            payload: StartPayload {
                variables: SubscribeVariables {
                    input: SubscribeInput {
                        channel: Channel {
                            team_owner,
                            category: CANVAS_CATEGORY,
                            tag,
                        },
                    },
                },
                extensions: Extensions {},
                operation_name: "replace",
                query: SUBSCRIBE_QUERY,
            },
        }
    }
}

/// `connection_init` payload
#[derive(Debug, Clone, Serialize)]
pub struct InitPayload {
    /// `Bearer <token>`
    #[serde(rename = "Authorization")]
    pub authorization: String,
}

/// `start` payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload<'a> {
    variables: SubscribeVariables<'a>,
    extensions: Extensions,
    operation_name: &'static str,
    query: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct SubscribeVariables<'a> {
    input: SubscribeInput<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct SubscribeInput<'a> {
    channel: Channel<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Channel<'a> {
    team_owner: &'a str,
    category: &'static str,
    tag: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct Extensions {}

/// Message received on the subscription socket
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMessage {
    /// Message type
    #[serde(rename = "type")]
    pub kind: String,
    /// Message payload, if any
    #[serde(default)]
    pub payload: Option<Value>,
}

impl ServerMessage {
    /// True for a `connection_error` message
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        self.kind == "connection_error"
    }

    /// Snapshot image name announced by a subscription frame
    #[must_use]
    pub fn snapshot_name(&self) -> Option<&str> {
        self.payload
            .as_ref()?
            .pointer("/data/subscribe/data/name")?
            .as_str()
            .filter(|name| !name.is_empty())
    }
}

/// Body of the `setPixel` mutation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPixelRequest {
    operation_name: &'static str,
    variables: SetPixelVariables,
    query: &'static str,
}

impl SetPixelRequest {
    /// Build a mutation painting `color_index` at `address`
    #[must_use]
    pub fn new(address: TileAddress, color_index: ColorIndex) -> Self {
        Self {
            operation_name: "setPixel",
            variables: SetPixelVariables {
                input: ActInput {
                    action_name: SET_PIXEL_ACTION,
                    pixel_message_data: PixelMessageData {
                        coordinate: Coordinate {
                            x: address.x,
                            y: address.y,
                        },
                        color_index,
                        canvas_index: address.canvas_index,
                    },
                },
            },
            query: SET_PIXEL_QUERY,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct SetPixelVariables {
    input: ActInput,
}

#[derive(Debug, Clone, Serialize)]
struct ActInput {
    #[serde(rename = "actionName")]
    action_name: &'static str,
    #[serde(rename = "PixelMessageData")]
    pixel_message_data: PixelMessageData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PixelMessageData {
    coordinate: Coordinate,
    color_index: ColorIndex,
    canvas_index: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Coordinate {
    x: u32,
    y: u32,
}

/// GraphQL response envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlResponse {
    /// Response data
    #[serde(default)]
    pub data: Option<Value>,
    /// Reported errors
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// One GraphQL error
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

impl GraphqlResponse {
    /// Joined error messages, or `None` when the response succeeded
    #[must_use]
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Extract the acknowledgement fields of a `setPixel` response
    #[must_use]
    pub fn submit_ack(&self) -> SubmitAck {
        let mut ack = SubmitAck::default();
        let messages = self
            .data
            .as_ref()
            .and_then(|d| d.pointer("/act/data"))
            .and_then(Value::as_array);
        for message in messages.into_iter().flatten() {
            if let Some(ts) = message.pointer("/data/timestamp").and_then(Value::as_f64) {
                ack.timestamp = Some(ts);
            }
            if let Some(ts) = message
                .pointer("/data/nextAvailablePixelTimestamp")
                .and_then(Value::as_f64)
            {
                ack.next_available = Some(ts);
            }
        }
        ack
    }
}

/// Acknowledgement of an accepted pixel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubmitAck {
    /// Server timestamp of the placement (ms)
    pub timestamp: Option<f64>,
    /// When the next placement is allowed (ms)
    pub next_available: Option<f64>,
}
