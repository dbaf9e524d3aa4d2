//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    ChannelInfo, ChannelListResponse, MessagePost, PublishEventRequest, PublishEventResponse,
};
use super::handlers;
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::DeliveryReport;

/// Generated OpenAPI specification, served by Swagger UI when the
/// `swagger-ui` feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "channel-relay",
        description = "Channel-based publish/subscribe relay. Producers publish over HTTP; clients subscribe over WebSocket at `/ws`."
    ),
    paths(
        handlers::events::publish_event,
        handlers::message::post_message,
        handlers::channels::list_channels,
        handlers::channels::get_channel,
        handlers::system::health_handler,
        handlers::system::test_handler,
    ),
    components(schemas(
        PublishEventRequest,
        PublishEventResponse,
        MessagePost,
        ChannelInfo,
        ChannelListResponse,
        DeliveryReport,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Events", description = "Publishing to channels"),
        (name = "Chat", description = "Group chat message relay"),
        (name = "Channels", description = "Channel occupancy"),
        (name = "System", description = "Health and liveness"),
    )
)]
pub struct ApiDoc;
