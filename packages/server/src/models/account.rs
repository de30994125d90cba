use serde::{Deserialize, Serialize};

/// Identity-provider event envelope.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct AccountEvent {
    /// `user.created`, `user.updated` or `user.deleted`.
    #[serde(rename = "type")]
    #[schema(example = "user.created")]
    pub event_type: String,
    pub data: AccountEventData,
}

/// User payload. Only `id` is required; other fields are used when present.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct AccountEventData {
    /// Provider subject, e.g. `user_2abc`.
    #[schema(example = "user_2abc")]
    pub id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct EmailAddress {
    #[schema(example = "alice@example.com")]
    pub email_address: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AccountEventResponse {
    /// `upserted`, `deleted` or `ignored`.
    #[schema(example = "upserted")]
    pub status: &'static str,
    #[schema(example = "2abc")]
    pub account_id: String,
}
