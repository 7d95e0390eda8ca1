use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[serde(default)]
    #[schema(example = "jdoe")]
    pub username: String,
    #[serde(default)]
    #[schema(example = "Secr3tPass!")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub is_staff: bool,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

/// Flash-style notification plus where the client should go next.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Leave request approved.")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "/admin-dashboard")]
    pub redirect_to: Option<String>,
}

impl MessageResponse {
    pub fn redirect(message: impl Into<String>, to: &str) -> Self {
        Self {
            message: message.into(),
            redirect_to: Some(to.to_string()),
        }
    }
}

/// Session issued on login, registration and refresh.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "/")]
    pub redirect_to: String,
}
