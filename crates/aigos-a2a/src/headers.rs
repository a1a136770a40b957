use uuid::Uuid;

pub const TOKEN_HEADER: &str = "x-aigos-token";
pub const PROTOCOL_VERSION_HEADER: &str = "x-aigos-protocol-version";
pub const REQUEST_ID_HEADER: &str = "x-aigos-request-id";

pub const PROTOCOL_VERSION: &str = "1";
pub const TOKEN_TYPE: &str = "AIGOS-A2A+JWT";

/// The three headers exchanged on every A2A call, in and out.
#[derive(Clone, Debug)]
pub struct A2aHeaders {
    pub token: Option<String>,
    pub protocol_version: String,
    pub request_id: Uuid,
}

impl A2aHeaders {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            protocol_version: PROTOCOL_VERSION.to_string(),
            request_id: Uuid::new_v4(),
        }
    }

    pub fn to_header_map(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            (PROTOCOL_VERSION_HEADER, self.protocol_version.clone()),
            (REQUEST_ID_HEADER, self.request_id.to_string()),
        ];
        if let Some(token) = &self.token {
            headers.push((TOKEN_HEADER, token.clone()));
        }
        headers
    }
}
