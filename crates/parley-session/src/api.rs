//! Typed calls to the conversation service's REST endpoints.

use std::fmt;
use std::sync::Arc;

use parley_common::ConversationId;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{ApiRequest, AuthenticatedClient};
use crate::error::SessionError;
use crate::store::Message;

/// Longest error body kept in [`SessionError::Http`].
const ERROR_BODY_LIMIT: usize = 200;

/// A customer with an open conversation, as listed for a representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedUser {
    pub conversation_id: ConversationId,
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// How likely the customer is to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadType {
    Hot,
    Warm,
    Cold,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        })
    }
}

impl fmt::Display for LeadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        })
    }
}

/// Summary of a conversation produced by the analytics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub summary: String,
    pub sentiment: Sentiment,
    pub loan_type: String,
    pub lead_type: LeadType,
    pub rationale: String,
}

#[derive(Deserialize)]
struct ConversationIdBody {
    conversation_id: ConversationId,
}

/// The roster endpoint answers an object instead of an empty array.
#[derive(Deserialize)]
#[serde(untagged)]
enum RosterBody {
    Users(Vec<ConnectedUser>),
    Empty { message: String },
}

#[derive(Serialize)]
struct AnalyzeBody<'a> {
    messages: &'a [Message],
}

/// REST facade over [`AuthenticatedClient`].
#[derive(Debug, Clone)]
pub struct ChatApi {
    client: Arc<AuthenticatedClient>,
    base_url: Url,
}

impl ChatApi {
    /// `base_url` is `http(s)://host[:port]`; endpoint paths are appended to it.
    pub fn new(client: Arc<AuthenticatedClient>, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn client(&self) -> &Arc<AuthenticatedClient> {
        &self.client
    }

    /// Conversation between `customer_id` and a representative, created by
    /// the server on first request.
    pub async fn conversation_id(&self, customer_id: &str) -> Result<ConversationId, SessionError> {
        let url = self.endpoint(&["chat", "get_conversation_id", customer_id])?;
        let response = self.client.request(ApiRequest::get(url)).await?;
        let body: ConversationIdBody = decode(response).await?;
        debug!(conversation = %body.conversation_id, "Resolved conversation");
        Ok(body.conversation_id)
    }

    /// Customers with a conversation open with `representative_id`.
    pub async fn connected_users(
        &self,
        representative_id: &str,
    ) -> Result<Vec<ConnectedUser>, SessionError> {
        let url = self.endpoint(&["chat", "get_connected_users", representative_id])?;
        let response = self.client.request(ApiRequest::get(url)).await?;
        let body: RosterBody = decode(response).await?;
        match body {
            RosterBody::Users(users) => Ok(users),
            RosterBody::Empty { message } => {
                debug!(representative = representative_id, %message, "No connected users");
                Ok(Vec::new())
            }
        }
    }

    /// Hand a conversation log to the analytics endpoint.
    pub async fn analyze(&self, messages: &[Message]) -> Result<Analytics, SessionError> {
        if messages.is_empty() {
            return Err(SessionError::InvalidRequest(
                "analytics needs at least one message".into(),
            ));
        }

        let url = self.endpoint(&["analytics"])?;
        let body = serde_json::to_value(AnalyzeBody { messages })
            .map_err(|e| SessionError::InvalidRequest(e.to_string()))?;
        let response = self.client.request(ApiRequest::post_json(url, body)).await?;
        decode(response).await
    }

    /// `base_url` joined with `segments`, each percent-encoded, plus a
    /// trailing slash.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SessionError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SessionError::InvalidRequest(format!("cannot use {} as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SessionError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let body = text.chars().take(ERROR_BODY_LIMIT).collect();
        return Err(SessionError::Http { status, body });
    }
    response
        .json()
        .await
        .map_err(|e| SessionError::Decode(e.to_string()))
}
