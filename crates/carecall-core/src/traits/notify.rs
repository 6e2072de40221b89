//! Notification boundary. Delivery happens outside this engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CareError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyChannel {
    Email,
    Chat,
}

impl FromStr for NotifyChannel {
    type Err = CareError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "email" => Ok(NotifyChannel::Email),
            "chat" => Ok(NotifyChannel::Chat),
            other => Err(CareError::Config(format!("unknown notify channel '{other}'"))),
        }
    }
}

/// A request for the delivery subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub channel: NotifyChannel,
    pub template_code: String,
    pub recipient_id: i64,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Hand the request over. Delivery success is not observed.
    async fn emit(&self, request: NotificationRequest) -> Result<()>;
}
