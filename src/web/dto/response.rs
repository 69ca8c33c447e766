//! Response DTOs for Web API.
//!
//! Every body is an object keyed by what it carries (`{"game": ...}`,
//! `{"games": [...], "metadata": {...}}`).

use serde::Serialize;

use crate::auth::Token;
use crate::db::{Game, Metadata, Publisher, User, Wallet};

/// Healthcheck response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub system_info: SystemInfo,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub environment: String,
    pub version: &'static str,
}

/// A freshly registered user and the activation token to redeem.
#[derive(Debug, Serialize)]
pub struct Registration {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct RegistrationEnvelope {
    pub user: Registration,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct AuthenticationTokenEnvelope {
    pub authentication_token: Token,
}

#[derive(Debug, Serialize)]
pub struct GameEnvelope {
    pub game: Game,
}

#[derive(Debug, Serialize)]
pub struct GamesEnvelope {
    pub games: Vec<Game>,
    pub metadata: Metadata,
}

/// Library and per-publisher listings (not paginated).
#[derive(Debug, Serialize)]
pub struct GameListEnvelope {
    pub games: Vec<Game>,
}

#[derive(Debug, Serialize)]
pub struct PublisherEnvelope {
    pub publisher: Publisher,
}

#[derive(Debug, Serialize)]
pub struct PublishersEnvelope {
    pub publishers: Vec<Publisher>,
}

#[derive(Debug, Serialize)]
pub struct WalletEnvelope {
    pub wallet: Wallet,
}

/// Result of a purchase: the game bought and the wallet after the debit.
#[derive(Debug, Serialize)]
pub struct PurchaseEnvelope {
    pub game: Game,
    pub wallet: Wallet,
}

#[derive(Debug, Serialize)]
pub struct PermissionEnvelope {
    pub permission: String,
}

#[derive(Debug, Serialize)]
pub struct MessageEnvelope {
    pub message: String,
}

impl MessageEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
