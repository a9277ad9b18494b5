//! Booking requests and the read-only view of ledger entries.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use ticketchain_ledger::{Block, Payload};

/// Fewest tickets a single booking may request.
pub const MIN_TICKETS: u32 = 1;
/// Most tickets a single booking may request.
pub const MAX_TICKETS: u32 = 5;

/// The routes tickets can be booked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    #[serde(rename = "A to B")]
    AToB,
    #[serde(rename = "B to C")]
    BToC,
    #[serde(rename = "A to C")]
    AToC,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::AToB, Route::BToC, Route::AToC];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::AToB => "A to B",
            Route::BToC => "B to C",
            Route::AToC => "A to C",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SyncError::InvalidBooking(format!("unknown route: {s:?}")))
    }
}

/// A validated booking request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    name: String,
    route: Route,
    tickets: u32,
}

impl Booking {
    /// Validates the request. The name is stored trimmed.
    pub fn new(name: &str, route: Route, tickets: u32) -> SyncResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::InvalidBooking("name is required".to_string()));
        }
        if !(MIN_TICKETS..=MAX_TICKETS).contains(&tickets) {
            return Err(SyncError::InvalidBooking(format!(
                "ticket count must be between {MIN_TICKETS} and {MAX_TICKETS}, got {tickets}"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            route,
            tickets,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn tickets(&self) -> u32 {
        self.tickets
    }

    /// The block payload recorded for this booking.
    pub fn to_payload(&self) -> Payload {
        Payload::from_fields([
            ("name", json!(self.name)),
            ("route", json!(self.route.as_str())),
            ("tickets", json!(self.tickets)),
        ])
    }
}

/// Display-oriented view of one block.
///
/// Booking fields are `None` for the genesis block and for payloads written
/// by other clients in a shape this crate does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub index: usize,
    pub timestamp: String,
    pub name: Option<String>,
    pub route: Option<String>,
    pub tickets: Option<u64>,
    pub previous_hash: String,
    pub hash: String,
}

impl BlockSummary {
    pub fn from_block(index: usize, block: &Block) -> Self {
        let data = block.data();
        let text = |key: &str| data.get(key).and_then(|v| v.as_str()).map(str::to_string);
        Self {
            index,
            timestamp: block.timestamp().to_string(),
            name: text("name"),
            route: text("route"),
            tickets: data.get("tickets").and_then(|v| v.as_u64()),
            previous_hash: block.previous_hash().to_string(),
            hash: block.hash().to_string(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}
