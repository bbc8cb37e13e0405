//! The closed set of outbound messages (§4.3/§6). Every state-mutating
//! operation that needs to notify a coordinator or a peer shard builds
//! one of these and hands it to the outbox in the same transaction as
//! the state change that produced it.

use serde::{Deserialize, Serialize};

use crate::types::{CoordinatorKey, CreditorId, DebtorId, Timestamp, TransferId};

/// Every signal a shard can emit. Replaces the duck-typed signal classes
/// of the original with a closed, enumerated registry (§9).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Signal {
    RejectedTransfer(RejectedTransfer),
    PreparedTransfer(PreparedTransferSignal),
    FinalizedTransfer(FinalizedTransfer),
    AccountTransfer(AccountTransfer),
    AccountUpdate(AccountUpdate),
    AccountPurge(AccountPurge),
    RejectedConfig(RejectedConfig),
    PendingBalanceChange(PendingBalanceChangeSignal),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RejectedTransfer {
    pub coordinator: CoordinatorKey,
    pub status_code: String,
    pub total_locked_amount: i64,
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,
    pub ts: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PreparedTransferSignal {
    pub coordinator: CoordinatorKey,
    pub debtor_id: DebtorId,
    pub sender_creditor_id: CreditorId,
    pub recipient_creditor_id: CreditorId,
    pub transfer_id: TransferId,
    pub locked_amount: i64,
    pub demurrage_rate: f32,
    pub deadline: Timestamp,
    pub prepared_at: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FinalizedTransfer {
    pub coordinator: CoordinatorKey,
    pub debtor_id: DebtorId,
    pub sender_creditor_id: CreditorId,
    pub recipient_creditor_id: CreditorId,
    pub transfer_id: TransferId,
    pub committed_amount: i64,
    pub status_code: String,
    pub ts: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AccountTransfer {
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,
    pub other_creditor_id: CreditorId,
    pub committed_amount: i64,
    pub transfer_note_format: String,
    pub transfer_note: String,
    pub committed_at: Timestamp,
    pub principal_after: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AccountUpdate {
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,
    pub last_change_seqnum: i32,
    pub last_change_ts: Timestamp,
    pub principal: i64,
    pub interest: f64,
    pub interest_rate: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AccountPurge {
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,
    pub creation_date: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RejectedConfig {
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,
    pub status_code: String,
    pub config_ts: Timestamp,
    pub config_seqnum: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PendingBalanceChangeSignal {
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,
    pub change_id: i64,
    pub coordinator_type: String,
    pub transfer_note_format: String,
    pub transfer_note: String,
    pub committed_at: Timestamp,
    pub principal_delta: i64,
    pub other_creditor_id: CreditorId,
}

/// The exchange a signal publishes to and the routing key it carries,
/// per §4.3/§6. A pure function of the variant — no I/O.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub exchange: &'static str,
    pub routing_key: String,
}

impl Signal {
    /// `(exchange, routing_key)` as published by the flusher.
    pub fn route(&self) -> Route {
        match self {
            Signal::RejectedTransfer(s) => Route {
                exchange: "to_coordinators",
                routing_key: s.coordinator.coordinator_id.to_string(),
            },
            Signal::PreparedTransfer(s) => Route {
                exchange: "to_coordinators",
                routing_key: s.coordinator.coordinator_id.to_string(),
            },
            Signal::FinalizedTransfer(s) => Route {
                exchange: "to_coordinators",
                routing_key: s.coordinator.coordinator_id.to_string(),
            },
            Signal::AccountTransfer(s) => Route {
                exchange: creditor_exchange(s.creditor_id),
                routing_key: creditor_routing_key(s.debtor_id, s.creditor_id),
            },
            Signal::AccountUpdate(s) => Route {
                exchange: creditor_exchange(s.creditor_id),
                routing_key: creditor_routing_key(s.debtor_id, s.creditor_id),
            },
            Signal::AccountPurge(s) => Route {
                exchange: creditor_exchange(s.creditor_id),
                routing_key: creditor_routing_key(s.debtor_id, s.creditor_id),
            },
            Signal::RejectedConfig(s) => Route {
                exchange: creditor_exchange(s.creditor_id),
                routing_key: creditor_routing_key(s.debtor_id, s.creditor_id),
            },
            Signal::PendingBalanceChange(s) => Route {
                exchange: "accounts_in",
                routing_key: shard_routing_key(s.debtor_id, s.creditor_id),
            },
        }
    }
}

fn creditor_exchange(creditor_id: CreditorId) -> &'static str {
    if creditor_id == crate::types::ROOT_CREDITOR_ID {
        "to_debtors"
    } else {
        "to_creditors"
    }
}

fn creditor_routing_key(debtor_id: DebtorId, creditor_id: CreditorId) -> String {
    if creditor_id == crate::types::ROOT_CREDITOR_ID {
        format!("{:x}", debtor_id)
    } else {
        format!("{:x}", creditor_id)
    }
}

/// Deterministic binary routing key so the shard that owns
/// `(debtor_id, creditor_id)` receives the message, per §4.3/§6.
fn shard_routing_key(debtor_id: DebtorId, creditor_id: CreditorId) -> String {
    let mut buf = [0u8; 16];
    buf[..8].copy_from_slice(&debtor_id.to_be_bytes());
    buf[8..].copy_from_slice(&creditor_id.to_be_bytes());
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_creditor_routes_to_debtors_exchange() {
        let s = Signal::AccountUpdate(AccountUpdate {
            debtor_id: 1,
            creditor_id: 0,
            last_change_seqnum: 0,
            last_change_ts: crate::types::epoch_ts(),
            principal: 0,
            interest: 0.0,
            interest_rate: 0.0,
        });
        assert_eq!(s.route().exchange, "to_debtors");
    }

    #[test]
    fn balance_change_routes_to_accounts_in() {
        let s = Signal::PendingBalanceChange(PendingBalanceChangeSignal {
            debtor_id: 1,
            creditor_id: 2,
            change_id: 7,
            coordinator_type: "direct".into(),
            transfer_note_format: "".into(),
            transfer_note: "".into(),
            committed_at: crate::types::epoch_ts(),
            principal_delta: 40,
            other_creditor_id: 1,
        });
        assert_eq!(s.route().exchange, "accounts_in");
    }
}
