use serde::{Deserialize, Serialize};

use vaptrack_core::ClientId;

/// A client organization record.
///
/// Projects reference clients by `client_name` string equality, not by key:
/// a Client row may have no matching Project and a Project's client name may
/// have no Client row. Both orphan directions are legal and must be
/// tolerated by every consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

/// Insert payload for a client record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}
