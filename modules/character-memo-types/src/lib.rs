//! Shared types for the character memo service and its HTTP clients.

use serde::{Deserialize, Serialize};

// =====================================================
// Domain Types
// =====================================================

/// A named entity that owns an ordered list of memos.
///
/// `id` is caller-supplied and never checked for uniqueness; `order` is a
/// display hint the consumer applies client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    pub icon_url: String,
    pub order: f64,
}

/// A timestamped rich-text note belonging to one character.
///
/// `memo_id` is the creation instant in epoch milliseconds, rendered as a
/// decimal string. `content` is opaque to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    pub memo_id: String,
    pub content: String,
    pub created_at: String,
}

// =====================================================
// Request Bodies
// =====================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemoRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMemoRequest {
    pub content: String,
}

// =====================================================
// Service Types
// =====================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub character_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_uses_camel_case_wire_names() {
        let c = Character {
            id: "aki".to_string(),
            name: "Aki".to_string(),
            icon_url: "https://example.com/aki.png".to_string(),
            order: 1.0,
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["iconUrl"], "https://example.com/aki.png");
        assert!(json.get("icon_url").is_none());
    }

    #[test]
    fn memo_round_trips_through_json() {
        let m = Memo {
            memo_id: "1717000000000".to_string(),
            content: "<p>hello</p>".to_string(),
            created_at: "2024-05-29T16:26:40.000Z".to_string(),
        };
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"memoId\""));
        assert!(json.contains("\"createdAt\""));
        let back: Memo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
