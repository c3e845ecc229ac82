use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Issue,
    Upvote,
}

/// A committed mutation, published after the store write succeeded.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChangeEvent {
    pub event_type: EventType,
    pub entity: EntityKind,
    pub issue_id: i32,
    pub payload: serde_json::Value,
}

impl ChangeEvent {
    pub fn issue(event_type: EventType, issue_id: i32, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            entity: EntityKind::Issue,
            issue_id,
            payload,
        }
    }

    pub fn upvote(event_type: EventType, issue_id: i32, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            entity: EntityKind::Upvote,
            issue_id,
            payload,
        }
    }
}

/// Lets feed consumers patch one row instead of refetching the list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ScoreDelta {
    pub issue_id: i32,
    pub new_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FeedMessage {
    Change(ChangeEvent),
    ScoreDelta(ScoreDelta),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_delta_wire_shape() {
        let msg = FeedMessage::ScoreDelta(ScoreDelta {
            issue_id: 4,
            new_score: 12.5,
        });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "score_delta", "data": {"issue_id": 4, "new_score": 12.5}})
        );
    }

    #[test]
    fn change_event_wire_shape() {
        let msg = FeedMessage::Change(ChangeEvent::upvote(
            EventType::Delete,
            2,
            json!({"upvotes_count": 0}),
        ));
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "change");
        assert_eq!(v["data"]["event_type"], "delete");
        assert_eq!(v["data"]["entity"], "upvote");
        assert_eq!(v["data"]["issue_id"], 2);
    }
}
