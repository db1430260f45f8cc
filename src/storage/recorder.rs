//! Activity and audit recording.
//!
//! Every successful store mutation records exactly one [`RecentActivity`]
//! and one [`AuditLog`], then publishes a [`StoreEvent`] to subscribers.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::entity::{Action, Actor, AuditDetails, AuditLog, ItemType, RecentActivity};

/// Recent activities kept, newest first.
pub const RECENT_ACTIVITY_LIMIT: usize = 100;

/// Buffered change events per subscriber before it starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notification sent to store subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEvent {
    pub item_type: ItemType,
    pub action: Action,
    pub item_id: String,
    pub item_name: String,
    pub timestamp: DateTime<Utc>,
}

/// What a mutation reports to the recorder.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub item_type: ItemType,
    pub action: Action,
    pub item_id: String,
    pub item_name: String,
    pub details: AuditDetails,
}

pub struct AuditRecorder {
    activities: VecDeque<RecentActivity>,
    audit_logs: VecDeque<AuditLog>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditRecorder {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            activities: VecDeque::new(),
            audit_logs: VecDeque::new(),
            events,
        }
    }

    /// Record one mutation: one activity, one audit log, one event.
    pub fn record(&mut self, actor: &Actor, mutation: Mutation) {
        let Mutation {
            item_type,
            action,
            item_id,
            item_name,
            details,
        } = mutation;

        let activity = self.record_activity(actor, item_type, action, &item_id, &item_name);
        self.record_audit_log(actor, item_type, action, &item_id, &item_name, details);

        // No receivers is fine: nobody is watching.
        let _ = self.events.send(StoreEvent {
            item_type,
            action,
            item_id,
            item_name,
            timestamp: activity.timestamp,
        });
    }

    /// Prepend an activity and evict the oldest beyond the limit.
    pub fn record_activity(
        &mut self,
        actor: &Actor,
        item_type: ItemType,
        action: Action,
        item_id: &str,
        item_name: &str,
    ) -> RecentActivity {
        let activity = RecentActivity {
            id: Uuid::new_v4(),
            item_type,
            action,
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
            timestamp: Utc::now(),
        };
        self.activities.push_front(activity.clone());
        self.activities.truncate(RECENT_ACTIVITY_LIMIT);
        activity
    }

    pub fn record_audit_log(
        &mut self,
        actor: &Actor,
        item_type: ItemType,
        action: Action,
        item_id: &str,
        item_name: &str,
        details: AuditDetails,
    ) -> AuditLog {
        let log = AuditLog {
            id: Uuid::new_v4(),
            item_type,
            action,
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
            timestamp: Utc::now(),
            details,
        };
        self.audit_logs.push_front(log.clone());
        log
    }

    /// Newest first, at most `limit` entries.
    pub fn recent_activities(&self, limit: Option<usize>) -> Vec<RecentActivity> {
        let limit = limit.unwrap_or(RECENT_ACTIVITY_LIMIT);
        self.activities.iter().take(limit).cloned().collect()
    }

    /// Newest first.
    pub fn audit_logs(&self) -> Vec<AuditLog> {
        self.audit_logs.iter().cloned().collect()
    }

    /// Entries about `item_id`, including mutations that changed it as a
    /// side effect.
    pub fn audit_logs_for(&self, item_id: &str) -> Vec<AuditLog> {
        self.audit_logs
            .iter()
            .filter(|log| {
                log.item_id == item_id
                    || log
                        .details
                        .affected_ids()
                        .iter()
                        .any(|id| id.to_string() == item_id)
            })
            .cloned()
            .collect()
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    pub fn audit_count(&self) -> usize {
        self.audit_logs.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Drop all entries. Existing subscribers stay connected.
    pub fn clear(&mut self) {
        self.activities.clear();
        self.audit_logs.clear();
    }
}
