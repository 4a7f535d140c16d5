//! Action routing.
//!
//! Resolves an action's `(type, target)` pair to a handler and validates its
//! parameters in one step, then applies the resolved route against the record
//! store or the notification tracker.

use std::sync::Arc;

use marshal_storage::RecordStore;

use crate::channel::ChannelRegistry;
use crate::error::ActionError;
use crate::params::{NotifyParams, TagParams, UpdateStatusParams};
use crate::tracker::NotificationTracker;
use crate::types::{Action, ActionEffect, ActionType};

/// Targets accepted by the `notification` family. Empty means the default.
const NOTIFY_TARGETS: &[&str] = &["", "send", "send_notification"];

/// Targets accepted by the `tag` family.
const TAG_TARGETS: &[&str] = &["", "add", "add_tag"];

/// A validated action, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    UpdateStatus(UpdateStatusParams),
    AddTag(TagParams),
    Notify(NotifyParams),
}

/// Dispatches actions to the handler their type and target select.
pub struct ActionRouter {
    store: Arc<dyn RecordStore>,
    tracker: NotificationTracker,
}

impl ActionRouter {
    pub fn new(store: Arc<dyn RecordStore>, channels: ChannelRegistry) -> Self {
        let tracker = NotificationTracker::new(Arc::clone(&store), channels);
        Self { store, tracker }
    }

    pub fn tracker(&self) -> &NotificationTracker {
        &self.tracker
    }

    /// Resolve and validate an action without side effects.
    pub fn resolve(&self, action: &Action) -> Result<Route, ActionError> {
        let action_type: ActionType = action
            .action_type
            .parse()
            .map_err(|_| ActionError::UnknownType(action.action_type.clone()))?;
        let target = action.target.as_str();

        let route = match action_type {
            ActionType::Database => match target {
                "update_status" => Route::UpdateStatus(UpdateStatusParams::try_from(&action.params)?),
                "add_tag" => Route::AddTag(TagParams::try_from(&action.params)?),
                _ => return Err(unknown_target(action_type, target)),
            },
            ActionType::Notification if NOTIFY_TARGETS.contains(&target) => {
                Route::Notify(NotifyParams::try_from(&action.params)?)
            }
            ActionType::Tag if TAG_TARGETS.contains(&target) => {
                Route::AddTag(TagParams::try_from(&action.params)?)
            }
            _ => return Err(unknown_target(action_type, target)),
        };
        Ok(route)
    }

    /// Apply a resolved route.
    pub async fn apply(&self, route: Route) -> Result<ActionEffect, ActionError> {
        match route {
            Route::UpdateStatus(p) => {
                self.store.update_status(p.record_id, &p.status)?;
                Ok(ActionEffect::StatusUpdated {
                    record_id: p.record_id,
                    status: p.status,
                })
            }
            Route::AddTag(p) => Ok(ActionEffect::Tagged(self.store.add_tag(p.record_id, &p.tag)?)),
            Route::Notify(p) => {
                let notification = self
                    .tracker
                    .deliver(p.record_id, &p.channel, &p.message, &p.extra)
                    .await?;
                Ok(ActionEffect::Notified(notification))
            }
        }
    }

    /// Resolve, validate and apply a single action.
    pub async fn execute(&self, action: &Action) -> Result<ActionEffect, ActionError> {
        let route = self.resolve(action)?;
        tracing::debug!(
            action_type = %action.action_type,
            target = %action.target,
            "Executing action"
        );
        self.apply(route).await
    }
}

fn unknown_target(action_type: ActionType, target: &str) -> ActionError {
    ActionError::UnknownTarget {
        action_type,
        target: target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::SmsSender;
    use crate::error::{ErrorKind, ParamError};
    use marshal_core::types::{NotificationStatus, RecordId};
    use marshal_storage::{Database, QueryService, RecordRepository, SqliteRecordStore};
    use serde_json::json;

    struct Fixture {
        router: ActionRouter,
        records: RecordRepository,
        queries: QueryService,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::in_memory().unwrap());
        let mut registry = ChannelRegistry::new();
        registry.register(SmsSender);
        Fixture {
            router: ActionRouter::new(Arc::new(SqliteRecordStore::new(Arc::clone(&db))), registry),
            records: RecordRepository::new(Arc::clone(&db)),
            queries: QueryService::new(db),
        }
    }

    #[test]
    fn test_resolve_routes() {
        let f = fixture();
        let cases = [
            (
                Action::new("database", "update_status", json!({"record_id": 1, "status": "done"})),
                "update",
            ),
            (
                Action::new("database", "add_tag", json!({"record_id": 1, "tag": "x"})),
                "tag",
            ),
            (Action::new("tag", "", json!({"record_id": 1, "tag": "x"})), "tag"),
            (Action::new("tag", "add", json!({"record_id": 1, "tag": "x"})), "tag"),
            (
                Action::new(
                    "notification",
                    "send",
                    json!({"record_id": 1, "channel": "sms", "message": "m"}),
                ),
                "notify",
            ),
            (
                Action::new(
                    "notification",
                    "",
                    json!({"record_id": 1, "channel": "sms", "message": "m"}),
                ),
                "notify",
            ),
        ];
        for (action, expected) in cases {
            let route = f.router.resolve(&action).unwrap();
            let got = match route {
                Route::UpdateStatus(_) => "update",
                Route::AddTag(_) => "tag",
                Route::Notify(_) => "notify",
            };
            assert_eq!(got, expected, "{}/{}", action.action_type, action.target);
        }
    }

    #[test]
    fn test_resolve_unknown_type_and_target() {
        let f = fixture();

        let err = f
            .router
            .resolve(&Action::new("restart", "service", json!({})))
            .unwrap_err();
        assert!(matches!(err, ActionError::UnknownType(ref t) if t == "restart"));

        for (kind, target) in [("database", "drop_table"), ("tag", "remove"), ("notification", "page")] {
            let err = f.router.resolve(&Action::new(kind, target, json!({}))).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnresolvedAction);
        }
    }

    #[test]
    fn test_resolve_checks_params() {
        let f = fixture();
        let err = f
            .router
            .resolve(&Action::new("database", "update_status", json!({"record_id": 1})))
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::InvalidParams(ParamError::Missing("status"))
        ));
    }

    #[tokio::test]
    async fn test_update_status_writes_metadata() {
        let f = fixture();
        let record = f.records.create("ticket", "printer on fire").unwrap();

        let effect = f
            .router
            .execute(&Action::new(
                "database",
                "update_status",
                json!({"record_id": record.id.0, "status": "escalated"}),
            ))
            .await
            .unwrap();
        assert!(matches!(effect, ActionEffect::StatusUpdated { .. }));

        let stored = f.records.get(record.id).unwrap().unwrap();
        assert_eq!(stored.status(), Some("escalated"));
    }

    #[tokio::test]
    async fn test_update_status_unknown_record_is_persistence_failure() {
        let f = fixture();
        let err = f
            .router
            .execute(&Action::new(
                "database",
                "update_status",
                json!({"record_id": 404, "status": "x"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    }

    #[tokio::test]
    async fn test_tagging_twice_creates_two_rows() {
        let f = fixture();
        let action = Action::new("tag", "add", json!({"record_id": 7, "tag": "urgent"}));
        f.router.execute(&action).await.unwrap();
        f.router.execute(&action).await.unwrap();

        let tags = f.queries.tags_for_record(RecordId(7)).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|t| t.tag_name == "urgent"));
    }

    #[tokio::test]
    async fn test_invalid_notification_creates_no_row() {
        let f = fixture();
        let err = f
            .router
            .execute(&Action::new(
                "notification",
                "send",
                json!({"record_id": 1, "channel": "sms"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParameterValidation);
        assert!(f.queries.notifications(&Default::default()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_is_tracked() {
        let f = fixture();
        let effect = f
            .router
            .execute(&Action::new(
                "notification",
                "send",
                json!({"record_id": 3.0, "channel": "sms", "message": "backup done"}),
            ))
            .await
            .unwrap();

        match effect {
            ActionEffect::Notified(n) => {
                assert_eq!(n.record_id, RecordId(3));
                assert_eq!(n.status, NotificationStatus::Sent);
            }
            other => panic!("expected Notified, got {other:?}"),
        }
    }
}
