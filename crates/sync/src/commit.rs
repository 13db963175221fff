//! Commit path for finished gestures.
//!
//! A gesture outcome becomes one mutation request; the authoritative response
//! record is merged back into the store, and only then is the member's
//! active-edit guard released so a concurrent snapshot can never undo an
//! unconfirmed change. On a failed request the guard is released as well: the
//! board still holds the last known-good state, and the error is returned to
//! the caller to surface.

use anyhow::Result;
use tracing::debug;

use timegrid_api::{CreateTimeLogRequest, UpdateTimeLogRequest};
use timegrid_api_client::TimelineClient;
use timegrid_core::gesture::GestureOutcome;
use timegrid_core::LogId;

use crate::store::SharedStore;

/// What a committed gesture produced, for callers that need the new record's
/// identity (e.g. to select the created bar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Committed {
    Created { id: LogId },
    Updated { id: LogId },
    /// Click reclassification: nothing was sent, the caller should open the
    /// edit affordance for this log.
    EditRequested { id: LogId },
}

/// Operator-typed fields for a create that starts a new task. Ignored when
/// the gesture linked an existing task instead.
#[derive(Debug, Clone, Default)]
pub struct NewTaskFields {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub async fn commit(
    client: &TimelineClient,
    store: &SharedStore,
    outcome: GestureOutcome,
    new_task: NewTaskFields,
) -> Result<Committed> {
    match outcome {
        GestureOutcome::Edit { id } => Ok(Committed::EditRequested { id }),
        GestureOutcome::Create {
            member_id,
            task_id,
            start,
            end,
        } => {
            store.lock().await.begin_edit(member_id);
            let (title, tags) = if task_id.is_some() {
                (None, None)
            } else {
                (new_task.title, new_task.tags)
            };
            let result = client
                .create_time_log(&CreateTimeLogRequest {
                    user_id: member_id,
                    task_id,
                    title,
                    tags,
                    start_at: start,
                    end_at: end,
                })
                .await;
            let mut guard = store.lock().await;
            guard.end_edit(member_id);
            let record = result?;
            let id = record.id;
            guard.apply_record(record.into_log());
            debug!(id, member_id, "created time log committed");
            Ok(Committed::Created { id })
        }
        GestureOutcome::Update { id, start, end } => {
            let member = store.lock().await.board().owner_of(id);
            if let Some(member) = member {
                store.lock().await.begin_edit(member);
            }
            let result = client
                .update_time_log(
                    id,
                    &UpdateTimeLogRequest {
                        start_at: start,
                        end_at: end,
                    },
                )
                .await;
            let mut guard = store.lock().await;
            if let Some(member) = member {
                guard.end_edit(member);
            }
            let record = result?;
            guard.apply_record(record.into_log());
            debug!(id, "updated time log committed");
            Ok(Committed::Updated { id })
        }
    }
}

/// Delete a log: the server acknowledges with no body, then the record is
/// stripped locally.
pub async fn delete(client: &TimelineClient, store: &SharedStore, id: LogId) -> Result<()> {
    client.delete_time_log(id).await?;
    store.lock().await.remove(id);
    debug!(id, "time log deleted");
    Ok(())
}
