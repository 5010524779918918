//! StatusUpdater - 応募ステータスの楽観的更新
//!
//! # フロー
//! 1. 遷移ルールを検査（既定は any-to-any）
//! 2. 表示中の一覧に即時反映（overlay）
//! 3. サーバー呼び出しを spawn（別の応募の更新とは独立、グローバルロックなし）
//! 4. 失敗時は通知し、`StatusFailurePolicy` に従って保持 or ロールバック
//!
//! 自動リトライはしない。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::app::authed::AuthedApi;
use crate::app::coordinator::{ListSource, QueryCoordinator};
use crate::domain::{Application, ApplicationId, ApplicationStatus, AtsError, TransitionPolicy};
use crate::ports::{Notice, NoticeSink};

/// What to do with the displayed status when the server rejects an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFailurePolicy {
    /// Leave the optimistic status on screen; the next refetch shows server truth.
    #[default]
    #[serde(rename = "keep")]
    KeepOptimistic,
    /// Restore the prior status, unless a newer update was made meanwhile.
    #[serde(rename = "rollback")]
    Rollback,
}

/// A status update whose server call is still running.
#[derive(Debug)]
pub struct PendingUpdate {
    handle: JoinHandle<Result<Application, AtsError>>,
}

impl PendingUpdate {
    /// Wait for the server's answer. The displayed list is already reconciled
    /// by the time this returns.
    pub async fn wait(self) -> Result<Application, AtsError> {
        self.handle
            .await
            .map_err(|e| AtsError::Transient(format!("status update task failed: {e}")))?
    }
}

pub struct StatusUpdater<S>
where
    S: ListSource<Item = Application>,
{
    api: AuthedApi,
    list: QueryCoordinator<S>,
    transitions: TransitionPolicy,
    on_failure: StatusFailurePolicy,
    notices: Arc<dyn NoticeSink>,
}

impl<S> StatusUpdater<S>
where
    S: ListSource<Item = Application>,
{
    pub fn new(
        api: AuthedApi,
        list: QueryCoordinator<S>,
        transitions: TransitionPolicy,
        on_failure: StatusFailurePolicy,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            api,
            list,
            transitions,
            on_failure,
            notices,
        }
    }

    pub fn list(&self) -> &QueryCoordinator<S> {
        &self.list
    }

    /// Show `status` on the application right away and send it to the server.
    ///
    /// Fails before touching the list when there is no session or the
    /// transition is not allowed. With a transition table, an application
    /// that is not displayed fails with `NotFound`. Must be called from within a tokio runtime.
    pub fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<PendingUpdate, AtsError> {
        if !self.api.session().is_authenticated() {
            return Err(AtsError::Auth("not signed in".to_string()));
        }
        let prior = self.list.get(id).map(|application| application.status);
        match prior {
            Some(prior) => self.transitions.check(prior, status)?,
            // a transition table needs the current status to judge the move
            None if self.transitions != TransitionPolicy::Unrestricted => {
                return Err(AtsError::NotFound(format!(
                    "{} is not in the displayed list",
                    id.describe()
                )));
            }
            None => {}
        }

        let token = self
            .list
            .apply_optimistic(id, move |application| application.status = status);
        tracing::debug!(application = %id, ?prior, %status, "status applied optimistically");

        let api = self.api.clone();
        let list = self.list.clone();
        let notices = Arc::clone(&self.notices);
        let on_failure = self.on_failure;
        let handle = tokio::spawn(async move {
            let result = api.update_status(id, status).await;
            match &result {
                Ok(_) => list.settle_optimistic(token),
                Err(e) => {
                    tracing::warn!(application = %id, %status, error = %e, "status update failed");
                    notices.notify(Notice::error(format!("Failed to update status: {e}")));
                    match (on_failure, prior) {
                        (StatusFailurePolicy::Rollback, Some(prior)) => {
                            let restored = list.revert_optimistic(token, move |application| {
                                application.status = prior
                            });
                            if !restored {
                                tracing::debug!(application = %id, "newer update pending, not rolling back");
                            }
                        }
                        _ => list.settle_optimistic(token),
                    }
                }
            }
            result
        });
        Ok(PendingUpdate { handle })
    }
}
