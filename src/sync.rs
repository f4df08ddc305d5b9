//! One sync run: replace the board items created last time with fresh
//! time-off requests.
//!
//! The run walks [`Phase`] in order and never goes back. The first error ends
//! the run and is reported together with the phase it happened in. The state
//! file is not touched before [`Phase::CreateItems`]; from then on it is
//! rewritten after every successful create so an aborted run still records the
//! items it made.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::item::ItemDraft;
use crate::model::time_off::DateWindow;
use crate::providers::{pretty, Board, Connectors, DeleteOutcome};
use crate::state::ItemStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoadState,
    DeleteOld,
    FetchNew,
    CreateItems,
    SaveState,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::LoadState => "load-state",
            Phase::DeleteOld => "delete-old",
            Phase::FetchNew => "fetch-new",
            Phase::CreateItems => "create-items",
            Phase::SaveState => "save-state",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub today: NaiveDate,
    pub diagnostics: bool,
    pub dry_run: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub deleted: usize,
    /// Old ids the board no longer had, e.g. removed by hand or by an aborted run.
    pub already_gone: usize,
    pub created: Vec<String>,
    /// `None` when diagnostics were skipped.
    pub diagnostics_ok: Option<bool>,
}

#[derive(Debug, Error)]
#[error("sync failed during {phase}: {source}")]
pub struct SyncFailure {
    pub phase: Phase,
    /// Items created (and recorded) before the failure.
    pub created: Vec<String>,
    #[source]
    pub source: SyncError,
}

impl SyncFailure {
    pub fn exit_code(&self) -> u8 {
        self.source.exit_code()
    }
}

pub struct SyncRun<'a> {
    config: &'a SyncConfig,
    connectors: &'a dyn Connectors,
    store: &'a ItemStore,
    options: SyncOptions,
    phase: Phase,
    report: SyncReport,
}

impl<'a> SyncRun<'a> {
    pub fn new(
        config: &'a SyncConfig,
        connectors: &'a dyn Connectors,
        store: &'a ItemStore,
        options: SyncOptions,
    ) -> Self {
        Self {
            config,
            connectors,
            store,
            options,
            phase: Phase::LoadState,
            report: SyncReport::default(),
        }
    }

    pub async fn run(mut self) -> Result<SyncReport, SyncFailure> {
        self.enter(Phase::LoadState);
        let loaded = self.store.load_item_ids();
        let old_ids = self.guard(loaded)?;
        info!(count = old_ids.len(), path = %self.store.path().display(), "loaded previous item ids");

        self.enter(Phase::DeleteOld);
        let opened = self.open_board().await;
        let board = self.guard(opened)?;
        let deleted = self.delete_old(board.as_ref(), &old_ids).await;
        (self.report.deleted, self.report.already_gone) = self.guard(deleted)?;
        if self.options.diagnostics {
            self.report.diagnostics_ok = Some(run_diagnostics(board.as_ref()).await);
        }

        self.enter(Phase::FetchNew);
        let fetched = self.fetch_drafts().await;
        let drafts = self.guard(fetched)?;

        self.enter(Phase::CreateItems);
        let created = self.create_items(board.as_ref(), &drafts).await;
        self.guard(created)?;

        self.enter(Phase::SaveState);
        if !self.options.dry_run {
            let saved = self.store.save_item_ids(&self.report.created);
            self.guard(saved)?;
        }

        self.enter(Phase::Done);
        info!(
            deleted = self.report.deleted,
            already_gone = self.report.already_gone,
            created = self.report.created.len(),
            dry_run = self.options.dry_run,
            "sync complete"
        );
        Ok(self.report)
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        info!(%phase, "entering phase");
    }

    /// Convert an error into a failure tagged with the current phase.
    fn guard<T>(&mut self, result: Result<T, SyncError>) -> Result<T, SyncFailure> {
        result.map_err(|source| {
            error!(phase = %self.phase, error = %source, "sync aborted");
            SyncFailure {
                phase: self.phase,
                created: std::mem::take(&mut self.report.created),
                source,
            }
        })
    }

    async fn open_board(&self) -> Result<Box<dyn Board>, SyncError> {
        let token = self
            .connectors
            .broker()
            .resolve_token(&self.config.board_connector, &self.config.board_customer_id)
            .await?;
        Ok(self.connectors.board(token))
    }

    /// Returns how many items were deleted and how many were already gone.
    /// Stops at the first failure; the ids after it stay on the board.
    async fn delete_old(&self, board: &dyn Board, old_ids: &[String]) -> Result<(usize, usize), SyncError> {
        if self.options.dry_run {
            for id in old_ids {
                info!(item_id = %id, "dry run: would delete item");
            }
            return Ok((0, 0));
        }
        let (mut deleted, mut gone) = (0, 0);
        for (i, id) in old_ids.iter().enumerate() {
            match board.delete_item(id).await {
                Ok(DeleteOutcome::Deleted) => {
                    info!(item_id = %id, "deleted item");
                    deleted += 1;
                }
                Ok(DeleteOutcome::AlreadyGone(reason)) => {
                    warn!(item_id = %id, %reason, "item already gone from the board");
                    gone += 1;
                }
                Err(e) => {
                    warn!(
                        item_id = %id,
                        remaining = old_ids.len() - i,
                        "delete failed, remaining old items were not deleted"
                    );
                    return Err(e);
                }
            }
        }
        Ok((deleted, gone))
    }

    async fn fetch_drafts(&self) -> Result<Vec<ItemDraft>, SyncError> {
        let token = self
            .connectors
            .broker()
            .resolve_token(&self.config.hr_connector, &self.config.hr_customer_id)
            .await?;
        let window = DateWindow::one_month_from(self.options.today);
        let requests = self.connectors.time_off(token).fetch_time_off(&window).await?;
        Ok(requests.iter().map(ItemDraft::from_request).collect())
    }

    async fn create_items(&mut self, board: &dyn Board, drafts: &[ItemDraft]) -> Result<(), SyncError> {
        if self.options.dry_run {
            for draft in drafts {
                info!(
                    name = %draft.name,
                    columns = %draft.column_values_json().unwrap_or_default(),
                    "dry run: would create item"
                );
            }
            return Ok(());
        }

        // Every old id has been deleted by now, so the old list is stale.
        self.store.save_item_ids(&[])?;
        for draft in drafts {
            let id = board.create_item(draft).await?;
            info!(item_id = %id, name = %draft.name, "created item");
            self.report.created.push(id);
            self.store.save_item_ids(&self.report.created)?;
        }
        Ok(())
    }
}

/// Read-only account and board lookups. Failures are logged, never fatal.
async fn run_diagnostics(board: &dyn Board) -> bool {
    let mut ok = true;
    match board.account_info().await {
        Ok(account) => info!(account = %pretty(&account), "monday account"),
        Err(e) => {
            warn!(error = %e, "account lookup failed");
            ok = false;
        }
    }
    match board.board_info().await {
        Ok(info) => info!(board = %pretty(&info), "monday board"),
        Err(e) => {
            warn!(error = %e, "board lookup failed");
            ok = false;
        }
    }
    ok
}
