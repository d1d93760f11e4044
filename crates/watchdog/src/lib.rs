//! The scheduled sweep (spec §4.10, C10) that deletes stale or malformed
//! projects: never-finished `PENDING` projects, `ERROR` projects nobody
//! retried, and anything with an unparseable timestamp. Spawned as a
//! `tokio::time::interval`-driven background task from the gateway's
//! `main`, a single fixed tick rather than per-job scheduling.

use std::sync::Arc;
use std::time::Duration;

use dockpit_common::time::{age_ms, parse_rfc3339_ms};
use dockpit_projects::{Project, ProjectStatus, ProjectStore};

/// A project past this age while `ERROR` or `PENDING` is swept (spec §4.10
/// step 2). `PENDING` also carries a 1-hour blob TTL (spec §3) as a
/// backstop; this sweep catches it earlier and independent of storage TTL
/// semantics.
pub const STALE_THRESHOLD_MS: u64 = 30 * 60 * 1000;

/// Default sweep cadence (spec §4.10: "minute-grained").
pub const SWEEP_INTERVAL_SECS: u64 = 60;

/// Page size used when paginating through all projects during a sweep.
const LIST_PAGE_SIZE: u32 = 100;

fn should_delete(project: &Project) -> bool {
    match project.status {
        ProjectStatus::Error => match parse_rfc3339_ms(&project.updated_at) {
            Some(ms) => age_ms(ms) > STALE_THRESHOLD_MS,
            None => true,
        },
        ProjectStatus::Pending => match parse_rfc3339_ms(&project.created_at) {
            Some(ms) => age_ms(ms) > STALE_THRESHOLD_MS,
            None => true,
        },
        ProjectStatus::Ready => false,
    }
}

pub struct Watchdog<P: ProjectStore> {
    projects: P,
}

impl<P: ProjectStore> Watchdog<P> {
    pub fn new(projects: P) -> Self {
        Self { projects }
    }

    /// One full pass over every project (spec §4.10 steps 1-4). Per-project
    /// errors are logged and do not abort the sweep.
    pub async fn sweep(&self) {
        let mut cursor = None;
        let mut deleted = 0usize;
        loop {
            let page = match self.projects.list(LIST_PAGE_SIZE, cursor.take()).await {
                Ok(page) => page,
                Err(error) => {
                    tracing::warn!(%error, "watchdog: list failed, aborting this sweep");
                    return;
                }
            };

            for project in &page.projects {
                if !should_delete(project) {
                    continue;
                }
                match self.projects.delete(&project.id).await {
                    Ok(()) => {
                        deleted += 1;
                        tracing::info!(project_id = %project.id, status = ?project.status, "watchdog: deleted stale project");
                    }
                    Err(error) => {
                        tracing::warn!(project_id = %project.id, %error, "watchdog: delete failed, continuing sweep");
                    }
                }
            }

            // Metadata with a missing or unrecognized `status` can never
            // round-trip into a `Project`, so it can't reach the loop above
            // (spec §4.10 step 2, Testable Property 12) — delete it directly.
            for key in &page.malformed_keys {
                match self.projects.delete_metadata_key(key).await {
                    Ok(()) => {
                        deleted += 1;
                        tracing::info!(key = %key, "watchdog: deleted malformed project metadata");
                    }
                    Err(error) => {
                        tracing::warn!(key = %key, %error, "watchdog: delete of malformed metadata failed, continuing sweep");
                    }
                }
            }

            if page.next_cursor.is_none() {
                break;
            }
            cursor = page.next_cursor;
        }
        tracing::debug!(deleted, "watchdog: sweep complete");
    }
}

/// Spawns the sweep loop on the current Tokio runtime. Returns the
/// `JoinHandle` so the caller (the gateway's `main`) can hold or abort it.
pub fn spawn<P: ProjectStore + 'static>(watchdog: Arc<Watchdog<P>>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            watchdog.sweep().await;
        }
    })
}
