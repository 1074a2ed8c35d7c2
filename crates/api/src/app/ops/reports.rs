//! Admin reports and the activity feed.

use nesk_auth::{Action, ReportAction};
use nesk_desk::ActivityEntry;
use nesk_infra::{DashboardStats, TicketStats};

use crate::app::errors::{OpError, OpResult};
use crate::app::services::AppServices;
use crate::authz::guard_role;
use crate::context::RequestContext;

pub const DEFAULT_STATS_DAYS: u32 = 30;
pub const MAX_STATS_DAYS: u32 = 3650;

pub fn dashboard_stats(services: &AppServices, ctx: &RequestContext) -> OpResult<DashboardStats> {
    guard_role(ctx.principal(), Action::Report(ReportAction::Dashboard))?;
    Ok(services.store.dashboard_stats()?)
}

/// Tickets opened in the last `days` days (default 30, at most ten years).
pub fn ticket_stats(
    services: &AppServices,
    ctx: &RequestContext,
    days: Option<u32>,
) -> OpResult<TicketStats> {
    guard_role(ctx.principal(), Action::Report(ReportAction::TicketStats))?;
    let days = days.unwrap_or(DEFAULT_STATS_DAYS);
    if days > MAX_STATS_DAYS {
        return Err(OpError::validation(format!("days must be at most {MAX_STATS_DAYS}")));
    }
    Ok(services.store.ticket_stats(days, services.now())?)
}

/// Most recent activity first. `limit` is capped by the configured feed size.
pub fn recent_activity(
    services: &AppServices,
    ctx: &RequestContext,
    limit: Option<usize>,
) -> OpResult<Vec<ActivityEntry>> {
    guard_role(ctx.principal(), Action::Report(ReportAction::ActivityFeed))?;
    let cap = services.config.activity_feed_limit;
    let limit = limit.map_or(cap, |n| n.min(cap));
    Ok(services.audit.recent(limit)?)
}
