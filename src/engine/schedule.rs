use crate::config::AppId;
use crate::error::SchedulingError;
use crate::model::{Invocation, ScheduledInvocation};
use crate::system::ScheduleSink;
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime, Time};

/// Today at `hour:00` in `now`'s offset, or tomorrow if that moment has passed.
pub fn evening_slot(now: OffsetDateTime, hour: u8) -> OffsetDateTime {
    let at = Time::from_hms(hour.min(23), 0, 0).unwrap_or(Time::MIDNIGHT);
    let today = now.replace_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Re-entrant invocation of this binary that runs the lifecycle step for `app_id`.
pub fn deferred_invocation(program: PathBuf, app_id: AppId, config: Option<&Path>) -> Invocation {
    let mut args = vec![
        "--app".to_string(),
        app_id.to_string(),
        "--deferred".to_string(),
    ];
    if let Some(path) = config {
        args.push("--config".to_string());
        args.push(path.display().to_string());
    }
    Invocation { program, args }
}

/// Register a one-shot run of this workflow for `app_id` at `when`.
pub async fn schedule_for(
    sink: &dyn ScheduleSink,
    app_id: AppId,
    when: OffsetDateTime,
    config: Option<&Path>,
) -> Result<ScheduledInvocation, SchedulingError> {
    let program = std::env::current_exe().map_err(SchedulingError::CurrentExe)?;
    let payload = deferred_invocation(program, app_id, config);
    sink.register_one_shot(&payload, when).await?;
    tracing::info!(app = %app_id, %when, invocation = %payload, "deferred run registered");
    Ok(ScheduledInvocation {
        app_id,
        fired_at: when,
        payload,
    })
}
