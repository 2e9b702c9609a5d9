use std::time::{Duration, Instant};

use analyst_core::{update, AppState, Effect, Msg, SessionState, Severity};
use analyst_engine::EngineHandle;
use analyst_logging::{analyst_info, analyst_warn};
use anyhow::{anyhow, bail, Result};

use crate::cli::JobSpec;
use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::history::{self, HistoryEntry};
use crate::report;
use crate::status;

const TICK: Duration = Duration::from_millis(100);
/// How long to wait for the background save after the result is shown.
const SAVE_GRACE: Duration = Duration::from_secs(5);

struct Session {
    state: AppState,
    runner: EffectRunner,
    save_pending: bool,
    last_error: Option<String>,
    last_status: Option<(u8, String)>,
}

impl Session {
    fn dispatch(&mut self, msg: Msg) {
        if matches!(msg, Msg::SaveFinished { .. }) {
            self.save_pending = false;
        }
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        if effects
            .iter()
            .any(|effect| matches!(effect, Effect::SaveResult { .. }))
        {
            self.save_pending = true;
        }
        self.runner.enqueue(effects);
        self.render();
    }

    fn render(&mut self) {
        if !self.state.consume_dirty() {
            return;
        }
        let view = self.state.view();
        if view.session == SessionState::Running {
            let key = (view.percentage, view.message.clone());
            if self.last_status.as_ref() != Some(&key) {
                println!("{}", status::status_line(&view));
                println!("    {}", status::phase_strip(&view));
                self.last_status = Some(key);
            }
        }
        if view.notifications.is_empty() {
            return;
        }
        for notification in &view.notifications {
            eprintln!(
                "[{}] {}",
                status::severity_tag(notification.severity),
                notification.text
            );
            if notification.severity == Severity::Error {
                self.last_error = Some(notification.text.clone());
            }
        }
        for _ in 0..view.notifications.len() {
            let state = std::mem::take(&mut self.state);
            self.state = update(state, Msg::NotificationDismissed(0)).0;
        }
        self.state.consume_dirty();
    }

    fn pump(&mut self, wait: Duration) {
        if let Some(msg) = self.runner.poll(wait) {
            self.dispatch(msg);
        }
    }
}

/// Runs one analysis to its end, writes the report and optionally exports it.
pub fn run(config: &AppConfig, job: JobSpec) -> Result<()> {
    let engine = EngineHandle::new(config.engine_config())?;
    let mut session = Session {
        state: AppState::new(config.session_context()),
        runner: EffectRunner::new(engine),
        save_pending: false,
        last_error: None,
        last_status: None,
    };

    session.dispatch(Msg::QueryChanged(job.query.clone()));
    if let Some(title) = &job.title {
        session.dispatch(Msg::TitleChanged(title.clone()));
    }
    session.dispatch(Msg::AnalysisTypeChanged(job.analysis_type));
    session.dispatch(Msg::RecommendationsToggled(job.include_recommendations));

    let started = Instant::now();
    session.dispatch(Msg::SubmitClicked { now: started });

    let deadline = config.run_timeout().map(|limit| started + limit);
    let mut timed_out = false;
    while session.state.session() == SessionState::Running {
        session.pump(TICK);
        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            analyst_warn!("Analysis exceeded its time limit; cancelling");
            timed_out = true;
            session.dispatch(Msg::CancelClicked);
            break;
        }
        session.dispatch(Msg::Tick { now });
    }

    if timed_out {
        bail!(
            "analysis cancelled after {}s without a result",
            config.run_timeout_secs.unwrap_or_default()
        );
    }
    let Some(result) = session.state.result().cloned() else {
        return Err(anyhow!(session
            .last_error
            .take()
            .unwrap_or_else(|| "analysis ended without a result".to_string())));
    };

    let path = report::write_report(&config.report_dir, &result)?;
    history::record(
        &config.report_dir,
        HistoryEntry::new(&result, job.analysis_type, path.clone()),
    );
    println!("Report: {}", path.display());

    if job.export {
        session.dispatch(Msg::ExportClicked);
        let limit = Instant::now() + config.secondary_timeout() * 2;
        while session.state.view().exporting && Instant::now() < limit {
            session.pump(TICK);
        }
        if session.state.view().exporting {
            analyst_warn!("Export did not finish in time");
        }
    }

    let grace = Instant::now() + SAVE_GRACE;
    while session.save_pending && Instant::now() < grace {
        session.pump(TICK);
    }
    if session.save_pending {
        analyst_warn!("Save still pending at exit");
    }

    session.dispatch(Msg::DiscardClicked);
    analyst_info!("Done with '{}'", result.title);
    Ok(())
}
