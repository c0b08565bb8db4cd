use tracker_core::{JobViewModel, Notice, Phase};

const BAR_WIDTH: usize = 30;

pub fn render(view: &JobViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(notice) = &view.notice {
        lines.push(notice_text(notice));
    }

    match &view.phase {
        Phase::Idle => {}
        Phase::Completed { artifact_url } => {
            lines.push(progress_line(view));
            lines.push(format!("Ready: {artifact_url}"));
        }
        Phase::Failed { message } => {
            lines.push(format!("[{}] Failed: {message}", view.feature));
            if view.can_retry {
                lines.push(format!("Retries left: {}", view.retries_left));
            }
        }
        Phase::Submitting | Phase::Queued | Phase::Processing => {
            lines.push(progress_line(view));
        }
    }

    lines
}

fn progress_line(view: &JobViewModel) -> String {
    let filled = usize::from(view.percent) * BAR_WIDTH / 100;
    format!(
        "[{}] [{}{}] {:>3}% {}",
        view.feature,
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        view.percent,
        view.stage_label
    )
}

pub fn notice_text(notice: &Notice) -> String {
    match notice {
        Notice::Validation(err) => err.to_string(),
        Notice::LoginRequired => "Please sign in to start this job.".to_string(),
        Notice::UpgradeRequired { reason } => match reason {
            Some(reason) => format!("Upgrade your plan to unlock this feature ({reason})."),
            None => "Upgrade your plan to unlock this feature.".to_string(),
        },
        Notice::TryLater { message } => message
            .clone()
            .unwrap_or_else(|| "Too many requests right now. Please try again later.".to_string()),
        Notice::SubmitFailed { message } => format!("Could not start the job: {message}"),
    }
}
