use std::sync::Arc;
use std::time::Duration;

use action_control::{
    ActionController, ConsoleNotifier, ControlState, HttpReviewTransport, StartOutcome,
};
use anyhow::{bail, Context, Result};
use clap::Args;
use element_watcher::parse_selectors;
use host_dom::{DispatchOutcome, Document};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::cli::context::CliContext;

#[derive(Args, Clone)]
pub struct InjectArgs {
    /// Merge request page the control is injected into
    #[arg(long, default_value = "https://gitlab.com/group/project/-/merge_requests/1")]
    pub url: String,

    /// Review endpoint (defaults to `control.endpoint`)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Delay before the page renders its merge request widget
    #[arg(long, default_value = "500ms", value_parser = humantime::parse_duration)]
    pub render_delay: Duration,

    /// Render a `.gl-button-group` instead of the state container sibling
    #[arg(long)]
    pub button_group: bool,

    /// Number of clicks to dispatch, each after the control is armed again
    #[arg(long, default_value_t = 1)]
    pub clicks: u32,

    /// Request timeout for the review call
    #[arg(long, value_parser = humantime::parse_duration)]
    pub request_timeout: Option<Duration>,
}

pub async fn cmd_inject(args: InjectArgs, ctx: &CliContext) -> Result<()> {
    let settings = &ctx.config().control;
    let endpoint = args.endpoint.clone().unwrap_or_else(|| settings.endpoint.clone());
    let selectors = parse_selectors(&settings.selectors).context("invalid mount selectors")?;

    let document = Document::new(&args.url).context("invalid page url")?;
    let transport = HttpReviewTransport::new(&endpoint, args.request_timeout)
        .context("invalid review endpoint")?;
    let controller = ActionController::new(
        document.clone(),
        Arc::new(transport),
        Arc::new(ConsoleNotifier),
        settings.control_settings(),
    );
    let mut transitions = controller.subscribe_transitions();

    render_review_widget(&document, args.render_delay, args.button_group);

    let control = match controller.start(selectors).await? {
        StartOutcome::NotReviewPage => {
            warn!(url = %args.url, "Not a merge request page; nothing to inject");
            return Ok(());
        }
        StartOutcome::Mounted(outcome) => outcome.node(),
    };
    info!(endpoint = %endpoint, "Review control ready");

    let pass_budget = settings.reset_delay + args.request_timeout.unwrap_or(Duration::from_secs(300));
    for click in 1..=args.clicks {
        match document.dispatch_click(control)? {
            DispatchOutcome::Delivered(listeners) => {
                info!(click, listeners, "Review control clicked");
            }
            outcome => bail!("click {click} was not delivered: {outcome:?}"),
        }
        timeout(pass_budget, follow_until_armed(&mut transitions))
            .await
            .context("review control did not return to armed")??;
    }
    Ok(())
}

/// Prints transitions until the control is armed again.
async fn follow_until_armed(
    transitions: &mut tokio::sync::broadcast::Receiver<action_control::ControlTransition>,
) -> Result<()> {
    loop {
        match transitions.recv().await {
            Ok(transition) => {
                println!(
                    "{:>10} -> {:<10} label={:?} background={} enabled={}",
                    transition.from.to_string(),
                    transition.to.to_string(),
                    transition.label,
                    transition.background,
                    transition.enabled
                );
                if transition.activation.is_some() && transition.to == ControlState::Armed {
                    return Ok(());
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed control transitions"),
            Err(RecvError::Closed) => bail!("controller dropped"),
        }
    }
}

/// Renders the merge request widget the way the hosted page does: after a
/// delay, and without the control's mount point in the initial markup.
fn render_review_widget(document: &Document, delay: Duration, button_group: bool) {
    let page = document.downgrade();
    tokio::spawn(async move {
        sleep(delay).await;
        let Some(document) = page.upgrade() else {
            return;
        };
        let body = document.body();
        let rendered = document.mutate(|m| {
            let state = m.create_element("div");
            m.set_attribute(state, "class", "mr-state-container")?;
            m.append_child(body, state)?;
            let widget = m.create_element("div");
            m.append_child(body, widget)?;
            if button_group {
                let group = m.create_element("div");
                m.set_attribute(group, "class", "gl-button-group")?;
                m.append_child(widget, group)?;
            }
            Ok(())
        });
        match rendered {
            Ok(()) => info!(delay_ms = delay.as_millis() as u64, "Merge request widget rendered"),
            Err(err) => warn!(error = %err, "Failed to render merge request widget"),
        }
    });
}
