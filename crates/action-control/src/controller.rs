//! Action controller: mount, activate, reset

use std::sync::{Arc, Weak};
use std::time::Duration;

use element_watcher::wait_for_element;
use genie_core_types::{ActivationId, ReviewResult};
use genie_event_bus::{EventBus, InMemoryBus};
use host_dom::{Document, DomError, Mutator, NodeId, Selector};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::ControlError;
use crate::guard::{ResetGuard, RESET_DELAY};
use crate::notifier::Notifier;
use crate::state::{ControlState, ControlTransition, CONTROL_ID};
use crate::subject::{is_review_page, review_request_for};
use crate::theme::{failure_notice, Appearance, ControlTheme, CONTROL_CLASS};
use crate::transport::ReviewTransport;

const TRANSITION_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct ControlSettings {
    /// Time spent in `Succeeded`/`Failed` before returning to `Armed`.
    pub reset_delay: Duration,
    pub theme: ControlTheme,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            reset_delay: RESET_DELAY,
            theme: ControlTheme::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Mounted(NodeId),
    /// A control with the reserved id was already in the document.
    AlreadyMounted(NodeId),
}

impl MountOutcome {
    pub fn node(self) -> NodeId {
        match self {
            MountOutcome::Mounted(node) | MountOutcome::AlreadyMounted(node) => node,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The page is not a merge request view; nothing was watched or mounted.
    NotReviewPage,
    Mounted(MountOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActivationOutcome {
    Succeeded(ReviewResult),
    Failed { message: String },
}

struct ControllerInner {
    document: Document,
    transport: Arc<dyn ReviewTransport>,
    notifier: Arc<dyn Notifier>,
    settings: ControlSettings,
    state: Mutex<ControlState>,
    transitions: Arc<InMemoryBus<ControlTransition>>,
}

/// Owns the review control of one document.
///
/// Cloning yields another handle to the same controller.
/// An activation that has entered `Submitting` and holds its reset.
struct PendingActivation {
    control: NodeId,
    activation: ActivationId,
    _reset: ResetGuard,
}

#[derive(Clone)]
pub struct ActionController {
    inner: Arc<ControllerInner>,
}

impl std::fmt::Debug for ActionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionController")
            .field("document", &self.inner.document)
            .field("state", &self.state())
            .finish()
    }
}

fn paint(m: &mut Mutator<'_>, node: NodeId, appearance: &Appearance) -> Result<(), DomError> {
    m.set_text(node, &appearance.label)?;
    m.set_style(node, "background-color", &appearance.background)?;
    if let Some(color) = &appearance.color {
        m.set_style(node, "color", color)?;
    }
    m.set_style(node, "border", &appearance.border)
}

impl ActionController {
    pub fn new(
        document: Document,
        transport: Arc<dyn ReviewTransport>,
        notifier: Arc<dyn Notifier>,
        settings: ControlSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                document,
                transport,
                notifier,
                settings,
                state: Mutex::new(ControlState::Unmounted),
                transitions: InMemoryBus::new(TRANSITION_CAPACITY),
            }),
        }
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn state(&self) -> ControlState {
        *self.inner.state.lock()
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.inner.settings
    }

    /// The control element currently in the document, looked up by its
    /// reserved id.
    pub fn control(&self) -> Option<NodeId> {
        self.inner.document.get_element_by_id(CONTROL_ID)
    }

    pub fn subscribe_transitions(&self) -> broadcast::Receiver<ControlTransition> {
        self.inner.transitions.subscribe()
    }

    /// Checks the page, waits for the first mount point and mounts the control.
    ///
    /// Waits indefinitely when no mount point ever appears.
    pub async fn start(&self, selectors: Vec<Selector>) -> Result<StartOutcome, ControlError> {
        let document = &self.inner.document;
        if !is_review_page(document.location()) {
            info!(location = %document.location(), "Not a merge request page; control not injected");
            return Ok(StartOutcome::NotReviewPage);
        }

        debug!(location = %document.location(), "Waiting for mount point");
        let mount_point = wait_for_element(document, selectors, None).await?;
        Ok(StartOutcome::Mounted(self.mount(mount_point)?))
    }

    /// Creates the control under `mount_point` unless one already exists.
    pub fn mount(&self, mount_point: NodeId) -> Result<MountOutcome, ControlError> {
        let armed = &self.inner.settings.theme.armed;
        let outcome = self.inner.document.mutate(|m| {
            if let Some(existing) = m.tree().get_element_by_id(CONTROL_ID) {
                return Ok(MountOutcome::AlreadyMounted(existing));
            }
            let button = m.create_element("button");
            m.set_attribute(button, "id", CONTROL_ID)?;
            m.set_attribute(button, "class", CONTROL_CLASS)?;
            m.set_style(button, "margin-left", "8px")?;
            m.set_style(button, "transition", "background-color 0.3s ease")?;
            paint(m, button, armed)?;
            m.append_child(mount_point, button)?;
            Ok(MountOutcome::Mounted(button))
        })?;

        let button = match outcome {
            MountOutcome::AlreadyMounted(existing) => {
                debug!(node = %existing, "Review control already present");
                return Ok(outcome);
            }
            MountOutcome::Mounted(button) => button,
        };

        let controller = Arc::downgrade(&self.inner);
        self.inner
            .document
            .add_click_listener(button, move |_| activate_from_click(&controller))?;
        self.record_transition(None, ControlState::Armed);
        info!(node = %button, mount_point = %mount_point, "Review control mounted");
        Ok(outcome)
    }

    /// Runs one pass through the state machine.
    ///
    /// Does not check the `disabled` flag; user clicks are filtered by the
    /// document before they get here.
    ///
    /// Steps:
    /// 1. Arm the reset
    /// 2. Enter `Submitting`
    /// 3. Submit the request derived from the page location
    /// 4. Enter `Succeeded`, or notify and enter `Failed`
    pub async fn handle_activation(&self) -> Result<ActivationOutcome, ControlError> {
        let pending = self.begin_activation()?;
        self.finish_activation(pending).await
    }

    /// Steps 1 and 2, without awaiting: the control is disabled when this
    /// returns.
    fn begin_activation(&self) -> Result<PendingActivation, ControlError> {
        let control = self.control().ok_or(ControlError::NotMounted)?;
        let activation = ActivationId::new();
        info!(activation_id = %activation, "Executing review activation");

        // 1. Arm the reset before the first visible change
        let reset = self.reset_guard(control, activation.clone());

        // 2. Busy
        self.enter(control, Some(&activation), ControlState::Submitting)?;

        Ok(PendingActivation {
            control,
            activation,
            _reset: reset,
        })
    }

    async fn finish_activation(
        &self,
        pending: PendingActivation,
    ) -> Result<ActivationOutcome, ControlError> {
        let control = pending.control;
        let activation = &pending.activation;

        // 3. Submit
        let request = review_request_for(self.inner.document.location());
        let started = Instant::now();
        let outcome = match self.inner.transport.submit(&request).await {
            Ok(result) => {
                self.enter(control, Some(activation), ControlState::Succeeded)?;
                info!(
                    activation_id = %activation,
                    subject = %request,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Review request succeeded"
                );
                ActivationOutcome::Succeeded(result)
            }
            Err(err) => {
                let message = err.user_message();
                warn!(activation_id = %activation, subject = %request, error = %err, "Review request failed");
                if let Err(notify_err) = self.inner.notifier.notify(&failure_notice(&message)) {
                    warn!(activation_id = %activation, error = %notify_err, "Failure notification not shown");
                }
                self.enter(control, Some(activation), ControlState::Failed)?;
                ActivationOutcome::Failed { message }
            }
        };

        // 4. `pending` drops here and schedules the return to `Armed`
        Ok(outcome)
    }

    fn reset_guard(&self, control: NodeId, activation: ActivationId) -> ResetGuard {
        let controller = self.clone();
        ResetGuard::arm(self.inner.settings.reset_delay, move || {
            match controller.enter(control, Some(&activation), ControlState::Armed) {
                Ok(()) => debug!(activation_id = %activation, "Review control reset"),
                Err(err) => warn!(activation_id = %activation, error = %err, "Review control reset failed"),
            }
        })
    }

    fn enter(
        &self,
        control: NodeId,
        activation: Option<&ActivationId>,
        to: ControlState,
    ) -> Result<(), ControlError> {
        if let Some(appearance) = self.inner.settings.theme.appearance(to) {
            self.inner.document.mutate(|m| {
                m.set_disabled(control, !to.is_enabled())?;
                paint(m, control, appearance)
            })?;
        }
        self.record_transition(activation.cloned(), to);
        Ok(())
    }

    fn record_transition(&self, activation: Option<ActivationId>, to: ControlState) {
        let from = std::mem::replace(&mut *self.inner.state.lock(), to);
        let appearance = self.inner.settings.theme.appearance(to);
        let transition = ControlTransition {
            activation,
            from,
            to,
            label: appearance.map(|a| a.label.clone()).unwrap_or_default(),
            background: appearance.map(|a| a.background.clone()).unwrap_or_default(),
            enabled: to.is_enabled(),
            at: Instant::now(),
        };
        debug!(from = %from, to = %to, "Control transition");
        self.inner.transitions.publish(transition);
    }
}

fn activate_from_click(controller: &Weak<ControllerInner>) {
    let Some(inner) = controller.upgrade() else {
        return;
    };
    let controller = ActionController { inner };
    let Ok(handle) = Handle::try_current() else {
        warn!("Click dispatched outside a runtime; activation dropped");
        return;
    };
    // Disable before returning so the next click sees a busy control.
    let pending = match controller.begin_activation() {
        Ok(pending) => pending,
        Err(err) => {
            warn!(error = %err, "Review activation aborted");
            return;
        }
    };
    handle.spawn(async move {
        if let Err(err) = controller.finish_activation(pending).await {
            warn!(error = %err, "Review activation aborted");
        }
    });
}
