//! Event-driven reconciliation of workspace names.
//!
//! ```text
//!                 window event (new/close/move)
//!   ┌──────┐ ──────────────────────────────────► ┌─────────────┐
//!   │ Idle │                                     │ Reconciling │
//!   └──────┘ ◄────────────────────────────────── └─────────────┘
//!      ▲ │        pass done (or tree fetch failed)
//!      │ │ other events, reload
//!      └─┘
//! ```
//!
//! Window events and reload requests arrive on one channel and are handled
//! strictly in order by a single thread, so passes never overlap and a reload
//! can never land halfway through a pass.

use std::sync::mpsc::Receiver;

use crate::icons::{IconResolver, IconSource};
use crate::ipc::{rename_command, WindowChange, WindowEvent, WindowManager};
use crate::label::{compose_label, LabelStyle};
use crate::tree::{extract_windows, extract_workspaces};

/// Input to the reconciliation loop
#[derive(Debug)]
pub enum Message {
    /// A window event from the subscription connection
    Window(WindowEvent),
    /// Reload the icon mapping (SIGUSR1)
    Reload,
    /// The event stream ended; the loop stops
    Disconnected(std::io::Error),
}

/// Summary of one reconciliation pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Workspaces found in the tree
    pub workspaces: usize,
    /// Rename commands i3 accepted
    pub renamed: usize,
    /// Workspaces whose rename failed, with the reason
    pub failures: Vec<(String, String)>,
}

/// What handling one message did
#[derive(Debug)]
pub enum Step {
    /// Event did not warrant a pass
    Ignored(WindowChange),
    /// A full pass ran
    Reconciled(PassReport),
    /// The tree could not be fetched; nothing was renamed
    PassFailed(std::io::Error),
    /// Icon mapping reloaded with this many entries
    Reloaded(usize),
    /// Reload failed; the previous mapping stays
    ReloadFailed(String),
    /// Event stream gone
    Stop(std::io::Error),
}

/// Owns everything a pass needs
pub struct Reconciler<W, S> {
    wm: W,
    icons: IconResolver,
    source: S,
    style: LabelStyle,
}

impl<W: WindowManager, S: IconSource> Reconciler<W, S> {
    pub fn new(wm: W, icons: IconResolver, source: S, style: LabelStyle) -> Self {
        Self {
            wm,
            icons,
            source,
            style,
        }
    }

    /// Fetch the tree once and rename every workspace after its windows.
    ///
    /// Only a tree fetch failure aborts the pass; a failed rename is recorded
    /// and the remaining workspaces are still renamed.
    pub fn pass(&mut self) -> std::io::Result<PassReport> {
        let icons = self.icons.snapshot();
        let tree = self.wm.get_tree()?;
        let workspaces = extract_workspaces(std::iter::once(&tree));

        let mut report = PassReport {
            workspaces: workspaces.len(),
            ..Default::default()
        };

        for workspace in workspaces {
            let old_name = workspace.display_name();
            if old_name.is_empty() {
                log::warn!("Workspace {:?} has no name, cannot rename it", workspace.num);
                report
                    .failures
                    .push((String::new(), "workspace has no name".to_string()));
                continue;
            }

            let windows = extract_windows(workspace.children());
            let label = compose_label(workspace, &windows, &icons, &self.style);
            let command = rename_command(old_name, &label);
            log::debug!("{}", command);

            let failure = match self.wm.run_command(&command) {
                Ok(outcomes) => outcomes.into_iter().find(|o| !o.success).map(|o| {
                    o.error
                        .unwrap_or_else(|| "command rejected".to_string())
                }),
                Err(e) => Some(e.to_string()),
            };

            match failure {
                None => report.renamed += 1,
                Some(reason) => {
                    log::warn!("Failed to rename workspace {:?}: {}", old_name, reason);
                    report.failures.push((old_name.to_string(), reason));
                }
            }
        }

        Ok(report)
    }

    /// Handle one message
    pub fn step(&mut self, message: Message) -> Step {
        if let Message::Window(event) = &message {
            log::debug!(
                "Window event {:?} ({})",
                event.change,
                event.container.as_ref().map_or("", |c| c.window_class())
            );
        }
        match message {
            Message::Window(event) if event.change.triggers_reconcile() => match self.pass() {
                Ok(report) => {
                    log::debug!(
                        "Pass after {:?}: {} workspaces, {} renamed, {} failed",
                        event.change,
                        report.workspaces,
                        report.renamed,
                        report.failures.len()
                    );
                    Step::Reconciled(report)
                }
                Err(e) => {
                    log::warn!("Skipping pass, failed to get tree: {}", e);
                    Step::PassFailed(e)
                }
            },
            Message::Window(event) => Step::Ignored(event.change),
            Message::Reload => match self.icons.reload(&self.source) {
                Ok(count) => {
                    log::info!("Reloaded {} window icons", count);
                    Step::Reloaded(count)
                }
                Err(e) => {
                    log::error!("Failed to reload icons, keeping previous mapping: {}", e);
                    Step::ReloadFailed(e.to_string())
                }
            },
            Message::Disconnected(e) => Step::Stop(e),
        }
    }

    /// Process messages until the event stream ends.
    ///
    /// Returns the disconnect error, or Ok if every sender hung up.
    pub fn run(&mut self, rx: Receiver<Message>) -> std::io::Result<()> {
        log::info!("Entering event loop");
        for message in rx {
            if let Step::Stop(e) = self.step(message) {
                log::error!("Lost connection to i3: {}", e);
                return Err(e);
            }
        }
        log::info!("All event sources closed");
        Ok(())
    }
}
