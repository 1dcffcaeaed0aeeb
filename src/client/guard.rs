use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    gate::Verdict,
    rules::RouteRules,
    session::{ClockState, SessionState},
};

/// Navigator
///
/// Client-side navigation (history push in a browser, a router handle in tests).
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, to: &str);
}

/// Which session state a guard lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    Unauthenticated,
}

/// What a guard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardView {
    /// Neutral spinner while the session is still loading.
    Placeholder,
    Children,
    /// Nothing, while a redirect is pending.
    Nothing,
}

/// Guard
///
/// One render-time guard for both directions, parameterized by the state it admits
/// and the redirect it issues otherwise:
///
/// - `Guard::protected` admits authenticated callers and sends everyone else to login
///   with the current path as callback.
/// - `Guard::auth_only` admits anonymous callers (login, register, reset screens) and
///   sends signed-in callers home.
///
/// No decision is taken while the state is `Loading`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    requirement: Requirement,
    on_mismatch: Verdict,
    target: String,
}

impl Guard {
    pub fn protected(rules: &RouteRules, current_path: &str) -> Self {
        Self {
            requirement: Requirement::Authenticated,
            on_mismatch: Verdict::RedirectToLogin(current_path.to_string()),
            target: rules.login_url(current_path),
        }
    }

    pub fn auth_only(rules: &RouteRules) -> Self {
        Self {
            requirement: Requirement::Unauthenticated,
            on_mismatch: Verdict::RedirectToHome,
            target: rules.home_route.clone(),
        }
    }

    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    /// Where this guard navigates when the session does not match its requirement.
    pub fn redirect_target(&self) -> &str {
        &self.target
    }

    /// verdict
    ///
    /// `None` while loading. A held session past its expiry counts as no session.
    pub fn verdict(&self, state: &SessionState, now: DateTime<Utc>) -> Option<Verdict> {
        if state.is_loading() {
            return None;
        }

        let authenticated = state.is_authenticated_at(now);
        let admitted = match self.requirement {
            Requirement::Authenticated => authenticated,
            Requirement::Unauthenticated => !authenticated,
        };

        Some(if admitted {
            Verdict::Allow
        } else {
            self.on_mismatch.clone()
        })
    }

    pub fn view(&self, state: &SessionState, now: DateTime<Utc>) -> GuardView {
        match self.verdict(state, now) {
            None => GuardView::Placeholder,
            Some(Verdict::Allow) => GuardView::Children,
            Some(_) => GuardView::Nothing,
        }
    }

    /// mount
    ///
    /// Subscribes the guard to `sessions` for as long as the returned `MountedGuard` lives.
    /// Every state change is re-evaluated; a redirect is issued once per transition into a
    /// mismatching state. Dropping the handle unmounts: the task is aborted and no
    /// navigation can fire afterwards, even from a poll already running on another worker.
    pub fn mount<N: Navigator>(
        self,
        mut sessions: watch::Receiver<SessionState>,
        navigator: N,
        clock: ClockState,
    ) -> MountedGuard {
        let (view_tx, view_rx) = watch::channel(GuardView::Placeholder);
        let mounted = Arc::new(Mutex::new(true));
        let task_mounted = Arc::clone(&mounted);

        let task = tokio::spawn(async move {
            let mut redirected = false;
            loop {
                let state = sessions.borrow_and_update().clone();
                let view = self.view(&state, clock.now());

                if view == GuardView::Nothing {
                    if !redirected {
                        // Held across the navigation so unmounting waits for it to finish.
                        let still_mounted = lock_flag(&task_mounted);
                        if !*still_mounted {
                            break;
                        }
                        tracing::debug!(to = %self.target, "guard redirecting");
                        navigator.navigate(&self.target);
                        redirected = true;
                    }
                } else {
                    redirected = false;
                }
                view_tx.send_replace(view);

                // Store dropped: nothing left to observe.
                if sessions.changed().await.is_err() {
                    break;
                }
            }
        });

        MountedGuard {
            view: view_rx,
            mounted,
            task,
        }
    }
}

/// MountedGuard
///
/// A guard attached to the session store. Render with `view()`.
pub struct MountedGuard {
    view: watch::Receiver<GuardView>,
    /// Cleared on unmount; the task only navigates while holding it set.
    mounted: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl MountedGuard {
    pub fn view(&self) -> GuardView {
        *self.view.borrow()
    }

    /// Waits until the guard renders `expected`. `None` if the guard stopped first.
    pub async fn wait_for(&mut self, expected: GuardView) -> Option<GuardView> {
        self.view
            .wait_for(|view| *view == expected)
            .await
            .ok()
            .map(|view| *view)
    }

    pub fn unmount(self) {}
}

impl Drop for MountedGuard {
    fn drop(&mut self) {
        *lock_flag(&self.mounted) = false;
        self.task.abort();
    }
}

fn lock_flag(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
