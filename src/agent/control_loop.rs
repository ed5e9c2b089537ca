//! The poll/act control loop
//!
//! Startup fetches one task; without one there is nothing to do. After that
//! each iteration:
//! 1. Checks the readiness indicator. Not ready means no fetch this round.
//! 2. When ready, waits one interval for the UI to settle, then fetches:
//!    - new task: replace it, reset the busy counter, type its prompt
//!    - busy: bump the counter; past the limit stop, else type "continue"
//!    - none: nothing
//!    - error: log it, carry on
//! 3. Waits one interval before the next round.

use std::future::Future;

use log::{debug, error, info, trace, warn};

use super::state::{LoopConfig, LoopState, SessionState, StartupError, Step, Termination};
use crate::error::Result;
use crate::task::{Task, TaskResponse, TaskSource, TaskStatus};
use crate::ui::PromptSurface;

/// Text sent when the server says the current task is still in progress
pub const CONTINUE_PROMPT: &str = "continue";

pub struct ControlLoop<T, P> {
    source: T,
    surface: P,
    config: LoopConfig,
    session: SessionState,
    state: LoopState,
    iterations: u64,
}

impl<T, P> ControlLoop<T, P>
where
    T: TaskSource,
    P: PromptSurface,
{
    /// A loop waiting for its initial task
    pub fn new(source: T, surface: P, config: LoopConfig) -> Self {
        Self {
            source,
            surface,
            config,
            session: SessionState::default(),
            state: LoopState::AwaitingInitialTask,
            iterations: 0,
        }
    }

    /// Build the loop and fetch the initial task
    pub async fn start(source: T, surface: P, config: LoopConfig) -> std::result::Result<Self, StartupError> {
        let mut control = Self::new(source, surface, config);
        control.fetch_initial_task().await?;
        Ok(control)
    }

    /// [`start`](Self::start) raced against `shutdown`. `Ok(None)` means the
    /// shutdown won before the initial task arrived. The same future can be
    /// handed to [`run_until`](Self::run_until) afterwards.
    pub async fn start_until<F>(
        source: T,
        surface: P,
        config: LoopConfig,
        shutdown: &mut F,
    ) -> std::result::Result<Option<Self>, StartupError>
    where
        F: Future<Output = ()> + Unpin,
    {
        tokio::select! {
            _ = shutdown => {
                info!("Interrupted while waiting for the initial task");
                Ok(None)
            }
            started = Self::start(source, surface, config) => started.map(Some),
        }
    }

    /// Anything other than a task here is fatal
    pub async fn fetch_initial_task(&mut self) -> std::result::Result<&Task, StartupError> {
        let task = match self.source.request_task().await? {
            TaskResponse::Assigned(task) => task,
            TaskResponse::Status(status) => return Err(StartupError::NoTask(status)),
        };

        info!("Initial task received: {} - {}", task.ticket_id, task.prompt);
        self.session.accept_task(task);
        self.state = LoopState::Running;

        self.session
            .current_task
            .as_ref()
            .ok_or(StartupError::NoTask(TaskStatus::NoTask))
    }

    /// Steps 1 and 2 of an iteration. The trailing sleep belongs to
    /// [`run_until`](Self::run_until).
    pub async fn run_iteration(&mut self) -> Result<Step> {
        self.iterations += 1;

        if !self.surface.is_ready_for_prompt().await {
            debug!("UI not ready for prompt - waiting...");
            return Ok(Step::NotReady);
        }

        debug!("UI is ready for prompt");
        tokio::time::sleep(self.config.interval).await;

        let response = match self.source.request_task().await {
            Ok(response) => response,
            Err(e) => {
                error!("Error requesting task: {}", e);
                return Ok(Step::FetchFailed);
            }
        };

        match response {
            TaskResponse::Assigned(task) => {
                info!("New task received: {} - {}", task.ticket_id, task.prompt);
                let prompt = task.prompt.clone();
                self.session.accept_task(task);
                let delivered = self.deliver(&prompt, "task prompt").await?;
                Ok(Step::NewTask { delivered })
            }
            TaskResponse::Status(TaskStatus::Busy) => {
                info!("Task still in progress - telling Junie to continue");
                let count = self.session.record_busy();
                debug!("Continue count: {}/{}", count, self.config.max_consecutive_continues);

                if count > self.config.max_consecutive_continues {
                    warn!(
                        "Maximum consecutive continue limit ({}) reached. Terminating agent to avoid quota waste.",
                        self.config.max_consecutive_continues
                    );
                    self.state = LoopState::Terminated(Termination::ContinueLimitReached);
                    return Ok(Step::LimitReached);
                }

                let delivered = self.deliver(CONTINUE_PROMPT, "'continue' prompt").await?;
                Ok(Step::Continued { count, delivered })
            }
            TaskResponse::Status(TaskStatus::NoTask) => {
                debug!("No tasks available - doing nothing");
                Ok(Step::NoTask)
            }
        }
    }

    async fn deliver(&mut self, text: &str, what: &str) -> Result<bool> {
        let delivered = self.surface.give_prompt(text).await?;
        if delivered {
            info!("Successfully entered {}", what);
        } else {
            error!("Failed to enter {}", what);
        }
        Ok(delivered)
    }

    /// One iteration plus the trailing sleep. Errors are logged and
    /// swallowed; only the continue limit ends the loop from here.
    async fn cycle(&mut self) -> Option<Termination> {
        match self.run_iteration().await {
            Ok(Step::LimitReached) => return Some(Termination::ContinueLimitReached),
            Ok(step) => trace!("Iteration {} finished: {:?}", self.iterations, step),
            Err(e) => error!("Unexpected error in main loop: {}", e),
        }

        tokio::time::sleep(self.config.interval).await;
        None
    }

    /// Run until `shutdown` resolves or the continue limit trips
    pub async fn run_until<F>(&mut self, shutdown: F) -> Termination
    where
        F: Future<Output = ()>,
    {
        info!("Entering main runtime loop...");
        tokio::pin!(shutdown);

        loop {
            let outcome = tokio::select! {
                _ = &mut shutdown => None,
                finished = self.cycle() => Some(finished),
            };

            match outcome {
                None => {
                    info!("Shutting down agent...");
                    self.state = LoopState::Terminated(Termination::Interrupted);
                    return Termination::Interrupted;
                }
                Some(Some(termination)) => {
                    self.state = LoopState::Terminated(termination);
                    return termination;
                }
                Some(None) => {}
            }
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.session.current_task.as_ref()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn source(&self) -> &T {
        &self.source
    }

    pub fn surface(&self) -> &P {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{MockTaskSource, TaskRequestError};
    use crate::ui::UiError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Scripted readiness, records every prompt
    #[derive(Default)]
    struct FakeSurface {
        ready: VecDeque<bool>,
        prompts: Vec<String>,
        fail_next_prompt: bool,
        ready_checks: usize,
    }

    impl FakeSurface {
        fn always_ready() -> Self {
            Self::default()
        }

        fn with_readiness(ready: impl IntoIterator<Item = bool>) -> Self {
            Self {
                ready: ready.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PromptSurface for FakeSurface {
        async fn is_ready_for_prompt(&mut self) -> bool {
            self.ready_checks += 1;
            self.ready.pop_front().unwrap_or(true)
        }

        async fn give_prompt(&mut self, text: &str) -> std::result::Result<bool, UiError> {
            if self.fail_next_prompt {
                self.fail_next_prompt = false;
                return Err(UiError::Injection(crate::screen::ScreenError::Input("stuck key".to_string())));
            }
            self.prompts.push(text.to_string());
            Ok(true)
        }
    }

    fn config(limit: u32) -> LoopConfig {
        LoopConfig::new(Duration::ZERO, limit)
    }

    fn initial() -> TaskResponse {
        Task::new("t1", "DH-1", "do X").into()
    }

    async fn running(
        script: Vec<TaskResponse>,
        surface: FakeSurface,
        limit: u32,
    ) -> ControlLoop<MockTaskSource, FakeSurface> {
        let mut responses = vec![initial()];
        responses.extend(script);
        ControlLoop::start(MockTaskSource::with_responses(responses), surface, config(limit))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_loop_awaits_initial_task() {
        let control = ControlLoop::new(MockTaskSource::new(), FakeSurface::always_ready(), config(5));
        assert_eq!(control.state(), LoopState::AwaitingInitialTask);
        assert!(control.current_task().is_none());
    }

    #[tokio::test]
    async fn test_start_with_task_enters_running() {
        let control = running(vec![], FakeSurface::always_ready(), 5).await;
        assert_eq!(control.state(), LoopState::Running);
        assert_eq!(control.current_task().map(|t| t.prompt.as_str()), Some("do X"));
        assert_eq!(control.session().consecutive_continues, 0);
        // The initial task is recorded, not typed
        assert!(control.surface().prompts.is_empty());
    }

    #[tokio::test]
    async fn test_start_without_task_fails() {
        for status in [TaskResponse::busy(), TaskResponse::no_task()] {
            let source = MockTaskSource::with_responses([status]);
            let result = ControlLoop::start(source, FakeSurface::always_ready(), config(5)).await;
            assert!(matches!(result, Err(StartupError::NoTask(_))));
        }
    }

    #[tokio::test]
    async fn test_start_fetch_error_fails() {
        let source = MockTaskSource::new();
        source.push_error(TaskRequestError::InvalidJson("eof".to_string()));
        let result = ControlLoop::start(source, FakeSurface::always_ready(), config(5)).await;
        assert!(matches!(result, Err(StartupError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_not_ready_never_fetches() {
        let mut control = running(vec![TaskResponse::busy()], FakeSurface::with_readiness([false, false]), 5).await;
        assert_eq!(control.source().calls(), 1);

        assert_eq!(control.run_iteration().await.unwrap(), Step::NotReady);
        assert_eq!(control.run_iteration().await.unwrap(), Step::NotReady);
        assert_eq!(control.source().calls(), 1);
        assert_eq!(control.surface().ready_checks, 2);
        assert!(control.surface().prompts.is_empty());
    }

    #[tokio::test]
    async fn test_new_task_delivers_prompt() {
        let mut control = running(
            vec![Task::new("t2", "DH-2", "do Y").into()],
            FakeSurface::always_ready(),
            5,
        )
        .await;

        assert_eq!(
            control.run_iteration().await.unwrap(),
            Step::NewTask { delivered: true }
        );
        assert_eq!(control.current_task().map(|t| t.id.as_str()), Some("t2"));
        assert_eq!(control.surface().prompts, vec!["do Y".to_string()]);
    }

    #[tokio::test]
    async fn test_no_task_leaves_counter() {
        let mut control = running(
            vec![TaskResponse::busy(), TaskResponse::no_task()],
            FakeSurface::always_ready(),
            5,
        )
        .await;

        control.run_iteration().await.unwrap();
        assert_eq!(control.run_iteration().await.unwrap(), Step::NoTask);
        assert_eq!(control.session().consecutive_continues, 1);
        assert_eq!(control.surface().prompts, vec!["continue".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_fatal() {
        let mut control = running(vec![], FakeSurface::always_ready(), 5).await;
        control.source().push_error(TaskRequestError::Server {
            status: 500,
            message: "HTTP 500".to_string(),
        });

        assert_eq!(control.run_iteration().await.unwrap(), Step::FetchFailed);
        assert_eq!(control.state(), LoopState::Running);
        assert_eq!(control.current_task().map(|t| t.id.as_str()), Some("t1"));
    }

    #[tokio::test]
    async fn test_limit_two_terminates_on_third_busy() {
        let mut control = running(vec![TaskResponse::busy(); 3], FakeSurface::always_ready(), 2).await;

        assert_eq!(
            control.run_iteration().await.unwrap(),
            Step::Continued { count: 1, delivered: true }
        );
        assert_eq!(
            control.run_iteration().await.unwrap(),
            Step::Continued { count: 2, delivered: true }
        );
        assert_eq!(control.run_iteration().await.unwrap(), Step::LimitReached);
        assert_eq!(
            control.state(),
            LoopState::Terminated(Termination::ContinueLimitReached)
        );
        assert_eq!(control.surface().prompts, vec!["continue", "continue"]);
    }

    #[tokio::test]
    async fn test_new_task_resets_counter() {
        let mut control = running(
            vec![
                TaskResponse::busy(),
                TaskResponse::busy(),
                Task::new("t2", "DH-2", "do Y").into(),
                TaskResponse::busy(),
                TaskResponse::busy(),
                TaskResponse::busy(),
            ],
            FakeSurface::always_ready(),
            2,
        )
        .await;

        control.run_iteration().await.unwrap();
        control.run_iteration().await.unwrap();
        assert_eq!(control.session().consecutive_continues, 2);

        control.run_iteration().await.unwrap();
        assert_eq!(control.session().consecutive_continues, 0);

        assert_eq!(
            control.run_iteration().await.unwrap(),
            Step::Continued { count: 1, delivered: true }
        );
        assert_eq!(
            control.run_iteration().await.unwrap(),
            Step::Continued { count: 2, delivered: true }
        );
        assert_eq!(control.run_iteration().await.unwrap(), Step::LimitReached);
    }

    #[tokio::test]
    async fn test_delivery_error_surfaces_from_iteration() {
        let mut surface = FakeSurface::always_ready();
        surface.fail_next_prompt = true;
        let mut control = running(vec![TaskResponse::busy()], surface, 5).await;

        assert!(control.run_iteration().await.is_err());
        assert_eq!(control.session().consecutive_continues, 1);
    }

    #[tokio::test]
    async fn test_run_until_survives_iteration_errors() {
        let mut surface = FakeSurface::always_ready();
        surface.fail_next_prompt = true;
        let mut control = running(vec![TaskResponse::busy(); 3], surface, 2).await;

        // busy #1 fails to deliver, busy #2 delivers, busy #3 trips the limit
        let termination = control.run_until(std::future::pending()).await;
        assert_eq!(termination, Termination::ContinueLimitReached);
        assert_eq!(control.surface().prompts, vec!["continue"]);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let mut control = running(vec![], FakeSurface::always_ready(), 5).await;
        let termination = control.run_until(async {}).await;
        assert_eq!(termination, Termination::Interrupted);
        assert_eq!(control.state(), LoopState::Terminated(Termination::Interrupted));
    }

    /// Scripted source that notes when each request was made
    #[derive(Default)]
    struct TimedSource {
        inner: MockTaskSource,
        requested_at: Mutex<Vec<Instant>>,
    }

    impl TimedSource {
        fn requested_at(&self) -> Vec<Instant> {
            self.requested_at.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskSource for TimedSource {
        async fn request_task(&self) -> std::result::Result<TaskResponse, TaskRequestError> {
            self.requested_at.lock().unwrap().push(Instant::now());
            self.inner.request_task().await
        }
    }

    /// Never answers
    struct StalledSource;

    #[async_trait]
    impl TaskSource for StalledSource {
        async fn request_task(&self) -> std::result::Result<TaskResponse, TaskRequestError> {
            std::future::pending().await
        }
    }

    const INTERVAL: Duration = Duration::from_secs(60);

    async fn timed(script: Vec<TaskResponse>, surface: FakeSurface) -> ControlLoop<TimedSource, FakeSurface> {
        let source = TimedSource::default();
        source.inner.push_response(initial());
        for response in script {
            source.inner.push_response(response);
        }
        ControlLoop::start(source, surface, LoopConfig::new(INTERVAL, 5))
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_waits_one_interval_before_fetching() {
        let mut control = timed(vec![TaskResponse::busy()], FakeSurface::always_ready()).await;
        let started = Instant::now();

        assert_eq!(
            control.run_iteration().await.unwrap(),
            Step::Continued { count: 1, delivered: true }
        );

        let requested = control.source().requested_at();
        assert_eq!(requested.len(), 2);
        assert!(requested[1] - started >= INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_cycle_takes_two_intervals() {
        let mut control = timed(vec![TaskResponse::no_task()], FakeSurface::always_ready()).await;
        let started = Instant::now();

        assert_eq!(control.cycle().await, None);
        assert!(started.elapsed() >= INTERVAL * 2);
        assert_eq!(control.source().requested_at().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_ready_cycle_takes_one_interval() {
        let mut control = timed(vec![TaskResponse::busy()], FakeSurface::with_readiness([false])).await;
        let started = Instant::now();

        assert_eq!(control.cycle().await, None);
        assert_eq!(started.elapsed(), INTERVAL);
        assert_eq!(control.source().requested_at().len(), 1);
    }

    #[tokio::test]
    async fn test_limit_returns_without_trailing_sleep() {
        let mut control = running(vec![TaskResponse::busy(); 2], FakeSurface::always_ready(), 1).await;
        control.run_iteration().await.unwrap();
        assert_eq!(control.cycle().await, Some(Termination::ContinueLimitReached));
    }

    #[tokio::test]
    async fn test_start_until_returns_loop_when_task_arrives() {
        let mut shutdown = std::future::pending::<()>();
        let source = MockTaskSource::with_responses([initial()]);
        let control = ControlLoop::start_until(source, FakeSurface::always_ready(), config(5), &mut shutdown)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(control.state(), LoopState::Running);
    }

    #[tokio::test]
    async fn test_start_until_stops_on_shutdown() {
        let mut shutdown = std::future::ready(());
        let result = ControlLoop::start_until(StalledSource, FakeSurface::always_ready(), config(5), &mut shutdown).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_start_until_reports_startup_failure() {
        let mut shutdown = std::future::pending::<()>();
        let source = MockTaskSource::with_responses([TaskResponse::no_task()]);
        let result = ControlLoop::start_until(source, FakeSurface::always_ready(), config(5), &mut shutdown).await;
        assert!(matches!(result, Err(StartupError::NoTask(TaskStatus::NoTask))));
    }

    #[tokio::test]
    async fn test_run_until_stops_mid_sleep() {
        let source = MockTaskSource::with_responses([initial()]);
        let mut control = ControlLoop::start(
            source,
            FakeSurface::with_readiness([false]),
            LoopConfig::new(Duration::from_secs(3600), 5),
        )
        .await
        .unwrap();

        let termination = control
            .run_until(tokio::time::sleep(Duration::from_millis(20)))
            .await;
        assert_eq!(termination, Termination::Interrupted);
        assert_eq!(control.iterations(), 1);
        assert_eq!(control.source().calls(), 1);
    }
}
