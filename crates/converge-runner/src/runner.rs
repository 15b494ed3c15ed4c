//! Convergence runner implementation.

use converge_recipe::{Recipe, Step, Timing};
use indexmap::IndexSet;
use tracing::{debug, error, info, instrument};

use crate::error::RunError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier, SkipReason, Trigger};
use crate::report::{RunReport, RunStatus, StepOutcome, StepReport};

/// Applies a recipe to the host, one step at a time.
///
/// Runs are strictly sequential: exactly one guard or action is in flight at
/// any moment, and the runner assumes exclusive access to the host for the
/// duration of a run.
pub struct ConvergenceRunner<N: ExecutionNotifier = NoopNotifier> {
  notifier: N,
}

impl ConvergenceRunner<NoopNotifier> {
  pub fn new() -> Self {
    Self {
      notifier: NoopNotifier,
    }
  }
}

impl Default for ConvergenceRunner<NoopNotifier> {
  fn default() -> Self {
    Self::new()
  }
}

/// Per-run bookkeeping. Created fresh for each run and dropped with it.
struct Run {
  run_id: String,
  outcomes: Vec<Option<StepOutcome>>,
  /// Delayed notification targets, deduplicated, in first-queued order.
  delayed: IndexSet<usize>,
  executed: Vec<String>,
}

impl Run {
  fn record(&mut self, index: usize, outcome: StepOutcome) {
    self.outcomes[index] = Some(outcome);
  }
}

impl<N: ExecutionNotifier> ConvergenceRunner<N> {
  /// Create a runner that publishes events to `notifier`.
  pub fn with_notifier(notifier: N) -> Self {
    Self { notifier }
  }

  /// Converge the host to `recipe`.
  ///
  /// Never panics on step failure: the first guard or action error aborts the
  /// run and is returned inside the report, together with the outcome of
  /// every step.
  #[instrument(
    name = "converge_run",
    skip(self, recipe),
    fields(recipe_id = %recipe.recipe_id())
  )]
  pub fn run(&self, recipe: &Recipe) -> RunReport {
    let mut run = Run {
      run_id: uuid::Uuid::new_v4().to_string(),
      outcomes: vec![None; recipe.len()],
      delayed: IndexSet::new(),
      executed: Vec::new(),
    };

    info!(
      run_id = %run.run_id,
      recipe_id = %recipe.recipe_id(),
      steps = recipe.len(),
      "run_started"
    );
    self.notifier.notify(ExecutionEvent::RunStarted {
      run_id: run.run_id.clone(),
      recipe_id: recipe.recipe_id().to_string(),
    });

    let result = self.converge(recipe, &mut run);

    match &result {
      Ok(()) => {
        info!(
          run_id = %run.run_id,
          executed = run.executed.len(),
          "run_completed"
        );
        self.notifier.notify(ExecutionEvent::RunCompleted {
          run_id: run.run_id.clone(),
        });
      }
      Err(e) => {
        error!(
          run_id = %run.run_id,
          step = %e.step(),
          error = %e,
          "run_failed"
        );
        self.notifier.notify(ExecutionEvent::RunFailed {
          run_id: run.run_id.clone(),
          step: e.step().to_string(),
          error: e.to_string(),
        });
      }
    }

    let steps = recipe
      .steps()
      .iter()
      .zip(&run.outcomes)
      .map(|(step, outcome)| StepReport {
        name: step.name().to_string(),
        kind: step.kind(),
        outcome: outcome.unwrap_or(StepOutcome::NotReached),
      })
      .collect();

    let (status, error) = match result {
      Ok(()) => (RunStatus::Converged, None),
      Err(e) => (RunStatus::Failed, Some(e)),
    };

    RunReport {
      run_id: run.run_id,
      recipe_id: recipe.recipe_id().to_string(),
      status,
      steps,
      executed: run.executed,
      error,
    }
  }

  /// Walk the declared sequence, then drain the delayed queue.
  fn converge(&self, recipe: &Recipe, run: &mut Run) -> Result<(), RunError> {
    for (index, step) in recipe.steps().iter().enumerate() {
      if run.outcomes[index].is_some() {
        debug!(run_id = %run.run_id, step = %step.name(), "step already handled by notification");
        continue;
      }

      if step.only_on_notify() {
        self.skip(run, index, step, SkipReason::NotNotified);
        continue;
      }

      self.converge_step(recipe, index, Trigger::Sequence, run)?;
    }

    // The queue may grow while draining; IndexSet keeps each target once.
    let mut cursor = 0;
    while let Some(&index) = run.delayed.get_index(cursor) {
      cursor += 1;
      self.converge_step(recipe, index, Trigger::Delayed, run)?;
    }

    Ok(())
  }

  /// Run one step: guard, action, then its notifications.
  ///
  /// Delayed runs ignore the guard since the notifying change is known to
  /// have happened.
  fn converge_step(
    &self,
    recipe: &Recipe,
    index: usize,
    trigger: Trigger,
    run: &mut Run,
  ) -> Result<(), RunError> {
    let step = &recipe.steps()[index];

    if trigger != Trigger::Delayed {
      if let Some(guard) = step.guard() {
        match guard.should_skip() {
          Ok(true) => {
            debug!(run_id = %run.run_id, step = %step.name(), guard = ?guard, "guard satisfied");
            self.skip(run, index, step, SkipReason::Guard);
            return Ok(());
          }
          Ok(false) => {}
          Err(cause) => {
            let err = RunError::Guard {
              step: step.name().to_string(),
              cause,
            };
            self.fail(run, index, step, &err);
            return Err(err);
          }
        }
      }
    }

    info!(
      run_id = %run.run_id,
      step = %step.name(),
      kind = %step.kind(),
      action = %step.action().describe(),
      trigger = ?trigger,
      "step_started"
    );
    self.notifier.notify(ExecutionEvent::StepStarted {
      run_id: run.run_id.clone(),
      step: step.name().to_string(),
      trigger,
    });
    run.executed.push(step.name().to_string());

    if let Err(cause) = step.action().apply() {
      let err = RunError::Action {
        step: step.name().to_string(),
        cause,
      };
      self.fail(run, index, step, &err);
      return Err(err);
    }

    run.record(index, StepOutcome::Success);
    info!(run_id = %run.run_id, step = %step.name(), "step_completed");
    self.notifier.notify(ExecutionEvent::StepCompleted {
      run_id: run.run_id.clone(),
      step: step.name().to_string(),
    });

    for notification in step.notifications() {
      let target = &recipe.steps()[notification.target];
      match notification.timing {
        Timing::Immediate => {
          debug!(
            run_id = %run.run_id,
            step = %step.name(),
            target = %target.name(),
            "delivering immediate notification"
          );
          self.converge_step(
            recipe,
            notification.target,
            Trigger::Immediate {
              notifier: step.name().to_string(),
            },
            run,
          )?;
        }
        Timing::Delayed => {
          if run.delayed.insert(notification.target) {
            debug!(
              run_id = %run.run_id,
              step = %step.name(),
              target = %target.name(),
              "queued delayed notification"
            );
            self.notifier.notify(ExecutionEvent::NotificationQueued {
              run_id: run.run_id.clone(),
              notifier: step.name().to_string(),
              target: target.name().to_string(),
            });
          }
        }
      }
    }

    Ok(())
  }

  fn skip(&self, run: &mut Run, index: usize, step: &Step, reason: SkipReason) {
    // A re-triggered step that already succeeded in this run stays a success.
    if run.outcomes[index].is_none() {
      run.record(index, StepOutcome::Skipped);
    }
    info!(run_id = %run.run_id, step = %step.name(), reason = ?reason, "step_skipped");
    self.notifier.notify(ExecutionEvent::StepSkipped {
      run_id: run.run_id.clone(),
      step: step.name().to_string(),
      reason,
    });
  }

  fn fail(&self, run: &mut Run, index: usize, step: &Step, err: &RunError) {
    run.record(index, StepOutcome::Failed);
    error!(run_id = %run.run_id, step = %step.name(), error = %err, "step_failed");
    self.notifier.notify(ExecutionEvent::StepFailed {
      run_id: run.run_id.clone(),
      step: step.name().to_string(),
      error: err.to_string(),
    });
  }
}
