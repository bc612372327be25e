//! Polling loop for long-running generation jobs

use log::{debug, info, trace, warn};
use serde_json::Value;
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use crate::config::ProviderConfig;
use crate::error::Error;
use crate::providers::MediaProvider;

/// Status a provider reports for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus
{   Pending
  , Done
  , Failed
}

/// Result of a single poll: status plus the raw payload
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot
{   pub status: JobStatus
  , pub payload: Value
}

impl JobSnapshot
{   pub fn pending(payload: Value) -> Self
    {   JobSnapshot { status: JobStatus::Pending, payload }
    }

    pub fn done(payload: Value) -> Self
    {   JobSnapshot { status: JobStatus::Done, payload }
    }

    /// Error message embedded in the payload, if any
    pub fn embedded_error(&self) -> Option<String>
    {   let error = self.payload.get("error")?;
        match error
        {   Value::Null => None
          , Value::String(message) => Some(message.clone())
          , other => Some(
              other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                  "Provider returned an error while generating the media."
                    .to_string()
                })
            )
        }
    }
}

/// States of the polling state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState
{   Submitted
  , Polling
  , Done
  , Failed
  , TimedOut
  , Cancelled
}

impl PollState
{   pub fn is_terminal(&self) -> bool
    {   !matches!(self, PollState::Submitted | PollState::Polling)
    }
}

/// An in-flight job, private to one polling loop
#[derive(Debug)]
pub struct GenerationJob
{   pub operation_handle: String
  , pub status: JobStatus
  , pub attempts_made: u32
  , pub started_at: Instant
}

impl GenerationJob
{   fn new(operation_handle: String) -> Self
    {   GenerationJob
        {   operation_handle
          , status: JobStatus::Pending
          , attempts_made: 0
          , started_at: Instant::now()
        }
    }
}

/// How a loop ended, for callers that want more than the payload
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport
{   pub state: PollState
  , pub attempts: u32
  , pub elapsed: Duration
}

/// Drives one job from `submitted` to a terminal state.
///
/// Each poll is followed, while the job is still pending, by one
/// suspension of `poll_interval`. The loop gives up after
/// `max_poll_attempts` polls and stops early when `cancel` fires.
pub struct PollingLoop<'a>
{   provider: &'a dyn MediaProvider
  , config: &'a ProviderConfig
  , cancel: CancellationToken
  , state: PollState
}

impl<'a> PollingLoop<'a>
{   pub fn new(
      provider: &'a dyn MediaProvider
    , config: &'a ProviderConfig
    , cancel: CancellationToken
    ) -> Self
    {   PollingLoop
        {   provider
          , config
          , cancel
          , state: PollState::Submitted
        }
    }

    pub fn state(&self) -> PollState
    {   self.state
    }

    /// Poll until terminal; returns the completed payload
    pub async fn run(
      &mut self
    , operation_handle: String
    ) -> Result<Value, Error>
    {   self.run_with_report(operation_handle).await.0
    }

    /// Like `run`, also reporting attempts and elapsed time
    pub async fn run_with_report(
      &mut self
    , operation_handle: String
    ) -> (Result<Value, Error>, PollReport)
    {   let mut job = GenerationJob::new(operation_handle);
        let result = self.drive(&mut job).await;
        let report = PollReport
        {   state: self.state
          , attempts: job.attempts_made
          , elapsed: job.started_at.elapsed()
        };
        debug!(
          "Job {} ended {:?} after {} poll(s) in {:?}",
          job.operation_handle, report.state, report.attempts, report.elapsed
        );
        (result, report)
    }

    async fn drive(
      &mut self
    , job: &mut GenerationJob
    ) -> Result<Value, Error>
    {   let provider = self.provider;
        let config = self.config;
        let cancel = self.cancel.clone();
        let max_attempts = config.max_poll_attempts.max(1);
        let interval = config.poll_interval();
        info!(
          "Polling {} job {} (every {:?}, at most {} polls)",
          config.provider, job.operation_handle, interval, max_attempts
        );

        loop
        { let snapshot = tokio::select!
          {   _ = cancel.cancelled() => {
                return Err(self.cancelled(job));
              }
            , polled = provider.poll_job(
                &job.operation_handle,
                config
              ) => polled
          };
          job.attempts_made += 1;

          let snapshot = match snapshot
          {   Ok(snapshot) => snapshot
            , Err(e) => {
                warn!(
                  "Poll {} of job {} failed: {}",
                  job.attempts_made, job.operation_handle, e
                );
                job.status = JobStatus::Failed;
                self.state = PollState::Failed;
                return Err(e);
              }
          };
          trace!(
            "Poll {} of job {}: {:?}",
            job.attempts_made, job.operation_handle, snapshot.status
          );

          // an error field wins over the done flag
          if let Some(message) = snapshot.embedded_error()
          {   job.status = JobStatus::Failed;
              self.state = PollState::Failed;
              return Err(Error::UpstreamLogical(message));
          }

          match snapshot.status
          {   JobStatus::Done => {
                job.status = JobStatus::Done;
                self.state = PollState::Done;
                return Ok(snapshot.payload);
              }
            , JobStatus::Failed => {
                job.status = JobStatus::Failed;
                self.state = PollState::Failed;
                return Err(Error::UpstreamLogical(format!(
                  "{} reported the job as failed",
                  config.provider
                )));
              }
            , JobStatus::Pending => {}
          }

          if job.attempts_made >= max_attempts
          {   warn!(
                "Job {} still pending after {} polls",
                job.operation_handle, job.attempts_made
              );
              self.state = PollState::TimedOut;
              return Err(Error::Timeout
              {   attempts: job.attempts_made
              });
          }

          self.state = PollState::Polling;
          tokio::select!
          {   _ = cancel.cancelled() => {
                return Err(self.cancelled(job));
              }
            , _ = sleep(interval) => {}
          }
        }
    }

    fn cancelled(&mut self, job: &GenerationJob) -> Error
    {   info!(
          "Job {} cancelled after {} poll(s)",
          job.operation_handle, job.attempts_made
        );
        self.state = PollState::Cancelled;
        Error::Cancelled
    }
}
