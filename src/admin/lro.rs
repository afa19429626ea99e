use std::time::Duration;

use crate::error::AdminError;

use super::{AdminResult, InstanceAdmin, Operation};

#[derive(Clone, Debug, PartialEq)]
pub struct PollPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            multiplier: 1.5,
            max: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    fn next_delay(
        &self,
        current: Duration,
    ) -> Duration {
        current.mul_f64(self.multiplier).min(self.max)
    }
}

/// Blocks until the operation is done and surfaces its terminal error.
pub async fn wait_operation(
    admin: &dyn InstanceAdmin,
    mut operation: Operation,
    policy: &PollPolicy,
) -> AdminResult<Operation> {
    let mut delay = policy.initial;
    let mut polls = 0usize;

    while !operation.done {
        let pause = match admin.deadline() {
            Some(deadline) => delay.min(deadline.remaining()),
            None => delay,
        };
        tracing::debug!(operation = %operation.name, ?pause, "operation still running");
        tokio::time::sleep(pause).await;

        operation = admin.get_operation(&operation.name).await?;
        polls += 1;
        delay = policy.next_delay(delay);
    }

    tracing::info!(operation = %operation.name, polls, "operation finished");
    match operation.error.take() {
        Some(status) => Err(AdminError::Operation {
            name: operation.name,
            status,
        }),
        None => Ok(operation),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        admin::{Code, Operation, Status, memory::MemoryInstanceAdmin},
        error::AdminError,
    };

    use super::{PollPolicy, wait_operation};

    fn instant_policy() -> PollPolicy {
        PollPolicy {
            initial: Duration::ZERO,
            multiplier: 1.5,
            max: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_is_capped() {
        let policy = PollPolicy::default();
        let mut delay = policy.initial;
        for _ in 0..10 {
            delay = policy.next_delay(delay);
        }
        assert_eq!(delay, Duration::from_secs(10));
        assert_eq!(
            policy.next_delay(Duration::from_secs(2)),
            Duration::from_secs(3)
        );
    }

    #[tokio::test]
    async fn polls_until_done() {
        let admin = MemoryInstanceAdmin::new();
        let pending = admin.insert_operation("projects/p/operations/op-1", 3, None);

        let finished = wait_operation(&admin, pending, &instant_policy())
            .await
            .expect("operation must finish");

        assert!(finished.done);
        assert_eq!(admin.calls("GetOperation"), 3);
    }

    #[tokio::test]
    async fn done_operation_is_not_polled() {
        let admin = MemoryInstanceAdmin::new();
        let operation = Operation {
            name: "projects/p/operations/op-2".to_string(),
            done: true,
            ..Operation::default()
        };

        wait_operation(&admin, operation, &instant_policy())
            .await
            .expect("done operation must succeed");
        assert_eq!(admin.calls("GetOperation"), 0);
    }

    #[tokio::test]
    async fn surfaces_terminal_error() {
        let admin = MemoryInstanceAdmin::new();
        let pending = admin.insert_operation(
            "projects/p/operations/op-3",
            1,
            Some(Status::new(Code::InvalidArgument, "replicas incomplete")),
        );

        let error = wait_operation(&admin, pending, &instant_policy())
            .await
            .expect_err("terminal error must surface");

        match error {
            AdminError::Operation { name, status } => {
                assert_eq!(name, "projects/p/operations/op-3");
                assert_eq!(status.code, Code::InvalidArgument);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
