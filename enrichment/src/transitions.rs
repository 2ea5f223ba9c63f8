//! Valid state transitions for [`Record`].
//!
//! Each method consumes the record in its current state and returns it in
//! the new one; there is no way to construct an invalid transition because
//! the only public constructor is [`Record::new`] (always `Pending`), and
//! `Failed -> Pending` is the single explicitly-permitted backwards edge.

use chrono::Utc;

use crate::ids::Stage;
use crate::request::{Failed, InProgress, Pending, Record, Succeeded};

impl Record<Pending> {
    /// Move a claimed record into `InProgress`, advancing its stage marker.
    pub fn start(mut self, stage: Stage) -> Record<InProgress> {
        self.stage = stage;
        self.updated_at = Utc::now();
        Record {
            request_id: self.request_id,
            material_key: self.material_key,
            stage: self.stage,
            input_snapshot: self.input_snapshot,
            output: self.output,
            error: None,
            attempts: self.attempts + 1,
            updated_at: self.updated_at,
            state: InProgress { started_at: Utc::now() },
        }
    }
}

impl Record<InProgress> {
    /// Advance the stage marker without changing state (parse -> normalize -> assign-sku -> persist).
    pub fn advance(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self.updated_at = Utc::now();
        self
    }

    pub fn succeed(mut self, output: serde_json::Value) -> Record<Succeeded> {
        self.updated_at = Utc::now();
        Record {
            request_id: self.request_id,
            material_key: self.material_key,
            stage: Stage::Done,
            input_snapshot: self.input_snapshot,
            output: Some(output),
            error: None,
            attempts: self.attempts,
            updated_at: self.updated_at,
            state: Succeeded { completed_at: Utc::now() },
        }
    }

    pub fn fail(mut self, error: String, permanent: bool) -> Record<Failed> {
        self.updated_at = Utc::now();
        Record {
            request_id: self.request_id,
            material_key: self.material_key,
            stage: self.stage,
            input_snapshot: self.input_snapshot,
            output: self.output,
            error: Some(error),
            attempts: self.attempts,
            updated_at: self.updated_at,
            state: Failed {
                failed_at: Utc::now(),
                permanent,
            },
        }
    }
}

impl Record<Failed> {
    /// Explicit retry: the only legal `Failed -> Pending` edge. Returns
    /// `None` for permanent errors or once the retry budget is exhausted —
    /// callers should check both before invoking this.
    pub fn retry(mut self, retry_budget: u32) -> Option<Record<Pending>> {
        if self.state.permanent || self.attempts >= retry_budget {
            return None;
        }
        self.updated_at = Utc::now();
        Some(Record {
            request_id: self.request_id,
            material_key: self.material_key,
            stage: Stage::Queued,
            input_snapshot: self.input_snapshot,
            output: self.output,
            error: self.error,
            attempts: self.attempts,
            updated_at: self.updated_at,
            state: Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RequestId;

    fn pending() -> Record<Pending> {
        Record::new(RequestId::new(), "sku-key-1".into(), serde_json::json!({"name": "x"}))
    }

    #[test]
    fn pending_to_in_progress_to_succeeded() {
        let r = pending();
        let r = r.start(Stage::Parsing);
        assert_eq!(r.attempts, 1);
        let r = r.advance(Stage::Normalizing);
        assert_eq!(r.stage, Stage::Normalizing);
        let r = r.succeed(serde_json::json!({"sku": "CEM-500"}));
        assert!(r.output.is_some());
    }

    #[test]
    fn failed_retries_until_budget_exhausted() {
        let mut failed = pending().start(Stage::Parsing).fail("boom".into(), false);
        for _ in 0..2 {
            let p = failed.clone().retry(3).expect("should retry");
            failed = p.start(Stage::Parsing).fail("boom again".into(), false);
        }
        assert_eq!(failed.attempts, 3);
        assert!(failed.clone().retry(3).is_none());
    }

    #[test]
    fn permanent_failures_never_retry() {
        let failed = pending().start(Stage::Parsing).fail("invalid row".into(), true);
        assert!(failed.retry(5).is_none());
    }
}
