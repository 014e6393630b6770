use traceline_schema::{
    JobEvent, JobState, Persistable, PersistenceError, Record, Session, SessionError,
    SessionResult, ViolationKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionCall {
    Add,
    Merge,
    Flush,
    Commit,
}

/// Fake session recording the order of operations a record performs.
#[derive(Default)]
struct RecordingSession {
    calls: Vec<SessionCall>,
    fail_next_flush: Option<PersistenceError>,
}

impl Session for RecordingSession {
    fn add(&mut self, _record: &dyn Record) -> SessionResult<()> {
        self.calls.push(SessionCall::Add);
        Ok(())
    }

    fn merge(&mut self, _record: &dyn Record) -> SessionResult<()> {
        self.calls.push(SessionCall::Merge);
        Ok(())
    }

    fn flush(&mut self) -> SessionResult<()> {
        self.calls.push(SessionCall::Flush);
        match self.fail_next_flush.take() {
            Some(violation) => Err(SessionError::Integrity(violation)),
            None => Ok(()),
        }
    }

    fn commit(&mut self) -> SessionResult<()> {
        self.calls.push(SessionCall::Commit);
        Ok(())
    }
}

fn sample_event() -> JobEvent {
    JobEvent::new("stage-in", JobState::Running, 1_700_000_000_000)
}

#[test]
fn save_stages_flushes_then_commits() {
    let mut session = RecordingSession::default();

    sample_event().save(&mut session, false).unwrap();

    assert_eq!(
        session.calls,
        [SessionCall::Add, SessionCall::Flush, SessionCall::Commit]
    );
}

#[test]
fn batched_save_only_stages() {
    let mut session = RecordingSession::default();

    sample_event().save(&mut session, true).unwrap();

    assert_eq!(session.calls, [SessionCall::Add]);
}

#[test]
fn merge_stages_via_merge_not_add() {
    let mut session = RecordingSession::default();

    sample_event().merge(&mut session, false).unwrap();

    assert_eq!(
        session.calls,
        [SessionCall::Merge, SessionCall::Flush, SessionCall::Commit]
    );
}

#[test]
fn batched_merge_only_stages() {
    let mut session = RecordingSession::default();

    sample_event().merge(&mut session, true).unwrap();

    assert_eq!(session.calls, [SessionCall::Merge]);
}

#[test]
fn batched_saves_accumulate_before_a_single_flush() {
    let mut session = RecordingSession::default();

    sample_event().save(&mut session, true).unwrap();
    sample_event().save(&mut session, true).unwrap();
    session.flush().unwrap();
    session.commit().unwrap();

    assert_eq!(
        session.calls,
        [
            SessionCall::Add,
            SessionCall::Add,
            SessionCall::Flush,
            SessionCall::Commit
        ]
    );
}

#[test]
fn flush_violation_surfaces_and_skips_commit() {
    let mut session = RecordingSession {
        fail_next_flush: Some(PersistenceError::new(
            ViolationKind::Unique,
            "UNIQUE constraint failed: job_event.event_id",
        )),
        ..RecordingSession::default()
    };

    let err = sample_event().save(&mut session, false).unwrap_err();

    match err {
        SessionError::Integrity(violation) => {
            assert_eq!(violation.kind, ViolationKind::Unique);
            assert_eq!(
                violation.to_string(),
                "PersistenceError: UNIQUE constraint failed: job_event.event_id"
            );
        }
        other => panic!("expected integrity violation, got: {other}"),
    }
    assert_eq!(session.calls, [SessionCall::Add, SessionCall::Flush]);
}
