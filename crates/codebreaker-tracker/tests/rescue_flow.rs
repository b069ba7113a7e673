//! End-to-end rescue flow against a directory-backed store.

use codebreaker_core::{ProblemType, PromptStyle, Theme, UserPreferences};
use codebreaker_store::{FileKv, SessionStore};
use codebreaker_timer::ManualClock;
use codebreaker_tracker::SessionTracker;

fn open(dir: &std::path::Path, clock: &ManualClock) -> SessionTracker<FileKv, ManualClock> {
    let kv = FileKv::new(dir).unwrap();
    SessionTracker::with_clock(SessionStore::new(kv), clock.clone())
}

#[test]
fn bug_rescue_with_rubber_duck() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::default();
    let mut tracker = open(dir.path(), &clock);

    let session = tracker.create_session(ProblemType::Bug, "rubber_duck", ["stepA", "stepB"]);
    assert_eq!(session.steps_completed, 0);

    tracker.start_step(session.id, 0).unwrap();
    clock.advance_secs(5);
    assert_eq!(tracker.complete_step(session.id, 0).unwrap(), 5);

    let done = tracker.mark_success(session.id).unwrap();
    assert!(done.success);
    let completed_at = done.completed_at.expect("completedAt set on success");
    assert!(completed_at >= done.start_time);
    assert_eq!(done.steps_completed, 1);
    assert_eq!(done.total_time_spent, 5);

    // A fresh handle on the same directory sees the same record.
    let reopened = open(dir.path(), &clock);
    assert_eq!(reopened.store().get_session(session.id), Some(done));
}

#[test]
fn backup_restores_into_fresh_directory() {
    let clock = ManualClock::default();

    let source_dir = tempfile::tempdir().unwrap();
    let mut source = open(source_dir.path(), &clock);
    let solved = source.create_session(ProblemType::Performance, "profile_first", ["Profile"]);
    source.start_step(solved.id, 0).unwrap();
    clock.advance_secs(90);
    source.complete_step(solved.id, 0).unwrap();
    source.mark_success(solved.id).unwrap();
    source.create_session(ProblemType::Concept, "read_docs", ["Read", "Try"]);
    source.store_mut().save_preferences(&UserPreferences {
        theme: Theme::Light,
        default_prompt_style: PromptStyle::Guided,
    });
    let exported = source.store().export_data().unwrap();

    let target_dir = tempfile::tempdir().unwrap();
    let mut target = open(target_dir.path(), &clock);
    assert!(target.store_mut().import_data(&exported));

    assert_eq!(
        target.store().list_sessions(),
        source.store().list_sessions()
    );
    assert_eq!(
        target.store().get_preferences(),
        source.store().get_preferences()
    );

    // New ids keep clear of imported ones, on the same handle and after reopening.
    let fresh = target.create_session(ProblemType::Bug, "bisect", ["Split"]);
    let mut reopened = open(target_dir.path(), &clock);
    let later = reopened.create_session(ProblemType::Bug, "bisect", ["Split"]);
    for imported in source.store().list_sessions() {
        assert!(imported.id < fresh.id);
        assert_eq!(reopened.store().get_session(imported.id), Some(imported));
    }
    assert!(fresh.id < later.id);
    assert_eq!(reopened.store().list_sessions().len(), 4);
}
