//! Tests for the data model: definition validation, run transitions, serde.

use chrono::Utc;

use zapflow::engine::error::EngineError;
use zapflow::engine::types::*;

fn step(id: &str, next: Option<&str>) -> StepDefinition {
    StepDefinition {
        id: id.to_string(),
        step_type: "log".to_string(),
        config: serde_json::json!({"message": "hi"}),
        next_step_id: next.map(|s| s.to_string()),
    }
}

fn workflow(entry: &str, steps: Vec<StepDefinition>) -> WorkflowDefinition {
    WorkflowDefinition {
        id: "wf".to_string(),
        name: "Test".to_string(),
        description: None,
        entry_point: entry.to_string(),
        steps,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ===== WorkflowDefinition validation =====

#[test]
fn valid_chain_passes() {
    let wf = workflow("a", vec![step("a", Some("b")), step("b", None)]);
    assert!(wf.validate().is_ok());
}

#[test]
fn empty_steps_rejected() {
    let wf = workflow("a", vec![]);
    assert!(matches!(wf.validate(), Err(EngineError::InvalidDefinition(_))));
}

#[test]
fn duplicate_step_ids_rejected() {
    let wf = workflow("a", vec![step("a", None), step("a", None)]);
    assert!(matches!(wf.validate(), Err(EngineError::InvalidDefinition(_))));
}

#[test]
fn dangling_entry_point_rejected() {
    let wf = workflow("ghost", vec![step("a", None)]);
    let err = wf.validate().unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn dangling_next_step_rejected() {
    let wf = workflow("a", vec![step("a", Some("ghost"))]);
    let err = wf.validate().unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn path_unsafe_workflow_id_rejected() {
    // Ids become storage filenames, so traversal sequences must not validate.
    for bad in ["", "../escape", "a/b", r"a\b", "..", "nested/../../etc"] {
        let mut wf = workflow("a", vec![step("a", None)]);
        wf.id = bad.to_string();
        assert!(
            matches!(wf.validate(), Err(EngineError::InvalidDefinition(_))),
            "id {:?} should be rejected",
            bad
        );
    }

    let mut wf = workflow("a", vec![step("a", None)]);
    wf.id = "daily-report_v2.1".to_string();
    assert!(wf.validate().is_ok());
}

#[test]
fn step_lookup() {
    let wf = workflow("a", vec![step("a", Some("b")), step("b", None)]);
    assert_eq!(wf.step("b").unwrap().id, "b");
    assert!(wf.step("c").is_none());
}

// ===== Run state machine transitions =====

#[test]
fn new_run_is_pending_at_entry() {
    let run = Run::new("wf", "a", Context::new());
    assert_eq!(run.status, RunStatus::Pending);
    assert_eq!(run.current_step_id.as_deref(), Some("a"));
    assert!(run.steps.is_empty());
    assert!(run.started_at.is_none());
    assert!(run.error.is_none());
}

#[test]
fn begin_moves_to_running() {
    let mut run = Run::new("wf", "a", Context::new());
    run.begin();
    assert_eq!(run.status, RunStatus::Running);
    assert!(run.started_at.is_some());
}

#[test]
fn complete_step_merges_output_last_write_wins() {
    let mut ctx = Context::new();
    ctx.insert("k".to_string(), serde_json::json!("old"));
    let mut run = Run::new("wf", "a", ctx);
    run.begin();

    run.start_step("a");
    let mut output = ConnectorOutput::new();
    output.insert("k".to_string(), serde_json::json!("new"));
    output.insert("extra".to_string(), serde_json::json!(1));
    run.complete_step(output);

    assert_eq!(run.context.get("k").unwrap(), &serde_json::json!("new"));
    assert_eq!(run.context.get("extra").unwrap(), &serde_json::json!(1));

    let record = run.step_record("a").unwrap();
    assert_eq!(record.status, StepStatus::Completed);
    assert!(record.started_at.is_some());
    assert!(record.ended_at.is_some());
    assert!(record.output.is_some());
}

#[test]
fn empty_output_stored_as_none() {
    let mut run = Run::new("wf", "a", Context::new());
    run.begin();
    run.start_step("a");
    run.complete_step(ConnectorOutput::new());

    assert!(run.step_record("a").unwrap().output.is_none());
}

#[test]
fn fail_step_finalizes_record_and_run() {
    let mut run = Run::new("wf", "a", Context::new());
    run.begin();
    run.start_step("a");
    run.fail_step("it broke");

    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.status.is_terminal());
    assert!(run.completed_at.is_some());
    assert!(run.current_step_id.is_none());
    assert_eq!(run.error.as_deref(), Some("step 'a' failed: it broke"));

    let record = run.step_record("a").unwrap();
    assert_eq!(record.status, StepStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("it broke"));
}

#[test]
fn complete_is_terminal() {
    let mut run = Run::new("wf", "a", Context::new());
    run.begin();
    run.complete();

    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.status.is_terminal());
    assert!(run.completed_at.is_some());
    assert!(run.current_step_id.is_none());
}

#[test]
fn pending_and_running_are_not_terminal() {
    assert!(!RunStatus::Pending.is_terminal());
    assert!(!RunStatus::Running.is_terminal());
    assert!(!RunStatus::Paused.is_terminal());
}

// ===== Serde =====

#[test]
fn statuses_serialize_lowercase() {
    assert_eq!(
        serde_json::to_string(&RunStatus::Completed).unwrap(),
        "\"completed\""
    );
    assert_eq!(
        serde_json::to_string(&StepStatus::Failed).unwrap(),
        "\"failed\""
    );
    assert_eq!(
        serde_json::from_str::<RunStatus>("\"paused\"").unwrap(),
        RunStatus::Paused
    );
}

#[test]
fn step_definition_accepts_minimal_json() {
    let step: StepDefinition =
        serde_json::from_str(r#"{"id": "a", "type": "delay"}"#).unwrap();
    assert_eq!(step.step_type, "delay");
    assert!(step.next_step_id.is_none());
    assert!(step.config.is_null());
}

#[test]
fn workflow_definition_defaults_timestamps() {
    let wf: WorkflowDefinition = serde_json::from_str(
        r#"{
            "id": "wf",
            "name": "Test",
            "entry_point": "a",
            "steps": [{"id": "a", "type": "log", "config": {"message": "hi"}}]
        }"#,
    )
    .unwrap();
    assert!(wf.validate().is_ok());
}

#[test]
fn run_round_trips_through_json() {
    let mut run = Run::new("wf", "a", Context::new());
    run.begin();
    run.start_step("a");
    run.complete_step(ConnectorOutput::new());
    run.complete();

    let json = serde_json::to_string(&run).unwrap();
    let parsed: Run = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.id, run.id);
    assert_eq!(parsed.status, RunStatus::Completed);
    assert_eq!(parsed.steps.len(), 1);
    // Terminal runs serialize without a current step
    assert!(!json.contains("current_step_id"));
}
