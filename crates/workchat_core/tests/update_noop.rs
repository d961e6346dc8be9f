use workchat_core::{update, AppState, Msg};

#[test]
fn stray_completions_leave_fresh_state_untouched() {
    let state = AppState::new();
    let (next, effects) = update(
        state.clone(),
        Msg::DeleteFinished {
            name: "ghost.txt".to_string(),
            result: Ok(()),
        },
    );
    assert_eq!(state, next);
    assert!(effects.is_empty());

    let (next, effects) = update(next, Msg::ListingFetched(Ok(Vec::new())));
    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn fresh_state_has_no_outstanding_work() {
    assert!(AppState::new().is_settled());
}
