use listing_core::{update, AppState, Msg};

#[test]
fn update_is_noop() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn dismissing_without_notice_is_noop() {
    let state = AppState::new();
    let (mut next, effects) = update(state.clone(), Msg::NoticeDismissed);

    assert!(effects.is_empty());
    assert!(next.take_changes().is_empty());
    assert_eq!(next.view(), state.view());
}
