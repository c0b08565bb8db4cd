use tracker_core::{update, FeatureKind, Msg, TrackerState};

#[test]
fn update_is_noop() {
    let state = TrackerState::for_feature(FeatureKind::TopicShort);
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
