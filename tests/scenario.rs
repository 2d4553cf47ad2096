//! 测试典型剧情场景

mod common;

use std::sync::Arc;

use common::*;
use greatdori_story::models::{Action, Position, TalkData};
use greatdori_story::player::*;

fn nested_scope(player: &DefaultPlayer) -> Arc<Barrier> {
    player
        .session()
        .scopes()
        .into_iter()
        .find(|scope| {
            scope
                .parent()
                .is_some_and(|parent| parent.id() == player.root().id())
        })
        .expect("nested scope should be alive")
}

//////////////// test ////////////////

#[tokio::test(start_paused = true)]
async fn test_single_talk() {
    let (mut player, _) = player(vec![Action::Talk(TalkData::new(
        "Hi",
        [1],
        ["Alice"],
        None,
    ))]);
    player.start().unwrap();
    idle().await;

    assert_eq!(
        player.presentation().talk,
        Some(TalkData::new("Hi", [1], ["Alice"], None))
    );
    assert_eq!(player.root().outstanding(), 1);
    assert_eq!(player.root().outstanding_taps(), 1);
    assert_eq!(player.status(), Status::Playing);

    assert!(player.next());
    idle().await;

    assert_eq!(player.root().outstanding(), 0);
    assert_eq!(player.root().outstanding_taps(), 0);
    assert_eq!(player.finished().await, Status::Completed);
    assert_eq!(player.backlog().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_blocking_delays() {
    let (mut player, _) = player(vec![Action::Blocking {
        actions: vec![delay(1.), delay(2.)],
    }]);
    player.start().unwrap();
    idle().await;

    let nested = nested_scope(&player);
    assert_eq!(player.root().outstanding(), 0);
    assert_eq!(nested.outstanding(), 2);

    advance(1.).await;
    assert_eq!(nested.outstanding(), 1);
    assert_eq!(player.status(), Status::Playing);

    advance(1.).await;
    assert_eq!(nested.outstanding(), 0);
    assert_eq!(player.status(), Status::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_show_then_hide() {
    let (mut player, _) = player(vec![
        Action::ShowModel {
            character_id: 1,
            model_path: "m1".to_string(),
            position: Position::Center,
        },
        Action::HideModel { character_id: 1 },
    ]);
    player.start().unwrap();
    idle().await;

    // 两个动作都在等待过渡结束
    assert_eq!(player.root().outstanding(), 2);
    assert!(player.presentation().layout(1).is_none());

    advance(0.35).await;
    assert_eq!(player.root().outstanding(), 0);
    assert_eq!(player.status(), Status::Completed);
    assert!(player.presentation().layouts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_layout_exists_between() {
    let (mut player, _) = player(vec![
        Action::ShowModel {
            character_id: 1,
            model_path: "m1".to_string(),
            position: Position::LeftInside,
        },
        delay(1.),
        Action::HideModel { character_id: 1 },
    ]);
    player.start().unwrap();

    advance(0.5).await;
    let layout = player.presentation().layout(1).cloned().unwrap();
    assert_eq!(layout.model_path, "m1");
    assert_eq!(layout.position, Position::LeftInside);

    advance(1.).await;
    assert!(player.presentation().layout(1).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cover_race() {
    let covers = |first: Action, second: Action| {
        player(vec![Action::Blocking {
            actions: vec![first, second],
        }])
    };

    // 后派发的显示生效
    let (mut player, _) = covers(
        Action::ShowBlackCover { duration: 1. },
        Action::ShowWhiteCover { duration: 1. },
    );
    player.start().unwrap();
    idle().await;
    let state = player.presentation();
    assert!(state.black_cover.visible && state.white_cover.visible);

    advance(1.05).await;
    let state = player.presentation();
    assert!(!state.black_cover.visible);
    assert!(state.white_cover.visible);
    assert_eq!(player.status(), Status::Completed);

    let (mut player, _) = covers(
        Action::ShowWhiteCover { duration: 1. },
        Action::ShowBlackCover { duration: 1. },
    );
    player.start().unwrap();
    advance(1.05).await;
    let state = player.presentation();
    assert!(state.black_cover.visible);
    assert!(!state.white_cover.visible);
}

#[tokio::test(start_paused = true)]
async fn test_cover_sequence() {
    let (mut player, _) = player(vec![
        Action::ShowWhiteCover { duration: 0.5 },
        Action::ShowBlackCover { duration: 0.5 },
        Action::HideBlackCover { duration: 0.5 },
    ]);
    player.start().unwrap();

    advance(0.75).await;
    let state = player.presentation();
    assert!(state.white_cover.visible && state.black_cover.visible);

    advance(0.5).await;
    let state = player.presentation();
    assert!(!state.white_cover.visible);
    assert!(!state.black_cover.visible);
    assert_eq!(player.status(), Status::Playing);

    advance(0.3).await;
    assert_eq!(player.status(), Status::Completed);
}
