//! End-to-end event flow tests
//!
//! Exercises the assembled server state: status transitions and courier
//! GPS samples fan out as one ordered, gap-free stream per order, and
//! the notification dispatcher alerts exactly once per status change.

use std::sync::Arc;
use std::time::Duration;

use shared::location::{CourierLocation, GeoPoint};
use shared::tracking::OrderStatus;
use tokio::time::sleep;
use tracking_server::{
    BackgroundTasks, Config, MemoryDirectory, OrderDirectory, OrderSeed, RecordingAlertSink,
    ServerState, TracingAlertSink,
};

fn seed(order_id: &str, status: OrderStatus, courier_id: Option<&str>) -> OrderSeed {
    OrderSeed {
        order_id: order_id.into(),
        status,
        courier_id: courier_id.map(Into::into),
        customer_target_location: GeoPoint { lat: 41.38, lng: 2.17 },
    }
}

fn gps(courier_id: &str, ts: i64) -> CourierLocation {
    CourierLocation {
        courier_id: courier_id.into(),
        lat: 41.39,
        lng: 2.16,
        timestamp: ts,
        accuracy: Some(10.0),
        speed: Some(5.0),
        heading: Some(180.0),
    }
}

fn assemble(directory: Arc<MemoryDirectory>) -> ServerState {
    ServerState::initialize(
        &Config::default(),
        directory as Arc<dyn OrderDirectory>,
        Arc::new(TracingAlertSink),
    )
}

#[tokio::test]
async fn full_delivery_produces_gap_free_ordered_stream() {
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(seed("o-1", OrderStatus::Confirmed, None));
    let state = assemble(Arc::clone(&directory));

    let mut sub = state.bus().subscribe("o-1");

    state
        .tracking()
        .apply_transition("o-1", OrderStatus::Preparing, None, "restaurant")
        .await
        .unwrap();

    // 配送员在备餐期间被指派，进入在途时生效
    directory.assign_courier("o-1", "C1");
    state
        .tracking()
        .apply_transition("o-1", OrderStatus::InTransit, None, "courier")
        .await
        .unwrap();

    state.locations().record_sample(gps("C1", 1_000));
    state
        .tracking()
        .apply_transition("o-1", OrderStatus::OutForDelivery, None, "courier")
        .await
        .unwrap();
    state.locations().record_sample(gps("C1", 2_000));
    state
        .tracking()
        .apply_transition("o-1", OrderStatus::Nearby, None, "courier")
        .await
        .unwrap();
    state
        .tracking()
        .apply_transition("o-1", OrderStatus::Delivered, None, "courier")
        .await
        .unwrap();

    let mut kinds = Vec::new();
    for expected_seq in 1..=7u64 {
        let ev = sub.receiver.recv().await.unwrap();
        assert_eq!(ev.seq, expected_seq);
        kinds.push(ev.kind().to_string());
    }
    assert_eq!(
        kinds,
        vec![
            "status_changed",
            "status_changed",
            "location_updated",
            "status_changed",
            "location_updated",
            "status_changed",
            "status_changed",
        ]
    );

    // 审计要求：送达后 courier_id 保留，但位置不再进快照
    let snap = state.tracking().snapshot("o-1").await.unwrap();
    assert_eq!(snap.record.status, OrderStatus::Delivered);
    assert_eq!(snap.record.courier_id.as_deref(), Some("C1"));
    assert!(snap.courier_location.is_none());
    assert_eq!(snap.record.progress, 100);
}

#[tokio::test]
async fn snapshot_carries_location_only_while_courier_en_route() {
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(seed("o-1", OrderStatus::Preparing, Some("C1")));
    let state = assemble(Arc::clone(&directory));

    // 备餐阶段：已有样本也不外露
    state.locations().record_sample(gps("C1", 1_000));
    let snap = state.tracking().snapshot("o-1").await.unwrap();
    assert!(snap.courier_location.is_none());

    state
        .tracking()
        .apply_transition("o-1", OrderStatus::InTransit, None, "courier")
        .await
        .unwrap();
    let snap = state.tracking().snapshot("o-1").await.unwrap();
    assert_eq!(snap.courier_location.unwrap().timestamp, 1_000);
}

#[tokio::test]
async fn out_of_order_gps_never_regresses_published_state() {
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(seed("o-1", OrderStatus::Preparing, Some("C1")));
    let state = assemble(Arc::clone(&directory));

    state
        .tracking()
        .apply_transition("o-1", OrderStatus::InTransit, None, "courier")
        .await
        .unwrap();

    // 乱序到达：T2 先到，T1 后到
    state.locations().record_sample(gps("C1", 2_000));
    state.locations().record_sample(gps("C1", 1_000));

    // 陈旧样本既不进槽位也不发事件
    assert_eq!(state.locations().latest("C1").unwrap().timestamp, 2_000);
    assert_eq!(state.bus().current_seq("o-1"), 2);
}

#[tokio::test]
async fn dispatcher_alerts_once_per_status_change() {
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(seed("o-1", OrderStatus::Preparing, Some("C1")));
    let sink = Arc::new(RecordingAlertSink::new());
    let state = ServerState::initialize(
        &Config::default(),
        Arc::clone(&directory) as Arc<dyn OrderDirectory>,
        Arc::clone(&sink) as _,
    );

    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(&mut tasks);

    state
        .tracking()
        .apply_transition("o-1", OrderStatus::InTransit, None, "courier")
        .await
        .unwrap();
    // 位置 tick 不产生提醒
    state.locations().record_sample(gps("C1", 1_000));
    state.locations().record_sample(gps("C1", 2_000));
    state
        .tracking()
        .apply_transition("o-1", OrderStatus::OutForDelivery, None, "courier")
        .await
        .unwrap();

    sleep(Duration::from_millis(200)).await;
    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].status, OrderStatus::InTransit);
    assert_eq!(delivered[1].status, OrderStatus::OutForDelivery);

    tasks.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn rejected_transition_is_invisible_to_watchers() {
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert(seed("o-1", OrderStatus::Confirmed, None));
    let state = assemble(Arc::clone(&directory));

    let mut sub = state.bus().subscribe("o-1");

    let _ = state
        .tracking()
        .apply_transition("o-1", OrderStatus::Delivered, None, "ops")
        .await
        .unwrap_err();
    state
        .tracking()
        .apply_transition("o-1", OrderStatus::Preparing, None, "ops")
        .await
        .unwrap();

    // 失败的尝试没有占用 seq
    let ev = sub.receiver.recv().await.unwrap();
    assert_eq!(ev.seq, 1);
    assert_eq!(ev.kind(), "status_changed");

    let snap = state.tracking().snapshot("o-1").await.unwrap();
    assert_eq!(snap.record.status_history.len(), 2);
}
