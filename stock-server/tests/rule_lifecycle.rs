//! Rule lifecycle integration tests: scheduling dedup, guarded transitions,
//! and the end-to-end hide / scheduled-return scenarios.

mod common;

use common::{TestContext, remote_product, remote_variant, setup};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use stock_server::db::repository::{inventory, product as product_repo, rule as rule_repo, store as store_repo};
use stock_server::poller::SchedulePoller;
use stock_server::rules::{ApplyOutcome, ScheduleResult};

use shared::models::{
    ActionKind, ApplicationStatus, LogAction, Product, RuleDraft, Store, TriggerKind,
};
use shared::util::now_millis;

/// Install a store and mirror one product with a single variant
/// (inventory_item_id 5000) at the given availability.
async fn store_with_product(ctx: &TestContext, available: i64) -> (Store, Product) {
    let store = store_repo::install(ctx.pool(), "demo.myshopify.com", None, "token")
        .await
        .unwrap();
    ctx.catalog.set_products(vec![remote_product(
        100,
        "Blue Shirt",
        Some("Shirts"),
        Some("Acme"),
        vec![remote_variant(1000, 5000, "19.90")],
    )]);
    ctx.catalog.set_level(5000, 1, available);
    ctx.state.sync_engine().synchronize(store.id).await.unwrap();

    let product = product_repo::find_by_remote_id(ctx.pool(), store.id, 100)
        .await
        .unwrap()
        .unwrap();
    (store, product)
}

fn hide_rule(store_id: i64) -> RuleDraft {
    RuleDraft::new(store_id, "Hide when sold out", ActionKind::HideProduct)
}

#[tokio::test]
async fn scenario_a_zero_delay_hide_rule_end_to_end() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 2).await;
    rule_repo::create(ctx.pool(), hide_rule(store.id)).await.unwrap();

    // Webhook reports the last units gone.
    ctx.state
        .event_processor()
        .on_inventory_level_update(&store.shop_domain, 5000, 1, 0)
        .await
        .unwrap();

    let product = product_repo::find_by_id(ctx.pool(), product.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!product.is_visible);
    assert!(product.hidden_at.is_some());

    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].status, ApplicationStatus::Applied);
    assert!(applications[0].applied_at.is_some());

    // Audit trail: the sync entry for the level update plus one rule entry.
    let logs = inventory::logs_for_product(ctx.pool(), product.id).await.unwrap();
    let rule_logs: Vec<_> = logs.iter().filter(|l| l.action == LogAction::Rule).collect();
    assert_eq!(rule_logs.len(), 1);
    assert_eq!(rule_logs[0].previous_status.as_deref(), Some("visible"));
    assert_eq!(rule_logs[0].new_status.as_deref(), Some("hidden"));

    // The visibility change was pushed to the remote catalog.
    assert_eq!(
        ctx.catalog.product_updates(),
        vec![(100, Some("draft".to_string()))]
    );
}

#[tokio::test]
async fn out_of_stock_needs_zero_total_across_all_locations() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;
    ctx.catalog.set_level(5000, 2, 1);
    ctx.state.sync_engine().synchronize(store.id).await.unwrap();
    rule_repo::create(ctx.pool(), hide_rule(store.id)).await.unwrap();

    // One unit at a second location → total 1 → not out of stock.
    let rules = ctx.state.rule_engine();
    let scheduled = rules.evaluate_stock_state(&store, &product).await.unwrap();
    assert_eq!(scheduled, 0);
    assert!(
        rule_repo::applications_for_product(ctx.pool(), product.id)
            .await
            .unwrap()
            .is_empty()
    );

    // Total back to zero → the rule fires.
    ctx.catalog.set_level(5000, 2, 0);
    ctx.state.sync_engine().synchronize(store.id).await.unwrap();
    let scheduled = rules.evaluate_stock_state(&store, &product).await.unwrap();
    assert_eq!(scheduled, 1);
}

#[tokio::test]
async fn low_stock_rule_fires_within_its_threshold_only() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 3).await;
    let mut draft = RuleDraft::new(store.id, "Low stock notice", ActionKind::HideProduct);
    draft.trigger_type = TriggerKind::LowStock;
    draft.threshold = 2;
    draft.delay_minutes = 60;
    rule_repo::create(ctx.pool(), draft).await.unwrap();

    let rules = ctx.state.rule_engine();

    // Total 3 is above the threshold.
    assert_eq!(rules.evaluate_stock_state(&store, &product).await.unwrap(), 0);

    // Total 2 is low stock.
    ctx.catalog.set_level(5000, 1, 2);
    ctx.state.sync_engine().synchronize(store.id).await.unwrap();
    assert_eq!(rules.evaluate_stock_state(&store, &product).await.unwrap(), 1);

    // Total 0 is out-of-stock territory, not low stock.
    ctx.catalog.set_level(5000, 1, 0);
    ctx.state.sync_engine().synchronize(store.id).await.unwrap();
    assert_eq!(rules.evaluate_stock_state(&store, &product).await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_triggers_schedule_exactly_once() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;
    let mut draft = hide_rule(store.id);
    draft.delay_minutes = 30;
    let rule = rule_repo::create(ctx.pool(), draft).await.unwrap();

    let rules = ctx.state.rule_engine();
    let first = rules.schedule(&rule, &product).await.unwrap();
    assert!(matches!(first, ScheduleResult::Scheduled(_)));

    // Redelivered webhook for the same out-of-stock event.
    let second = rules.schedule(&rule, &product).await.unwrap();
    assert!(matches!(second, ScheduleResult::Deduplicated));

    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].status, ApplicationStatus::Pending);
}

#[tokio::test]
async fn apply_on_applied_item_is_a_noop() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;
    let mut draft = hide_rule(store.id);
    draft.send_notification = true;
    rule_repo::create(ctx.pool(), draft).await.unwrap();

    let rules = ctx.state.rule_engine();
    rules.evaluate_stock_state(&store, &product).await.unwrap();

    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();
    assert_eq!(applications[0].status, ApplicationStatus::Applied);
    let logs_before = inventory::logs_for_product(ctx.pool(), product.id).await.unwrap().len();
    let notifications_before = ctx.dispatcher.count();

    // Redelivery of the same work item from an overlapping poll window.
    let outcome = rules.apply(applications[0].id).await.unwrap();
    assert_eq!(outcome, ApplyOutcome::Skipped);

    // No extra audit row, no extra notification.
    let logs_after = inventory::logs_for_product(ctx.pool(), product.id).await.unwrap().len();
    assert_eq!(logs_after, logs_before);
    assert_eq!(ctx.dispatcher.count(), notifications_before);
}

#[tokio::test]
async fn scenario_b_scheduled_return_restores_on_time() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;
    let mut draft = RuleDraft::new(store.id, "Return in two days", ActionKind::ScheduleReturn);
    draft.restore_after_days = 2;
    rule_repo::create(ctx.pool(), draft).await.unwrap();

    let rules = ctx.state.rule_engine();
    rules.evaluate_stock_state(&store, &product).await.unwrap();

    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();
    let application = &applications[0];
    assert_eq!(application.status, ApplicationStatus::Applied);
    let applied_at = application.applied_at.unwrap();
    let restore_at = application.restore_scheduled_for.unwrap();
    assert_eq!(restore_at, applied_at + 2 * 86_400_000);

    let product_hidden = product_repo::find_by_id(ctx.pool(), product.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!product_hidden.is_visible);
    assert_eq!(product_hidden.scheduled_return, Some(restore_at));

    let poller = SchedulePoller::new(
        ctx.pool().clone(),
        rules.clone(),
        Duration::from_secs(60),
        CancellationToken::new(),
    );

    // One second before the deadline: nothing to do.
    let stats = poller.run_once(restore_at - 1000).await;
    assert_eq!(stats.reversed, 0);

    // One second past the deadline: the restoration runs.
    let stats = poller.run_once(restore_at + 1000).await;
    assert_eq!(stats.reversed, 1);

    let product = product_repo::find_by_id(ctx.pool(), product.id)
        .await
        .unwrap()
        .unwrap();
    assert!(product.is_visible);
    assert_eq!(product.hidden_at, None);
    assert_eq!(product.scheduled_return, None);

    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();
    assert_eq!(applications[0].status, ApplicationStatus::Reversed);
    assert!(applications[0].restored_at.is_some());

    // hide (draft) then restore (active) went to the remote.
    assert_eq!(
        ctx.catalog.product_updates(),
        vec![
            (100, Some("draft".to_string())),
            (100, Some("active".to_string())),
        ]
    );

    // A later tick finds nothing: reversed is terminal.
    let stats = poller.run_once(restore_at + 5000).await;
    assert_eq!(stats.reversed, 0);
    assert_eq!(stats.applied, 0);
}

#[tokio::test]
async fn delayed_application_waits_for_the_poller() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;
    let mut draft = hide_rule(store.id);
    draft.delay_minutes = 10;
    rule_repo::create(ctx.pool(), draft).await.unwrap();

    let rules = ctx.state.rule_engine();
    rules.evaluate_stock_state(&store, &product).await.unwrap();

    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();
    assert_eq!(applications[0].status, ApplicationStatus::Pending);
    let scheduled_for = applications[0].scheduled_for;

    let poller = SchedulePoller::new(
        ctx.pool().clone(),
        rules.clone(),
        Duration::from_secs(60),
        CancellationToken::new(),
    );

    // Before the delay elapses the item is not due.
    let stats = poller.run_once(scheduled_for - 1000).await;
    assert_eq!(stats.applied, 0);

    let stats = poller.run_once(scheduled_for + 1000).await;
    assert_eq!(stats.applied, 1);
}

#[tokio::test]
async fn remote_failure_during_apply_is_terminal_and_all_or_nothing() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;
    rule_repo::create(ctx.pool(), hide_rule(store.id)).await.unwrap();
    ctx.catalog.state.lock().unwrap().fail_update_product = true;

    let rules = ctx.state.rule_engine();
    rules.evaluate_stock_state(&store, &product).await.unwrap();

    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();
    assert_eq!(applications[0].status, ApplicationStatus::Failed);
    assert!(
        applications[0]
            .notes
            .as_deref()
            .unwrap()
            .contains("Remote update failed")
    );

    // Local visibility never moved; no rule audit row was written.
    let product = product_repo::find_by_id(ctx.pool(), product.id)
        .await
        .unwrap()
        .unwrap();
    assert!(product.is_visible);
    let logs = inventory::logs_for_product(ctx.pool(), product.id).await.unwrap();
    assert!(logs.iter().all(|l| l.action != LogAction::Rule));

    // Failed is terminal: the poller does not re-dispatch it.
    let poller = SchedulePoller::new(
        ctx.pool().clone(),
        rules.clone(),
        Duration::from_secs(60),
        CancellationToken::new(),
    );
    ctx.catalog.state.lock().unwrap().fail_update_product = false;
    let stats = poller.run_once(now_millis() + 1000).await;
    assert_eq!(stats.applied, 0);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn unsupported_action_fails_the_application_with_a_note() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;

    // A rule whose stored action has no handler (legacy value).
    let rule_id = shared::util::snowflake_id();
    let now = now_millis();
    sqlx::query(
        r#"
        INSERT INTO rule (id, store_id, name, trigger_type, threshold, action_type, delay_minutes, auto_restore, restore_after_days, send_notification, is_active, priority, created_at, updated_at)
        VALUES (?1, ?2, 'Legacy rule', 'out_of_stock', 0, 'move_to_collection', 0, 0, 0, 0, 1, 0, ?3, ?3)
        "#,
    )
    .bind(rule_id)
    .bind(store.id)
    .bind(now)
    .execute(ctx.pool())
    .await
    .unwrap();

    let rules = ctx.state.rule_engine();
    rules.evaluate_stock_state(&store, &product).await.unwrap();

    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0].status, ApplicationStatus::Failed);
    assert!(
        applications[0]
            .notes
            .as_deref()
            .unwrap()
            .contains("unsupported action type")
    );

    // The worker survived and the product is untouched.
    let product = product_repo::find_by_id(ctx.pool(), product.id)
        .await
        .unwrap()
        .unwrap();
    assert!(product.is_visible);
}

#[tokio::test]
async fn deactivated_rule_leaves_pending_items_unpicked() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;
    let mut draft = hide_rule(store.id);
    draft.delay_minutes = 10;
    let rule = rule_repo::create(ctx.pool(), draft).await.unwrap();

    let rules = ctx.state.rule_engine();
    rules.evaluate_stock_state(&store, &product).await.unwrap();
    rule_repo::set_active(ctx.pool(), rule.id, false).await.unwrap();

    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();

    // The poller does not surface items of deactivated rules.
    let poller = SchedulePoller::new(
        ctx.pool().clone(),
        rules.clone(),
        Duration::from_secs(60),
        CancellationToken::new(),
    );
    let stats = poller.run_once(applications[0].scheduled_for + 1000).await;
    assert_eq!(stats.applied, 0);

    // Direct dispatch observes the same decision.
    let outcome = rules.apply(applications[0].id).await.unwrap();
    assert_eq!(outcome, ApplyOutcome::Skipped);
    let applications = rule_repo::applications_for_product(ctx.pool(), product.id)
        .await
        .unwrap();
    assert_eq!(applications[0].status, ApplicationStatus::Pending);
}

#[tokio::test]
async fn notification_decision_is_recorded_and_dispatch_failure_tolerated() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;
    let mut draft = hide_rule(store.id);
    draft.send_notification = true;
    rule_repo::create(ctx.pool(), draft).await.unwrap();

    let rules = ctx.state.rule_engine();
    rules.evaluate_stock_state(&store, &product).await.unwrap();

    let recorded = ctx.dispatcher.take();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].event_type, "rule_applied");
    assert_eq!(recorded[0].payload["action"], "hide_product");

    use stock_server::db::repository::notification;
    let notifications = notification::find_by_store(ctx.pool(), store.id).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].status,
        shared::models::NotificationStatus::Sent
    );

    // Second product, failing dispatcher: the transition still commits.
    ctx.catalog.set_products(vec![
        remote_product(100, "Blue Shirt", Some("Shirts"), Some("Acme"), vec![remote_variant(1000, 5000, "19.90")]),
        remote_product(101, "Red Shirt", Some("Shirts"), Some("Acme"), vec![remote_variant(1001, 5001, "24.90")]),
    ]);
    ctx.catalog.set_level(5001, 1, 0);
    ctx.state.sync_engine().synchronize(store.id).await.unwrap();
    let red = product_repo::find_by_remote_id(ctx.pool(), store.id, 101)
        .await
        .unwrap()
        .unwrap();

    ctx.dispatcher
        .fail
        .store(true, std::sync::atomic::Ordering::Relaxed);
    rules.evaluate_stock_state(&store, &red).await.unwrap();

    let applications = rule_repo::applications_for_product(ctx.pool(), red.id)
        .await
        .unwrap();
    assert_eq!(applications[0].status, ApplicationStatus::Applied);

    let notifications = notification::find_by_store(ctx.pool(), store.id).await.unwrap();
    assert_eq!(notifications.len(), 2);
    assert!(
        notifications
            .iter()
            .any(|n| n.status == shared::models::NotificationStatus::Failed)
    );
}

#[tokio::test]
async fn back_in_stock_rule_shows_hidden_product() {
    let ctx = setup().await;
    let (store, product) = store_with_product(&ctx, 0).await;
    rule_repo::create(ctx.pool(), hide_rule(store.id)).await.unwrap();

    let mut show = RuleDraft::new(store.id, "Show when restocked", ActionKind::ShowProduct);
    show.trigger_type = TriggerKind::BackInStock;
    rule_repo::create(ctx.pool(), show).await.unwrap();

    // Sold out → hidden.
    let events = ctx.state.event_processor();
    events
        .on_inventory_level_update(&store.shop_domain, 5000, 1, 0)
        .await
        .unwrap();
    let hidden = product_repo::find_by_id(ctx.pool(), product.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!hidden.is_visible);

    // Restocked → the back-in-stock rule shows it again.
    events
        .on_inventory_level_update(&store.shop_domain, 5000, 1, 5)
        .await
        .unwrap();
    let visible = product_repo::find_by_id(ctx.pool(), product.id)
        .await
        .unwrap()
        .unwrap();
    assert!(visible.is_visible);
    assert_eq!(visible.hidden_at, None);
}
