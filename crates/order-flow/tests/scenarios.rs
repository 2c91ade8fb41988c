//! End-to-end order transactions against the fixture storefront.

mod common;

use std::time::Duration;

use action_locator::AddressMatchPolicy;
use cartpilot_core_types::{
    AddedItem, LineItem, OrderError, OrderRequest, OrderStatus, OtpKind, StockDecision,
};
use common::{product_url, request, test_config, Harness, Product, Shop, LOGIN_OTP, PAYMENT_OTP};

fn latte_shop() -> Shop {
    Shop::default()
        .with_product("latte", "Iced Latte", true)
        .with_product("oat-milk", "Oat Milk", false)
        .with_product("bagel", "Sesame Bagel", true)
}

async fn settle(harness: &Harness) {
    tokio::time::timeout(Duration::from_secs(5), harness.engine.wait_until_settled())
        .await
        .expect("order task settles");
}

#[tokio::test]
async fn single_in_stock_item_completes() {
    let harness = Harness::new(latte_shop());
    harness.engine.submit(request(&[("latte", 2)])).unwrap();

    let done = harness.wait_for(OrderStatus::Completed).await;
    assert_eq!(
        done.successfully_added,
        vec![AddedItem {
            name: "Iced Latte".into(),
            quantity: 2
        }]
    );
    assert!(done.out_of_stock_items.is_empty());
    assert_eq!(
        done.last_message.as_deref(),
        Some("Order placed successfully (payment: stored_balance)")
    );

    let shop = harness.shop.lock();
    assert_eq!(shop.placed.len(), 1);
    assert_eq!(shop.placed[0].items, vec![(product_url("latte"), 2)]);
    assert_eq!(shop.placed[0].address.as_deref(), Some("Home"));
    assert_eq!(shop.placed[0].payment, "stored_balance");
    drop(shop);

    assert_eq!(harness.counters.launches(), 1);
    assert_eq!(harness.counters.closes(), 1);

    let path: Vec<OrderStatus> = harness.engine.history().iter().map(|r| r.to).collect();
    assert_eq!(
        path,
        vec![
            OrderStatus::Starting,
            OrderStatus::CheckingLogin,
            OrderStatus::AddingToCart,
            OrderStatus::Checkout,
            OrderStatus::Completed,
        ]
    );
}

#[tokio::test]
async fn out_of_stock_item_suspends_for_a_decision() {
    let harness = Harness::new(latte_shop());
    harness
        .engine
        .submit(request(&[("latte", 1), ("oat-milk", 1)]))
        .unwrap();

    let waiting = harness.wait_for(OrderStatus::WaitingStockDecision).await;
    assert_eq!(waiting.waiting_for, Some("stock_decision"));
    let names: Vec<&str> = waiting
        .out_of_stock_items
        .iter()
        .map(|item| item.name.as_str())
        .collect();
    assert_eq!(names, vec!["Oat Milk"]);
    assert_eq!(waiting.successfully_added.len(), 1);

    harness
        .engine
        .submit_stock_decision(StockDecision::ProceedWithRemaining)
        .unwrap();
    let done = harness.wait_for(OrderStatus::Completed).await;
    assert_eq!(
        done.successfully_added,
        vec![AddedItem {
            name: "Iced Latte".into(),
            quantity: 1
        }]
    );
    assert_eq!(
        harness.shop.lock().placed[0].items,
        vec![(product_url("latte"), 1)]
    );
}

#[tokio::test]
async fn login_otp_timeout_fails_and_releases_the_session() {
    let mut shop = latte_shop();
    shop.logged_in = false;
    let config = order_flow::EngineConfig {
        login_timeout: Duration::from_millis(200),
        ..test_config()
    };
    let harness = Harness::build(shop, config, 0);
    harness.engine.submit(request(&[("latte", 1)])).unwrap();

    let waiting = harness.wait_for(OrderStatus::WaitingLoginOtp).await;
    assert_eq!(waiting.pending_otp, Some(OtpKind::Login));
    assert_eq!(
        waiting.last_message.as_deref(),
        Some("Waiting for login OTP sent to ******3210")
    );

    let failed = harness.wait_for(OrderStatus::Error).await;
    let message = failed.last_message.unwrap_or_default();
    assert!(message.contains("OTP not received in time"), "{message}");
    assert_eq!(harness.counters.closes(), 1);
    assert!(harness.shop.lock().placed.is_empty());
}

#[tokio::test]
async fn stop_during_add_phase_cancels_and_frees_the_engine() {
    let mut shop = latte_shop();
    // no title: the add phase sits in its readiness wait until stopped
    shop.products.insert(
        product_url("mystery"),
        Product {
            title: None,
            in_stock: true,
            broken_add: false,
        },
    );
    let config = order_flow::EngineConfig {
        element_wait: Duration::from_secs(5),
        ..test_config()
    };
    let harness = Harness::build(shop, config, 0);
    harness.engine.submit(request(&[("mystery", 1)])).unwrap();

    harness.wait_for(OrderStatus::AddingToCart).await;
    for _ in 0..200 {
        let message = harness.engine.status().last_message.unwrap_or_default();
        if message.starts_with("Adding item 1/1") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let from = harness.engine.stop().await;
    assert_eq!(from, OrderStatus::AddingToCart);
    let stopped = harness.engine.status();
    assert_eq!(stopped.status, OrderStatus::Cancelled);
    assert_eq!(stopped.last_message.as_deref(), Some("Order cancelled by user"));
    assert_eq!(harness.counters.closes(), 1);

    harness.engine.submit(request(&[("latte", 1)])).unwrap();
    harness.wait_for(OrderStatus::Completed).await;
    settle(&harness).await;

    assert_eq!(harness.counters.launches(), 2);
    assert_eq!(harness.counters.closes(), 2);
    let shop = harness.shop.lock();
    assert_eq!(shop.placed.len(), 1);
    assert_eq!(shop.placed[0].items, vec![(product_url("latte"), 1)]);
}

#[tokio::test]
async fn locked_profile_is_recovered_once() {
    let harness = Harness::build(latte_shop(), test_config(), 1);
    harness.engine.submit(request(&[("latte", 1)])).unwrap();

    harness.wait_for(OrderStatus::Completed).await;
    assert_eq!(harness.counters.launches(), 2);
    let backups = std::fs::read_dir(harness.profile.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with("profile_backup_")
        })
        .count();
    assert_eq!(backups, 1);
}

#[tokio::test]
async fn repeated_lock_failure_ends_in_error() {
    let harness = Harness::build(latte_shop(), test_config(), 2);
    harness.engine.submit(request(&[("latte", 1)])).unwrap();

    let failed = harness.wait_for(OrderStatus::Error).await;
    let message = failed.last_message.unwrap_or_default();
    assert!(message.contains("interactive login bootstrap"), "{message}");
    assert_eq!(harness.counters.launches(), 2);
}

#[tokio::test]
async fn second_submission_is_rejected_while_in_flight() {
    let harness = Harness::new(latte_shop());
    harness.engine.submit(request(&[("oat-milk", 1)])).unwrap();
    harness.wait_for(OrderStatus::WaitingStockDecision).await;

    let err = harness.engine.submit(request(&[("latte", 1)])).unwrap_err();
    assert_eq!(err, OrderError::Concurrency(OrderStatus::WaitingStockDecision));
    assert_eq!(
        err.to_string(),
        "Order already in progress. Status: waiting_stock_decision"
    );
    assert_eq!(harness.counters.launches(), 1);

    harness.engine.stop().await;
    settle(&harness).await;
}

#[tokio::test]
async fn checkpoint_inputs_outside_their_state_are_rejected() {
    let harness = Harness::new(latte_shop());
    assert!(matches!(
        harness.engine.submit_otp(OtpKind::Login, "1234"),
        Err(OrderError::NotWaiting { .. })
    ));
    assert!(matches!(
        harness
            .engine
            .submit_stock_decision(StockDecision::Cancel),
        Err(OrderError::NotWaiting { .. })
    ));

    harness.engine.submit(request(&[("oat-milk", 1)])).unwrap();
    harness.wait_for(OrderStatus::WaitingStockDecision).await;
    assert!(matches!(
        harness.engine.submit_otp(OtpKind::Payment, "123456"),
        Err(OrderError::NotWaiting { .. })
    ));
    assert_eq!(harness.engine.status().status, OrderStatus::WaitingStockDecision);

    harness.engine.stop().await;
    settle(&harness).await;
}

#[tokio::test]
async fn login_otp_round_trip() {
    let mut shop = latte_shop();
    shop.logged_in = false;
    let harness = Harness::new(shop);
    harness.engine.submit(request(&[("latte", 1)])).unwrap();

    harness.wait_for(OrderStatus::WaitingLoginOtp).await;
    assert!(matches!(
        harness.engine.submit_otp(OtpKind::Login, "12ab"),
        Err(OrderError::Input(_))
    ));
    harness.engine.submit_otp(OtpKind::Login, LOGIN_OTP).unwrap();

    harness.wait_for(OrderStatus::Completed).await;
    let shop = harness.shop.lock();
    assert!(shop.logged_in);
    assert_eq!(shop.phone.as_deref(), Some("9876543210"));
    assert_eq!(shop.placed.len(), 1);
}

#[tokio::test]
async fn pay_on_delivery_with_payment_otp() {
    let mut shop = latte_shop();
    shop.stored_balance = false;
    shop.payment_otp_required = true;
    let harness = Harness::new(shop);
    harness.engine.submit(request(&[("latte", 1)])).unwrap();

    let waiting = harness.wait_for(OrderStatus::WaitingPaymentOtp).await;
    assert_eq!(waiting.pending_otp, Some(OtpKind::Payment));
    assert!(matches!(
        harness.engine.submit_otp(OtpKind::Login, PAYMENT_OTP),
        Err(OrderError::NotWaiting { .. })
    ));
    harness.engine.submit_otp(OtpKind::Payment, PAYMENT_OTP).unwrap();

    let done = harness.wait_for(OrderStatus::Completed).await;
    assert_eq!(
        done.last_message.as_deref(),
        Some("Order placed successfully (payment: pay_on_delivery)")
    );
    assert_eq!(harness.shop.lock().placed[0].payment, "pay_on_delivery");
}

#[tokio::test]
async fn pay_on_delivery_without_challenge() {
    let mut shop = latte_shop();
    shop.stored_balance = false;
    let harness = Harness::new(shop);
    harness.engine.submit(request(&[("latte", 1)])).unwrap();

    harness.wait_for(OrderStatus::Completed).await;
    let statuses: Vec<OrderStatus> = harness.engine.history().iter().map(|r| r.to).collect();
    assert!(!statuses.contains(&OrderStatus::WaitingPaymentOtp));
    assert_eq!(harness.shop.lock().placed[0].payment, "pay_on_delivery");
}

#[tokio::test]
async fn replacement_items_are_added_before_checkout() {
    let harness = Harness::new(latte_shop());
    harness
        .engine
        .submit(request(&[("latte", 1), ("oat-milk", 2)]))
        .unwrap();
    harness.wait_for(OrderStatus::WaitingStockDecision).await;

    harness
        .engine
        .submit_stock_decision(StockDecision::ReplaceItems(vec![LineItem::new(
            product_url("bagel"),
            2,
        )]))
        .unwrap();

    let done = harness.wait_for(OrderStatus::Completed).await;
    assert!(done.out_of_stock_items.is_empty());
    let added: Vec<(&str, u32)> = done
        .successfully_added
        .iter()
        .map(|item| (item.name.as_str(), item.quantity))
        .collect();
    assert_eq!(added, vec![("Iced Latte", 1), ("Sesame Bagel", 2)]);
    assert_eq!(
        harness.shop.lock().placed[0].items,
        vec![(product_url("latte"), 1), (product_url("bagel"), 2)]
    );
}

#[tokio::test]
async fn replacing_with_an_item_already_in_the_cart_raises_its_quantity() {
    let harness = Harness::new(latte_shop());
    harness
        .engine
        .submit(request(&[("latte", 1), ("oat-milk", 1)]))
        .unwrap();
    harness.wait_for(OrderStatus::WaitingStockDecision).await;

    harness
        .engine
        .submit_stock_decision(StockDecision::ReplaceItems(vec![LineItem::new(
            product_url("latte"),
            1,
        )]))
        .unwrap();

    let done = harness.wait_for(OrderStatus::Completed).await;
    assert!(done.out_of_stock_items.is_empty());
    assert_eq!(
        done.successfully_added,
        vec![AddedItem {
            name: "Iced Latte".into(),
            quantity: 2
        }]
    );
    assert_eq!(
        harness.shop.lock().placed[0].items,
        vec![(product_url("latte"), 2)]
    );
    let decisions = harness
        .engine
        .history()
        .iter()
        .filter(|record| record.to == OrderStatus::WaitingStockDecision)
        .count();
    assert_eq!(decisions, 1);
}

#[tokio::test]
async fn detached_stepper_clicks_are_retried() {
    let mut shop = latte_shop();
    shop.detached_increase_clicks = 2;
    let harness = Harness::new(shop);
    harness.engine.submit(request(&[("latte", 3)])).unwrap();

    let done = harness.wait_for(OrderStatus::Completed).await;
    assert_eq!(
        done.successfully_added,
        vec![AddedItem {
            name: "Iced Latte".into(),
            quantity: 3
        }]
    );
    let shop = harness.shop.lock();
    assert_eq!(shop.detached_increase_clicks, 0);
    assert_eq!(shop.placed[0].items, vec![(product_url("latte"), 3)]);
}

#[tokio::test]
async fn declining_out_of_stock_items_cancels() {
    let harness = Harness::new(latte_shop());
    harness
        .engine
        .submit(request(&[("latte", 1), ("oat-milk", 1)]))
        .unwrap();
    harness.wait_for(OrderStatus::WaitingStockDecision).await;
    harness
        .engine
        .submit_stock_decision(StockDecision::Cancel)
        .unwrap();

    let cancelled = harness.wait_for(OrderStatus::Cancelled).await;
    assert_eq!(
        cancelled.last_message.as_deref(),
        Some("Order cancelled: out-of-stock items declined")
    );
    settle(&harness).await;
    assert!(harness.shop.lock().placed.is_empty());
    assert_eq!(harness.counters.closes(), 1);
}

#[tokio::test]
async fn proceeding_with_nothing_in_stock_cancels() {
    let harness = Harness::new(latte_shop());
    harness.engine.submit(request(&[("oat-milk", 1)])).unwrap();
    harness.wait_for(OrderStatus::WaitingStockDecision).await;
    harness
        .engine
        .submit_stock_decision(StockDecision::ProceedWithRemaining)
        .unwrap();

    let cancelled = harness.wait_for(OrderStatus::Cancelled).await;
    assert_eq!(
        cancelled.last_message.as_deref(),
        Some("Order cancelled: no in-stock items to order")
    );
    assert!(harness.shop.lock().placed.is_empty());
}

#[tokio::test]
async fn leftover_cart_is_cleared_first() {
    let mut shop = latte_shop();
    shop.cart = vec![(product_url("bagel"), 3)];
    let harness = Harness::new(shop);
    harness.engine.submit(request(&[("latte", 1)])).unwrap();

    harness.wait_for(OrderStatus::Completed).await;
    assert_eq!(
        harness.shop.lock().placed[0].items,
        vec![(product_url("latte"), 1)]
    );
}

#[tokio::test]
async fn unknown_address_fails_checkout() {
    let harness = Harness::new(latte_shop());
    let order = OrderRequest::new(
        vec![LineItem::new(product_url("latte"), 1)],
        "9876543210",
        "Cottage",
    )
    .unwrap();
    harness.engine.submit(order).unwrap();

    let failed = harness.wait_for(OrderStatus::Error).await;
    let message = failed.last_message.unwrap_or_default();
    assert!(
        message.contains("Delivery address 'Cottage' not found"),
        "{message}"
    );
    assert!(harness.shop.lock().placed.is_empty());
}

#[tokio::test]
async fn address_label_substring_follows_policy() {
    let order = || {
        OrderRequest::new(
            vec![LineItem::new(product_url("latte"), 1)],
            "9876543210",
            "New Cafe",
        )
        .unwrap()
    };

    let lenient = Harness::new(latte_shop());
    lenient.engine.submit(order()).unwrap();
    lenient.wait_for(OrderStatus::Completed).await;
    assert_eq!(
        lenient.shop.lock().placed[0].address.as_deref(),
        Some("Office New Cafe")
    );

    let strict_config = order_flow::EngineConfig {
        address_policy: AddressMatchPolicy::ExactOnly,
        ..test_config()
    };
    let strict = Harness::build(latte_shop(), strict_config, 0);
    strict.engine.submit(order()).unwrap();
    strict.wait_for(OrderStatus::Error).await;
    assert!(strict.shop.lock().placed.is_empty());
}

#[tokio::test]
async fn failed_add_is_reported_as_out_of_stock() {
    let mut shop = latte_shop();
    shop.products.insert(
        product_url("flaky"),
        Product {
            title: Some("Flaky Croissant".into()),
            in_stock: true,
            broken_add: true,
        },
    );
    let harness = Harness::new(shop);
    harness.engine.submit(request(&[("flaky", 1)])).unwrap();

    let waiting = harness.wait_for(OrderStatus::WaitingStockDecision).await;
    assert_eq!(waiting.out_of_stock_items.len(), 1);
    assert_eq!(waiting.out_of_stock_items[0].name, "Flaky Croissant");
    assert!(waiting.successfully_added.is_empty());

    harness.engine.stop().await;
    settle(&harness).await;
}
