mod common;

use common::*;
use order_desk::model::OrderStatus;
use order_desk::orders::OrderError;
use tokio::task::JoinSet;

/// Two buyers race for the last unit: exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_is_sold_once() {
    let desk = start_desk();
    let (alice, _) = register(&desk, "Alice").await;
    let (bob, _) = register(&desk, "Bob").await;
    let product = add_product(&desk, 1).await;

    let mut a = desk.orders();
    let mut b = desk.orders();
    let (ra, rb) = tokio::join!(
        a.create_order(alice.id, product.id, 1),
        b.create_order(bob.id, product.id, 1),
    );
    drop((a, b));

    let outcomes = [ra, rb];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(
        loser,
        OrderError::InsufficientStock { requested: 1, available: 0, .. }
    ));
    assert_eq!(stock_of(&desk, product.id).await, 0);
    assert_eq!(order_count(&desk).await, 1);

    desk.shutdown().await.unwrap();
}

/// Two buyers with enough stock for both both succeed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_both_buyers_served_when_stock_allows() {
    let desk = start_desk();
    let (alice, _) = register(&desk, "Alice").await;
    let (bob, _) = register(&desk, "Bob").await;
    let product = add_product(&desk, 2).await;

    let mut a = desk.orders();
    let mut b = desk.orders();
    let (ra, rb) = tokio::join!(
        a.create_order(alice.id, product.id, 1),
        b.create_order(bob.id, product.id, 1),
    );
    drop((a, b));

    assert!(ra.is_ok());
    assert!(rb.is_ok());
    assert_eq!(stock_of(&desk, product.id).await, 0);

    desk.shutdown().await.unwrap();
}

/// Many buyers, mixed quantities: the sum of accepted orders never exceeds the stock.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_no_overselling_under_load() {
    let desk = start_desk();
    let (alice, _) = register(&desk, "Alice").await;
    let product = add_product(&desk, 25).await;

    let mut buyers = JoinSet::new();
    for i in 0..40u32 {
        let mut orders = desk.orders();
        let quantity = i % 3 + 1;
        let (user_id, product_id) = (alice.id, product.id);
        buyers.spawn(async move {
            (
                quantity,
                orders.create_order(user_id, product_id, quantity).await,
            )
        });
    }

    let mut sold = 0;
    while let Some(joined) = buyers.join_next().await {
        match joined.unwrap() {
            (quantity, Ok(order)) => {
                assert_eq!(order.quantity(), quantity);
                sold += quantity;
            }
            (quantity, Err(OrderError::InsufficientStock { requested, .. })) => {
                assert_eq!(requested, quantity);
            }
            (_, Err(e)) => panic!("unexpected error: {e}"),
        }
    }

    assert!(sold <= 25);
    assert_eq!(stock_of(&desk, product.id).await, 25 - sold);

    let placed = desk.orders().get_all_orders().await.unwrap();
    let placed_total: u32 = placed.iter().map(|o| o.quantity()).sum();
    assert_eq!(placed_total, sold);

    desk.shutdown().await.unwrap();
}

/// Cancels running alongside new orders on the same product keep the books balanced.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_cancels_race_with_creates() {
    let desk = start_desk();
    let (alice, as_alice) = register(&desk, "Alice").await;
    let product = add_product(&desk, 20).await;

    let mut existing = Vec::new();
    for _ in 0..10 {
        existing.push(
            desk.orders()
                .create_order(alice.id, product.id, 1)
                .await
                .unwrap(),
        );
    }
    assert_eq!(stock_of(&desk, product.id).await, 10);

    let mut tasks = JoinSet::new();
    for order in existing {
        let mut orders = desk.orders();
        let principal = as_alice;
        tasks.spawn(async move { orders.cancel_order(order.id, &principal).await.map(|_| ()) });
    }
    for _ in 0..10 {
        let mut orders = desk.orders();
        let (user_id, product_id) = (alice.id, product.id);
        tasks.spawn(async move {
            orders
                .create_order(user_id, product_id, 1)
                .await
                .map(|_| ())
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().expect("no lock timeouts or stock errors");
    }

    let all = desk.orders().get_all_orders().await.unwrap();
    let pending = all
        .iter()
        .filter(|o| o.status() == OrderStatus::Pending)
        .count() as u32;
    assert_eq!(all.len(), 20);
    assert_eq!(pending, 10);
    assert_eq!(stock_of(&desk, product.id).await, 20 - pending);

    desk.shutdown().await.unwrap();
}

/// Racing cancels of one order restore its stock once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_cancel_race() {
    let desk = start_desk();
    let (alice, as_alice) = register(&desk, "Alice").await;
    let product = add_product(&desk, 10).await;
    let order = desk
        .orders()
        .create_order(alice.id, product.id, 2)
        .await
        .unwrap();

    let mut a = desk.orders();
    let mut b = desk.orders();
    let (ra, rb) = tokio::join!(
        a.cancel_order(order.id, &as_alice),
        b.cancel_order(order.id, &as_alice),
    );
    drop((a, b));

    let outcomes = [ra, rb];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| r.as_ref().err() == Some(&OrderError::OrderAlreadyCancelled(order.id))));
    assert_eq!(stock_of(&desk, product.id).await, 10);

    desk.shutdown().await.unwrap();
}
