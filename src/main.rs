use order_desk::auth::{require_admin, Principal};
use order_desk::config::Config;
use order_desk::lifecycle::{setup_tracing, OrderDesk};
use order_desk::model::{OrderStatus, ProductCreate, Role, UserRegistration};
use rust_decimal::Decimal;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    setup_tracing();

    let config = Config::from_env()?;
    info!(environment = %config.environment, "Starting order desk demo");
    let desk = OrderDesk::start(config)?;

    let alice = desk
        .users()
        .register(UserRegistration {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "wonderland".to_string(),
        })
        .instrument(tracing::info_span!("registration"))
        .await?;
    let token = desk.users().login("alice@example.com", "wonderland").await?;
    let principal = desk.users().authenticate(&token.access_token).await?;

    let kettle = desk
        .products()
        .create_product(ProductCreate {
            name: "Kettle".to_string(),
            description: Some("1.7 l, stainless steel".to_string()),
            price: Decimal::new(3999, 2),
            stock: 3,
        })
        .await?;

    // Five buyers race for three kettles.
    let mut tasks = Vec::new();
    for buyer in 0..5 {
        let mut orders = desk.orders();
        let (user_id, product_id) = (principal.id, kettle.id);
        tasks.push(tokio::spawn(
            async move { orders.create_order(user_id, product_id, 1).await }
                .instrument(tracing::info_span!("buyer", buyer)),
        ));
    }
    let mut placed = Vec::new();
    for task in tasks {
        match task.await? {
            Ok(order) => placed.push(order),
            Err(e) => error!(error = %e, "Order rejected"),
        }
    }
    info!(placed = placed.len(), "Race finished");

    if let Some(first) = placed.first() {
        let cancelled = desk.orders().cancel_order(first.id, &principal).await?;
        info!(order_id = %cancelled.id, status = %cancelled.status(), "Cancelled by owner");
    }
    if let Err(e) = require_admin(&principal) {
        info!(error = %e, "Customers cannot ship orders");
    }
    if let Some(second) = placed.get(1) {
        // Stands in for an operator account; there is no admin bootstrap.
        let admin = Principal {
            id: alice.id,
            role: Role::Admin,
        };
        require_admin(&admin)?;
        let mut orders = desk.orders();
        for status in [OrderStatus::Shipped, OrderStatus::Delivered] {
            let order = orders.update_status(second.id, status).await?;
            info!(order_id = %order.id, status = %order.status(), by = %admin.id, "Status updated");
        }
    }

    let stock = desk.products().get_product(kettle.id).await?.stock;
    info!(product_id = %kettle.id, stock, "Final stock");

    desk.shutdown().await?;
    info!("Demo completed successfully");
    Ok(())
}
