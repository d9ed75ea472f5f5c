use tracing::{error, info, Instrument};

use merch_orders::clients::Profile;
use merch_orders::{
    setup_tracing, Cart, CatalogItem, LineStatus, OrderSystem, PaymentMethod, Selection, SystemConfig,
};

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = SystemConfig::from_env().map_err(|e| e.to_string())?;
    setup_tracing(&config.log_filter);

    info!("Starting storefront demo");

    let system = OrderSystem::new(config);

    // Seed profiles and catalog the way a host application would
    system
        .profile_client
        .seed_profile(
            "officer",
            &Profile {
                role: Some("admin".into()),
                email: Some("officer@org.school.edu".into()),
            },
        )
        .await
        .map_err(|e| e.to_string())?;
    system
        .profile_client
        .seed_profile(
            "student_1",
            &Profile {
                role: None,
                email: Some("student1@school.edu".into()),
            },
        )
        .await
        .map_err(|e| e.to_string())?;

    let admin = system
        .admin_console(system.login("officer").await.map_err(|e| e.to_string())?)
        .map_err(|e| e.to_string())?;
    let hoodie = admin
        .upsert_product(
            CatalogItem::new("hoodie", "Org Hoodie", 850.0, 5)
                .with_sizes(["S", "M", "L"])
                .with_category("Apparel"),
        )
        .await
        .map_err(|e| e.to_string())?;
    let lanyard = admin
        .upsert_product(CatalogItem::new("lanyard", "Lanyard", 120.0, 40).with_colors(["Blue", "Gold"]))
        .await
        .map_err(|e| e.to_string())?;

    let mut all_orders = admin.watch_all_orders().await.map_err(|e| e.to_string())?;

    // Customer checks out a cart
    let student = system.storefront(system.login("student_1").await.map_err(|e| e.to_string())?);
    let mut cart = Cart::new();
    cart.add(&hoodie, 2, Some("M"), None);
    cart.add(&lanyard, 1, None, Some("Gold"));

    let span = tracing::info_span!("checkout");
    let order_id = async {
        info!(total = cart.total(), "Checking out cart");
        student.checkout(&mut cart, PaymentMethod::Card).await
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;
    info!(order_id = %order_id, "Order placed");

    if let Some(orders) = all_orders.wait_for(|orders| !orders.is_empty()).await {
        info!(orders = orders.len(), "Admin feed updated");
    }

    // Admin completes one line; the customer tries to cancel it afterwards
    let span = tracing::info_span!("fulfilment");
    async {
        if let Err(e) = admin
            .set_line_status("student_1", &order_id, "hoodie", LineStatus::Completed)
            .await
        {
            error!(error = %e, "Could not complete line");
        }
        match student.cancel_line(&order_id, "hoodie").await {
            Ok(_) => info!("Line cancelled"),
            Err(e) => info!(reason = %e, "Cancellation refused"),
        }
        if let Err(e) = student
            .buy_now(Selection::new("lanyard", 3).with_color("Blue"), PaymentMethod::Wallet)
            .await
        {
            error!(error = %e, "Buy now failed");
        }
    }
    .instrument(span)
    .await;

    match admin.dashboard().await {
        Ok(dashboard) => info!(
            pending = dashboard.counts.pending,
            completed = dashboard.counts.completed,
            cancelled = dashboard.counts.cancelled,
            "Dashboard"
        ),
        Err(e) => error!(error = %e, "Dashboard failed"),
    }

    all_orders.cancel().await;

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
