// sole-client/examples/admin_flow.rs
// Sign in, publish a product, watch it arrive on the live feed, clean up.
// Run the mock cloud first: cargo run -p sole-cloud-mock

use std::time::Duration;

use sole_client::{ImageFile, ProductDraft, StoreClient, StoreConfig};

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        println!("Usage: {} <base_url> <email> <password>", args[0]);
        println!(
            "  Example: {} http://127.0.0.1:9077 admin@sole.test shoe-store-admin",
            args[0]
        );
        return Ok(());
    }

    let base_url = args[1].trim_end_matches('/');
    let email = &args[2];
    let password = &args[3];

    let api_key = std::env::var("SOLE_AUTH_API_KEY").unwrap_or_else(|_| "mock-api-key".to_string());
    let preset =
        std::env::var("SOLE_UPLOAD_PRESET").unwrap_or_else(|_| "sole-unsigned".to_string());

    let config = StoreConfig::new(base_url)
        .with_auth(
            format!("{base_url}/v1/accounts:signInWithPassword"),
            api_key,
        )
        .with_upload(format!("{base_url}/upload"), preset)
        .with_timeout(10);

    let client = StoreClient::new(config);

    let session = client.sign_in(email, password).await?;
    tracing::info!("Signed in as {} (uid {})", session.email, session.local_id);

    let mut feed = client.catalog().await;
    while feed.state().loading {
        if !feed.changed().await {
            break;
        }
    }
    tracing::info!("Catalog loaded: {} products", feed.products().len());

    // Publish a demo sneaker with a minimal PNG payload
    let mut image = PNG_MAGIC.to_vec();
    image.extend_from_slice(b"admin-flow-demo");
    let draft = ProductDraft {
        name: "Velocity Runner".to_string(),
        brand: "Sole".to_string(),
        category: "athletic".to_string(),
        description: "Lightweight demo sneaker".to_string(),
        original_price: "129.99".to_string(),
        discount_price: "99.99".to_string(),
        stock: "24".to_string(),
        rating: 4.6,
        is_on_sale: true,
        is_new: true,
        image: Some(ImageFile::new("velocity.png", image)),
        ..Default::default()
    };

    let mutator = client.mutator();
    let id = mutator.submit_create(&draft).await?;
    tracing::info!("Created product {id}");

    // The feed picks the new record up from the live stream
    let arrival = tokio::time::timeout(Duration::from_secs(10), async {
        while !feed
            .products()
            .iter()
            .any(|p| p.id.as_deref() == Some(id.as_str()))
        {
            if !feed.changed().await {
                break;
            }
        }
    })
    .await;
    if arrival.is_err() {
        tracing::warn!("Timed out waiting for the product to reach the feed");
    }

    let stats = feed.stats();
    tracing::info!(
        "Catalog now: {} total, {} on sale, {} low stock, {} new arrivals",
        stats.total,
        stats.on_sale,
        stats.low_stock,
        stats.new_arrivals
    );
    for product in feed.search("velocity") {
        tracing::info!(
            "  match: {} [{}] at {}",
            product.name,
            product.category,
            product.effective_price()
        );
    }

    mutator.submit_delete(&id).await?;
    tracing::info!("Demo product removed");

    client.sign_out();
    Ok(())
}
