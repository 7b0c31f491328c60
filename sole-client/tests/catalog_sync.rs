// sole-client/tests/catalog_sync.rs
// Live catalog subscription against the in-memory mock cloud

use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use sole_client::{
    CatalogFeed, CatalogState, Category, ImageFile, MutationOutcome, ProductDraft, StoreClient,
    StoreConfig,
};
use sole_cloud_mock::MockCloud;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const ADMIN_EMAIL: &str = "admin@sole.test";
const ADMIN_PASSWORD: &str = "shoe-store-admin";

fn png_bytes(tag: &str) -> Vec<u8> {
    let mut bytes = PNG_MAGIC.to_vec();
    bytes.extend_from_slice(tag.as_bytes());
    bytes
}

fn store_config(mock: &MockCloud) -> StoreConfig {
    StoreConfig::new(mock.database_url())
        .with_auth(mock.auth_url(), mock.api_key())
        .with_upload(mock.upload_url(), mock.upload_preset())
        .with_timeout(5)
}

fn draft(name: &str, category: &str, price: &str, stock: &str, tag: &str) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        category: category.to_string(),
        original_price: price.to_string(),
        stock: stock.to_string(),
        image: Some(ImageFile::new(format!("{tag}.png"), png_bytes(tag))),
        ..Default::default()
    }
}

async fn wait_for<F>(feed: &mut CatalogFeed, pred: F) -> CatalogState
where
    F: Fn(&CatalogState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = feed.state();
            if pred(&state) {
                return state;
            }
            if !feed.changed().await {
                panic!("catalog feed closed while waiting");
            }
        }
    })
    .await
    .expect("timed out waiting for catalog state")
}

#[tokio::test]
async fn test_empty_catalog_settles_without_products() {
    let mock = MockCloud::spawn().await.unwrap();
    let client = StoreClient::new(store_config(&mock));

    let mut feed = client.catalog().await;
    let state = wait_for(&mut feed, |s| !s.loading).await;
    assert!(state.products.is_empty());
}

#[tokio::test]
async fn test_created_product_appears_in_snapshot() {
    let mock = MockCloud::spawn().await.unwrap();
    let client = StoreClient::new(store_config(&mock));
    client.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let mut feed = client.catalog().await;
    let mutator = client.mutator();
    let id = mutator
        .submit_create(&draft("Trail Runner", "athletic", "99.5", "12", "trail-runner"))
        .await
        .unwrap();

    let done = mutator.state();
    assert_eq!(
        done.last_outcome(),
        Some(&MutationOutcome::Created(id.clone()))
    );

    let state = wait_for(&mut feed, |s| {
        s.products.iter().any(|p| p.id.as_deref() == Some(id.as_str()))
    })
    .await;
    let product = state
        .products
        .iter()
        .find(|p| p.id.as_deref() == Some(id.as_str()))
        .unwrap();
    assert_eq!(product.name, "Trail Runner");
    assert_eq!(product.category, Category::Athletic);
    assert_eq!(product.original_price, "99.5".parse::<Decimal>().unwrap());
    assert_eq!(product.stock, 12);
    assert!(product.image_url.starts_with(&format!("{}/files/", mock.database_url())));
    assert!(product.image_url.ends_with(".png"));

    // One upload, one append; never a second write
    let counters = mock.counters();
    assert_eq!(counters.uploads, 1);
    assert_eq!(counters.appends, 1);
    assert_eq!(counters.patches, 0);
    assert_eq!(counters.deletes, 0);

    // The stored record matches the wire contract
    let record: serde_json::Value =
        reqwest::get(format!("{}/products/{}.json", mock.database_url(), id))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    assert_eq!(record["imageUrl"].as_str(), Some(product.image_url.as_str()));
    assert_eq!(record["originalPrice"], json!(99.5));
    assert!(record.get("discountPrice").is_none(), "null children are never stored");
    assert_eq!(record["createdAt"], record["updatedAt"]);

    // The hosted image serves back the uploaded bytes
    let served = reqwest::get(&product.image_url).await.unwrap();
    assert_eq!(served.status(), 200);
    assert_eq!(served.bytes().await.unwrap().as_ref(), png_bytes("trail-runner"));
}

#[tokio::test]
async fn test_update_and_delete_flow_to_subscribers() {
    let mock = MockCloud::spawn().await.unwrap();
    let client = StoreClient::new(store_config(&mock));
    client.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let mut feed = client.catalog().await;
    let mutator = client.mutator();
    let id = mutator
        .submit_create(&draft("Trail Runner", "athletic", "99.5", "2", "trail-runner"))
        .await
        .unwrap();
    let state = wait_for(&mut feed, |s| !s.products.is_empty()).await;
    let product = state.products[0].clone();

    let record_url = format!("{}/products/{}.json", mock.database_url(), id);
    let before: serde_json::Value = reqwest::get(&record_url).await.unwrap().json().await.unwrap();
    let created_at = before["createdAt"].clone();

    // Edit through a pre-filled form draft: restock and put on sale
    let mut edit = ProductDraft::from_product(&product);
    edit.stock = "9".to_string();
    edit.discount_price = "59.99".to_string();
    edit.is_on_sale = true;
    mutator.submit_update(&id, &edit).await.unwrap();
    assert_eq!(mutator.state().last_outcome(), Some(&MutationOutcome::Updated));

    let state = wait_for(&mut feed, |s| s.products.first().is_some_and(|p| p.stock == 9)).await;
    let updated = &state.products[0];
    assert_eq!(updated.name, "Trail Runner");
    assert_eq!(updated.discount_price, Some("59.99".parse().unwrap()));
    assert!(updated.is_on_sale);
    assert_eq!(updated.image_url, product.image_url, "kept image is untouched");

    // Keeping the stored image uploads nothing new
    let counters = mock.counters();
    assert_eq!(counters.uploads, 1);
    assert_eq!(counters.patches, 1);

    // The update never touches the creation timestamp
    let after: serde_json::Value = reqwest::get(&record_url).await.unwrap().json().await.unwrap();
    assert_eq!(after["createdAt"], created_at);

    mutator.submit_delete(&id).await.unwrap();
    assert_eq!(mutator.state().last_outcome(), Some(&MutationOutcome::Deleted));
    let state = wait_for(&mut feed, |s| s.products.is_empty()).await;
    assert!(!state.loading);
    assert_eq!(mock.counters().deletes, 1);
}

#[tokio::test]
async fn test_deleting_records_leaves_hosted_images() {
    let mock = MockCloud::spawn().await.unwrap();
    let client = StoreClient::new(store_config(&mock));
    client.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let mut feed = client.catalog().await;
    let mutator = client.mutator();
    let id = mutator
        .submit_create(&draft("Trail Runner", "athletic", "99.5", "4", "trail-runner"))
        .await
        .unwrap();
    let state = wait_for(&mut feed, |s| !s.products.is_empty()).await;
    let image_url = state.products[0].image_url.clone();

    // A record seeded under a fixed key, pointing at the same hosted image
    let seeded = json!({
        "abc123": {
            "name": "Legacy Court",
            "category": "casual",
            "originalPrice": 59.0,
            "imageUrl": image_url.clone(),
        }
    });
    reqwest::Client::new()
        .patch(format!("{}/products.json", mock.database_url()))
        .json(&seeded)
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap();
    wait_for(&mut feed, |s| s.products.len() == 2).await;

    mutator.submit_delete("abc123").await.unwrap();
    let state = wait_for(&mut feed, |s| s.products.len() == 1).await;
    assert_eq!(state.products[0].id.as_deref(), Some(id.as_str()));

    mutator.submit_delete(&id).await.unwrap();
    wait_for(&mut feed, |s| s.products.is_empty()).await;
    assert_eq!(mock.counters().deletes, 2);

    // Deleting records never reaps hosted images
    let served = reqwest::get(&image_url).await.unwrap();
    assert_eq!(served.status(), 200);
    assert_eq!(served.bytes().await.unwrap().as_ref(), png_bytes("trail-runner"));
}

#[tokio::test]
async fn test_unreachable_database_degrades_to_empty() {
    // Nothing listens here; the subscription fails at connect
    let config = StoreConfig::new("http://127.0.0.1:1").with_timeout(2);
    let client = StoreClient::new(config);

    let mut feed = client.catalog().await;
    let state = wait_for(&mut feed, |s| !s.loading).await;
    assert!(state.products.is_empty());
    assert!(feed.search("trail").is_empty());
    assert_eq!(feed.stats().total, 0);
}

#[tokio::test]
async fn test_search_and_stats_follow_live_list() {
    let mock = MockCloud::spawn().await.unwrap();
    let client = StoreClient::new(store_config(&mock));
    client.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    let mut feed = client.catalog().await;
    let mutator = client.mutator();

    let mut on_sale = draft("Trail Runner Pro", "athletic", "99.99", "5", "pro");
    on_sale.discount_price = "79.99".to_string();
    on_sale.is_on_sale = true;
    mutator.submit_create(&on_sale).await.unwrap();

    let mut arrival = draft("Court Classic", "casual", "74.99", "2", "court");
    arrival.is_new = true;
    mutator.submit_create(&arrival).await.unwrap();

    wait_for(&mut feed, |s| s.products.len() == 2).await;

    let stats = feed.stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.on_sale, 1);
    assert_eq!(stats.new_arrivals, 1);
    assert_eq!(stats.low_stock, 1);

    assert_eq!(feed.search("trail").len(), 1);
    assert_eq!(feed.search("casual").len(), 1);
    assert_eq!(feed.search("").len(), 2);
    assert!(feed.search("sandal").is_empty());
}
