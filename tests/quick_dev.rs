// Smoke test against a running server.
// Run with: cargo test --test quick_dev -- --ignored --nocapture

use anyhow::Result;
use serde_json::json;

#[tokio::test]
#[ignore]
async fn quick_dev() -> Result<()> {
    let hc = httpc_test::new_client("http://localhost:3000")?;

    hc.do_get("/health").await?.print().await?;

    hc.do_post(
        "/api/events",
        json!({
            "name": "grill u Janka",
            "description": "witam",
            "price": 25.0,
            "start_date": "2025-07-05T16:00:00Z",
            "end_date": "2025-07-05T23:00:00Z",
            "organizer_id": "8f14e45f-ceea-4d6a-9c2f-1a2b3c4d5e6f"
        }),
    )
    .await?
    .print()
    .await?;

    hc.do_get("/api/events?sort=start_date&order=desc&size=5")
        .await?
        .print()
        .await?;

    Ok(())
}
