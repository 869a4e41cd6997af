use goose::prelude::*;
use std::env;

async fn health_check(user: &mut GooseUser) -> TransactionResult {
    let _goose_metrics = user.get("/healthz").await?;
    Ok(())
}

async fn browse_lists(user: &mut GooseUser) -> TransactionResult {
    let _goose_metrics = user.get("/api/lists").await?;
    Ok(())
}

async fn list_counts(user: &mut GooseUser) -> TransactionResult {
    let Ok(list_id) = env::var("LIST_ID") else {
        return Ok(());
    };
    let _goose_metrics = user
        .get(&format!("/api/lists/{list_id}/leads/count/valid_emails"))
        .await?;
    let _goose_metrics = user
        .get(&format!("/api/lists/{list_id}/queue"))
        .await?;
    Ok(())
}

async fn queue_status(user: &mut GooseUser) -> TransactionResult {
    let _goose_metrics = user.get("/api/queue/count").await?;
    let _goose_metrics = user.get("/api/count_all?email_is_valid=yes").await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    match env::var("LIST_ID") {
        Ok(list_id) => println!("Per-list transactions use list {list_id}"),
        Err(_) => println!("No LIST_ID environment variable set, skipping per-list transactions"),
    }

    GooseAttack::initialize()?
        .register_scenario(
            scenario!("HealthCheck").register_transaction(transaction!(health_check)),
        )
        .register_scenario(
            scenario!("ListBrowsing")
                .register_transaction(transaction!(browse_lists))
                .register_transaction(transaction!(list_counts)),
        )
        .register_scenario(
            scenario!("QueueStatus").register_transaction(transaction!(queue_status)),
        )
        .execute()
        .await?;

    Ok(())
}
