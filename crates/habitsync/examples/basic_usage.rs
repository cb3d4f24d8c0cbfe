//! Basic usage example for HabitSync.
//!
//! This example demonstrates the core API:
//! - Wiring a store to a gateway, session, and notification sink
//! - Signing in and loading the mirror
//! - Creating habits and logging daily completion
//! - Reading the calendar back out
//! - Graceful shutdown
//!
//! It runs against the in-memory gateway so there is nothing to deploy.
//! Run with: cargo run --example basic_usage

use std::sync::Arc;

use habitsync::{HabitStore, Identity, LogNotifier, MemoryGateway, Session, UserId};

#[tokio::main]
async fn main() -> habitsync::Result<()> {
    // Initialize logging for visibility
    tracing_subscriber::fmt::init();

    println!("=== HabitSync Basic Usage Example ===\n");

    // -------------------------------------------------------------------------
    // Step 1: Wire up the store
    // -------------------------------------------------------------------------
    println!("1. Building the store...");

    // A real app would use RestGateway against its hosted backend;
    // the in-memory gateway behaves identically minus the network.
    let gateway = Arc::new(MemoryGateway::new());
    let session = Session::new();
    let store = HabitStore::new(gateway, session.clone(), Arc::new(LogNotifier));

    // The reactor follows sign-in/sign-out and remote changes
    store.start();
    println!("   Store running: {}\n", store.is_running());

    // -------------------------------------------------------------------------
    // Step 2: Sign in
    // -------------------------------------------------------------------------
    println!("2. Signing in...");
    session.sign_in(Identity::new(UserId::new("demo-user")).with_email("demo@example.co"));
    println!("   Authenticated: {}\n", session.is_authenticated());

    // -------------------------------------------------------------------------
    // Step 3: Create habits
    // -------------------------------------------------------------------------
    println!("3. Creating habits...");
    let water = store.create_habit("Drink water").await?;
    let run = store.create_habit("Morning run").await?;
    for habit in store.habits() {
        println!("   - {}", habit.name);
    }
    println!();

    // -------------------------------------------------------------------------
    // Step 4: Log some days
    // -------------------------------------------------------------------------
    println!("4. Logging completion...");
    let monday = "2024-01-15".parse().unwrap();
    let tuesday = "2024-01-16".parse().unwrap();

    store.toggle_completion(&water.id, monday, true).await?;
    store.toggle_completion(&water.id, tuesday, true).await?;
    store.toggle_completion(&run.id, monday, false).await?;
    store
        .update_notes(&run.id, monday, "skipped, icy roads")
        .await?;

    // Writes land in the mirror via the change feed; pull the mirror up
    // to date explicitly so the example reads deterministically.
    store.refresh().await;

    // -------------------------------------------------------------------------
    // Step 5: Read the calendar
    // -------------------------------------------------------------------------
    println!("5. Reading the calendar...");
    store.select_habit(Some(&water.id));
    let selected = store.selected_habit().expect("selected habit");
    println!("   Selected habit: {}", selected.name);

    for day in [monday, tuesday] {
        match store.log_for_date(&water.id, day) {
            Some(log) if log.completed => println!("   {day}: done"),
            Some(_) => println!("   {day}: missed"),
            None => println!("   {day}: no entry"),
        }
    }

    if let Some(log) = store.log_for_date(&run.id, monday) {
        println!("   Morning run on {monday}: notes = {:?}", log.notes);
    }
    println!();

    // -------------------------------------------------------------------------
    // Step 6: Shut down
    // -------------------------------------------------------------------------
    println!("6. Shutting down...");
    store.shutdown().await;
    println!("   Store running: {}", store.is_running());

    Ok(())
}
