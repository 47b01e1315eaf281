use crate::auth::guards::RequireAuth;
use crate::cli::actions::console::Console;
use crate::cli::globals::GlobalArgs;
use crate::rewards::{self, CATALOG};
use anyhow::{Context, Result};

/// Reward catalog; the balance is shown when a session exists.
///
/// # Errors
/// Returns an error if the HTTP client cannot be constructed.
pub async fn list(globals: &GlobalArgs) -> Result<()> {
    let console = Console::open(globals)?;
    let state = console.optional().await;
    let points = state.points();

    println!("{points} Points");
    for reward in &CATALOG {
        let status = if !reward.available {
            "out of stock"
        } else if points >= reward.cost {
            "redeemable"
        } else {
            "need more points"
        };
        println!(
            "{:>2}. {:<24} {:>4} pts  {:<14} {}",
            reward.id, reward.title, reward.cost, reward.category, status
        );
        println!("    {}", reward.description);
    }

    console.close();
    Ok(())
}

/// # Errors
/// Returns an error when nobody is signed in or the reward cannot be redeemed.
pub async fn redeem(globals: &GlobalArgs, reward_id: u32) -> Result<()> {
    let console = Console::open(globals)?;
    console.require(RequireAuth::new()).await?;

    let remaining = rewards::redeem(console.store(), reward_id)
        .await
        .context("reward not redeemed")?;
    if let Some(remaining) = remaining {
        println!("Remaining balance: {remaining} points");
    }

    console.close();
    Ok(())
}
