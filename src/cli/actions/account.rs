use crate::auth::guards::RequireAuth;
use crate::auth::types::{ProfileUpdate, SignUpDetails};
use crate::cli::actions::console::{display_name, print_profile, Console};
use crate::cli::globals::GlobalArgs;
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if the credentials are rejected.
pub async fn sign_in(globals: &GlobalArgs, email: &str, password: &SecretString) -> Result<()> {
    let console = Console::open(globals)?;
    console.store().settled().await;

    console
        .store()
        .sign_in(email, password)
        .await
        .context("sign in failed")?;

    let state = console.signed_in().await;
    match state.profile {
        Some(profile) => println!(
            "Welcome back, {}! You have {} points.",
            display_name(&profile),
            profile.points
        ),
        None => println!("Signed in as {email}, your profile is not ready yet."),
    }

    console.close();
    Ok(())
}

/// # Errors
/// Returns an error if the backend rejects the registration.
pub async fn sign_up(
    globals: &GlobalArgs,
    email: &str,
    password: &SecretString,
    details: &SignUpDetails,
) -> Result<()> {
    let console = Console::open(globals)?;
    console.store().settled().await;

    console
        .store()
        .sign_up(email, password, details)
        .await
        .context("sign up failed")?;

    console.close();
    Ok(())
}

/// # Errors
/// Returns an error if the backend refuses to end the session.
pub async fn sign_out(globals: &GlobalArgs) -> Result<()> {
    let console = Console::open(globals)?;
    console.store().settled().await;

    console
        .store()
        .sign_out()
        .await
        .context("sign out failed")?;

    console.close();
    Ok(())
}

/// # Errors
/// Returns an error when nobody is signed in.
pub async fn who_am_i(globals: &GlobalArgs) -> Result<()> {
    let console = Console::open(globals)?;
    let state = console.require(RequireAuth::new()).await?;

    if let Some(profile) = &state.profile {
        print_profile(profile);
    }

    console.close();
    Ok(())
}

/// # Errors
/// Returns an error when nobody is signed in, nothing is given to update, or
/// the backend rejects the update.
pub async fn update_profile(globals: &GlobalArgs, update: ProfileUpdate) -> Result<()> {
    if update.is_empty() {
        return Err(anyhow!("nothing to update: pass --name or --student-id"));
    }

    let console = Console::open(globals)?;
    console.require(RequireAuth::new()).await?;

    console
        .store()
        .update_profile(update)
        .await
        .context("profile update failed")?;

    if let Some(profile) = console.store().snapshot().profile {
        print_profile(&profile);
    }

    console.close();
    Ok(())
}
