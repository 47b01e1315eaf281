use crate::auth::guards::RequireAuth;
use crate::auth::types::Role;
use crate::cli::actions::console::{display_name, Console};
use crate::cli::globals::GlobalArgs;
use crate::reports::types::{ReportDraft, WasteReport};
use crate::reports::{recent_reports, submit_report};
use anyhow::{Context, Result};

fn print_report(report: &WasteReport) {
    let location = report
        .location_name
        .as_deref()
        .filter(|location| !location.is_empty())
        .unwrap_or("unknown location");
    println!(
        "{}  [{}] {} @ {} ({})",
        report.created_at.format("%Y-%m-%d %H:%M"),
        report.waste_type,
        report.title,
        location,
        report.status
    );
}

/// Recent reports; visible with or without a session.
///
/// # Errors
/// Returns an error if the reports cannot be loaded.
pub async fn list(globals: &GlobalArgs, limit: usize) -> Result<()> {
    let console = Console::open(globals)?;
    let state = console.optional().await;

    if let Some(profile) = &state.profile {
        println!("Signed in as {} ({} points)", display_name(profile), profile.points);
    }

    let reports = recent_reports(console.reports(), limit)
        .await
        .context("failed to load recent reports")?;
    if reports.is_empty() {
        println!("No reports yet. Be the first to report!");
    }
    for report in &reports {
        print_report(report);
    }

    console.close();
    Ok(())
}

/// # Errors
/// Returns an error when nobody is signed in, the draft is incomplete, or the
/// backend rejects the report.
pub async fn submit(globals: &GlobalArgs, draft: ReportDraft) -> Result<()> {
    let console = Console::open(globals)?;
    console.require(RequireAuth::new()).await?;

    let created = submit_report(console.store(), console.reports(), draft)
        .await
        .context("report not submitted")?;

    if let Some(report) = created {
        print_report(&report);
        println!("Balance: {} points", console.store().snapshot().points());
    }

    console.close();
    Ok(())
}

/// Recent reports with reporter and award details, for admins.
///
/// # Errors
/// Returns an error unless an admin is signed in, or if the reports cannot be
/// loaded.
pub async fn admin(globals: &GlobalArgs, limit: usize) -> Result<()> {
    let console = Console::open(globals)?;
    console.require(RequireAuth::with_role(Role::Admin)).await?;

    let reports = recent_reports(console.reports(), limit)
        .await
        .context("failed to load recent reports")?;
    for report in &reports {
        print_report(report);
        println!(
            "    id: {}  reporter: {}  points: {}",
            report.id,
            report.user_id,
            report
                .points_awarded
                .map_or_else(|| "-".to_string(), |points| points.to_string())
        );
    }

    console.close();
    Ok(())
}
