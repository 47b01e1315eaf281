//! Reward catalog and point redemption.

use crate::api::errors::BackendError;
use crate::auth::state::SessionStore;
use crate::auth::types::ProfileUpdate;
use crate::notify::Notification;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewardCategory {
    FoodAndDrink,
    Academic,
    Entertainment,
    Merchandise,
    Premium,
    Shopping,
}

impl fmt::Display for RewardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FoodAndDrink => "Food & Drink",
            Self::Academic => "Academic",
            Self::Entertainment => "Entertainment",
            Self::Merchandise => "Merchandise",
            Self::Premium => "Premium",
            Self::Shopping => "Shopping",
        };
        f.pad(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reward {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub cost: u32,
    pub category: RewardCategory,
    pub available: bool,
}

pub const CATALOG: [Reward; 6] = [
    Reward {
        id: 1,
        title: "Free Coffee",
        description: "Get a free coffee from the campus café",
        cost: 50,
        category: RewardCategory::FoodAndDrink,
        available: true,
    },
    Reward {
        id: 2,
        title: "Library Late Fee Waiver",
        description: "Waive one library late fee (up to $10)",
        cost: 75,
        category: RewardCategory::Academic,
        available: true,
    },
    Reward {
        id: 3,
        title: "Campus Event Ticket",
        description: "Free ticket to select campus events",
        cost: 100,
        category: RewardCategory::Entertainment,
        available: true,
    },
    Reward {
        id: 4,
        title: "Eco-Friendly Tote Bag",
        description: "Reusable campus-branded tote bag",
        cost: 150,
        category: RewardCategory::Merchandise,
        available: true,
    },
    Reward {
        id: 5,
        title: "Priority Parking Spot",
        description: "1-day reserved parking spot near campus center",
        cost: 200,
        category: RewardCategory::Premium,
        available: false,
    },
    Reward {
        id: 6,
        title: "Campus Store Voucher",
        description: "$10 voucher for the campus bookstore",
        cost: 250,
        category: RewardCategory::Shopping,
        available: true,
    },
];

#[must_use]
pub fn find(id: u32) -> Option<&'static Reward> {
    CATALOG.iter().find(|reward| reward.id == id)
}

#[derive(Debug, Error, PartialEq)]
pub enum RedeemError {
    #[error("unknown reward {0}")]
    UnknownReward(u32),
    #[error("You need {missing} more points to redeem this reward.")]
    InsufficientPoints { missing: u32 },
    #[error("This reward is currently out of stock.")]
    Unavailable,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Redeems a catalog reward against the signed-in user's balance. Returns
/// `Ok(None)` when no profile is loaded, otherwise the remaining balance.
///
/// The balance is written back as a plain value; two concurrent redemptions
/// can both pass the check.
///
/// # Errors
/// Returns why the reward cannot be redeemed, or the backend rejection of the
/// balance update.
#[instrument(skip(store))]
pub async fn redeem(store: &SessionStore, reward_id: u32) -> Result<Option<u32>, RedeemError> {
    let Some(profile) = store.snapshot().profile else {
        debug!("no profile loaded, ignoring redemption");
        return Ok(None);
    };
    let reward = find(reward_id).ok_or(RedeemError::UnknownReward(reward_id))?;

    if profile.points < reward.cost {
        let missing = reward.cost - profile.points;
        let err = RedeemError::InsufficientPoints { missing };
        store.notify(Notification::error("Not enough points", err.to_string()));
        return Err(err);
    }

    if !reward.available {
        let err = RedeemError::Unavailable;
        store.notify(Notification::error("Reward unavailable", err.to_string()));
        return Err(err);
    }

    let remaining = profile.points - reward.cost;
    let update = ProfileUpdate {
        points: Some(remaining),
        ..ProfileUpdate::default()
    };

    match store.apply_profile_update(&update).await {
        Ok(true) => {
            store.notify(Notification::success(
                "Reward redeemed!",
                format!(
                    "You've successfully redeemed {}. Check your email for details.",
                    reward.title
                ),
            ));
            Ok(Some(remaining))
        }
        Ok(false) => Ok(None),
        Err(err) => {
            error!("Error redeeming reward {}: {}", reward.id, err);
            store.notify(Notification::error("Error", "Failed to redeem reward"));
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{identity, profile_for, session_for, ProfileReply, ScriptedBackend};
    use crate::auth::types::Role;
    use crate::notify::MemoryNotifier;
    use anyhow::Result;
    use std::sync::Arc;

    async fn signed_in_with(
        points: u32,
    ) -> (
        Arc<ScriptedBackend>,
        Arc<SessionStore>,
        Arc<MemoryNotifier>,
        crate::auth::SessionHandle,
    ) {
        let ada = identity("ada@campus.edu");
        let backend = ScriptedBackend::with_session(Some(session_for(&ada)));
        backend.queue_profile(
            ada.id,
            ProfileReply::Ready(Ok(profile_for(&ada, Role::Student, points))),
        );
        let notifier = Arc::new(MemoryNotifier::new());
        let store = SessionStore::new(backend.clone(), notifier.clone());
        let handle = store.start();
        store.settled().await;
        (backend, store, notifier, handle)
    }

    #[test]
    fn catalog_ids_are_unique_and_ordered_by_cost() {
        let ids: Vec<u32> = CATALOG.iter().map(|reward| reward.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert!(CATALOG.windows(2).all(|pair| pair[0].cost < pair[1].cost));
        assert_eq!(find(5).map(|reward| reward.available), Some(false));
        assert_eq!(find(7), None);
        assert_eq!(RewardCategory::FoodAndDrink.to_string(), "Food & Drink");
    }

    #[tokio::test(start_paused = true)]
    async fn redeem_deducts_cost_and_confirms() -> Result<()> {
        let (backend, store, notifier, _handle) = signed_in_with(120).await;

        let remaining = redeem(&store, 3).await?;

        assert_eq!(remaining, Some(20));
        assert_eq!(store.snapshot().points(), 20);
        let updates = backend.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.points, Some(20));
        assert_eq!(
            notifier.notifications(),
            vec![Notification::success(
                "Reward redeemed!",
                "You've successfully redeemed Campus Event Ticket. Check your email for details."
            )]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn insufficient_balance_names_the_shortfall() -> Result<()> {
        let (backend, store, notifier, _handle) = signed_in_with(30).await;

        let result = redeem(&store, 1).await;

        assert_eq!(result, Err(RedeemError::InsufficientPoints { missing: 20 }));
        assert!(backend.updates().is_empty());
        assert_eq!(
            notifier.errors(),
            vec![Notification::error(
                "Not enough points",
                "You need 20 more points to redeem this reward."
            )]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_reward_is_checked_after_balance() -> Result<()> {
        let (_backend, store, notifier, _handle) = signed_in_with(100).await;
        assert_eq!(
            redeem(&store, 5).await,
            Err(RedeemError::InsufficientPoints { missing: 100 })
        );

        let (backend, store, rich, _handle) = signed_in_with(1000).await;
        assert_eq!(redeem(&store, 5).await, Err(RedeemError::Unavailable));
        assert!(backend.updates().is_empty());
        assert_eq!(notifier.errors()[0].title, "Not enough points");
        assert_eq!(rich.errors()[0].title, "Reward unavailable");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn redeem_without_profile_does_nothing() -> Result<()> {
        let backend = ScriptedBackend::with_session(None);
        let notifier = Arc::new(MemoryNotifier::new());
        let store = SessionStore::new(backend.clone(), notifier.clone());
        let _handle = store.start();
        store.settled().await;

        assert_eq!(redeem(&store, 1).await, Ok(None));
        assert!(backend.updates().is_empty());
        assert!(notifier.notifications().is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_reward_is_rejected() -> Result<()> {
        let (_backend, store, _notifier, _handle) = signed_in_with(500).await;
        assert_eq!(redeem(&store, 42).await, Err(RedeemError::UnknownReward(42)));
        Ok(())
    }
}
