//! Runs weapon generation off the simulation thread

use std::sync::Arc;

use dashmap::DashSet;
use tracing::{error, info, warn};

use crate::game::session::{SessionError, SessionHandle, SessionInput};
use crate::game::{ForgedWeapon, PlayerId};

use super::WeaponSmith;

#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("Player {0} already has a weapon in the forge")]
    Busy(PlayerId),

    #[error("Forge worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One forge at a time per player; generation runs on the blocking pool
#[derive(Clone)]
pub struct ForgeService {
    smith: Arc<dyn WeaponSmith>,
    in_flight: Arc<DashSet<PlayerId>>,
}

impl ForgeService {
    pub fn new(smith: Arc<dyn WeaponSmith>) -> Self {
        Self {
            smith,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    pub fn is_forging(&self, owner_id: PlayerId) -> bool {
        self.in_flight.contains(&owner_id)
    }

    fn claim(&self, owner_id: PlayerId) -> Result<(), ForgeError> {
        if self.in_flight.insert(owner_id) {
            Ok(())
        } else {
            Err(ForgeError::Busy(owner_id))
        }
    }

    /// Generate a weapon and wait for it
    pub async fn forge(&self, owner_id: PlayerId, prompt: String) -> Result<ForgedWeapon, ForgeError> {
        self.claim(owner_id)?;
        self.generate(owner_id, prompt).await
    }

    async fn generate(&self, owner_id: PlayerId, prompt: String) -> Result<ForgedWeapon, ForgeError> {
        let smith = self.smith.clone();
        let result = tokio::task::spawn_blocking(move || smith.forge(&prompt)).await;
        self.in_flight.remove(&owner_id);

        match result {
            Ok(descriptor) => {
                info!(
                    owner_id,
                    weapon = descriptor.name.as_deref().unwrap_or("unnamed"),
                    "Weapon forged"
                );
                Ok(ForgedWeapon {
                    owner_id,
                    descriptor,
                })
            }
            Err(e) => {
                error!(owner_id, error = %e, "Forge worker failed");
                Err(ForgeError::Worker(e.to_string()))
            }
        }
    }

    /// Forge in the background and post the result to a session's mailbox,
    /// so it lands between two ticks
    pub fn forge_into(&self, owner_id: PlayerId, prompt: String, session: SessionHandle) -> Result<(), ForgeError> {
        self.claim(owner_id)?;

        let service = self.clone();
        tokio::spawn(async move {
            match service.generate(owner_id, prompt).await {
                Ok(forged) => {
                    if let Err(e) = session.send(SessionInput::Forged(forged)).await {
                        warn!(owner_id, error = %e, "Forged weapon dropped");
                    }
                }
                Err(e) => warn!(owner_id, error = %e, "Forge request failed"),
            }
        });
        Ok(())
    }
}
