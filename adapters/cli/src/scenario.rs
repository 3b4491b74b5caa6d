//! Scripted rounds loaded from TOML files.

use std::time::Duration;

use anyhow::{Context, Result};
use bastion_core::{CellCoord, RoundOutcome, RoundStatus, TowerTypeId};
use bastion_simulation::{Setup, Simulation};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Round setup plus the player orders replayed against it.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Scenario {
    #[serde(flatten)]
    pub(crate) setup: Setup,
    #[serde(default)]
    pub(crate) orders: Vec<Order>,
}

/// A player action issued once the round clock reaches `at` seconds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct Order {
    pub(crate) at: f32,
    #[serde(flatten)]
    pub(crate) action: Action,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum Action {
    Build { tower: TowerTypeId, cell: CellCoord },
    Upgrade { cell: CellCoord },
    Sell { cell: CellCoord },
}

/// How a scripted round ended.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Report {
    pub(crate) outcome: Option<RoundOutcome>,
    pub(crate) elapsed: Duration,
    pub(crate) status: RoundStatus,
}

impl Scenario {
    pub(crate) fn parse(source: &str) -> Result<Self> {
        let mut scenario: Self = toml::from_str(source).context("malformed scenario")?;
        scenario
            .orders
            .sort_by(|a, b| a.at.partial_cmp(&b.at).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scenario)
    }

    /// Steps the round with a fixed frame until it ends or `limit` elapses.
    pub(crate) fn play(self, frame: Duration, limit: Duration) -> Result<Report> {
        let mut simulation = Simulation::new(self.setup).context("invalid round setup")?;
        let mut orders = self.orders.into_iter().peekable();
        let mut elapsed = Duration::ZERO;

        while simulation.is_running() && elapsed < limit {
            let clock = elapsed.as_secs_f32();
            while let Some(order) = orders.next_if(|order| order.at <= clock) {
                issue(&mut simulation, order.action);
            }

            let _ = simulation.step(frame);
            elapsed += frame;
            for event in simulation.drain_events() {
                debug!(?event, "event");
            }
        }

        let status = simulation.status();
        info!(
            outcome = ?status.outcome,
            seconds = elapsed.as_secs_f32(),
            money = status.money,
            lives = status.lives,
            "round finished"
        );
        Ok(Report {
            outcome: simulation.outcome(),
            elapsed,
            status,
        })
    }
}

fn issue(simulation: &mut Simulation, action: Action) {
    match action {
        Action::Build { tower, cell } => {
            if !simulation.can_afford(tower) {
                warn!(?tower, ?cell, "cannot afford tower");
                return;
            }
            match simulation.build_tower(tower, cell) {
                Ok(id) => info!(?id, ?cell, "tower built"),
                Err(error) => warn!(%error, "build rejected"),
            }
        }
        Action::Upgrade { cell } => {
            let Some(id) = simulation.tower_at(cell) else {
                warn!(?cell, "no tower to upgrade");
                return;
            };
            if !simulation.can_upgrade(id) {
                warn!(?cell, "cannot upgrade tower");
                return;
            }
            match simulation.upgrade_tower(id) {
                Ok(()) => info!(?id, ?cell, "tower upgraded"),
                Err(error) => warn!(%error, "upgrade rejected"),
            }
        }
        Action::Sell { cell } => {
            let Some(id) = simulation.tower_at(cell) else {
                warn!(?cell, "no tower to sell");
                return;
            };
            match simulation.sell_tower(id) {
                Ok(refund) => info!(?id, refund, "tower sold"),
                Err(error) => warn!(%error, "sale rejected"),
            }
        }
    }
}
