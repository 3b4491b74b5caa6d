#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave state machine that decides when and where enemies enter the map.
//!
//! The system walks every wave of a level through
//! `Countdown -> Spawning -> InWave` and emits spawn and phase commands. It
//! never touches the world; the simulation applies its commands before the
//! entity update of the same frame.

use std::{collections::VecDeque, time::Duration};

use bastion_core::{Command, EnemyTypeId, LevelDefinition, RoundOutcome, WavePhase};

/// Configuration parameters required to construct the wave system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    spawn_interval: Duration,
}

impl Config {
    /// Creates a new configuration using the provided spawn cadence.
    #[must_use]
    pub const fn new(spawn_interval: Duration) -> Self {
        Self { spawn_interval }
    }

    /// Creates a configuration from a cadence expressed in seconds.
    ///
    /// Negative or non-finite values fall back to a zero interval, which
    /// spawns on every tick.
    #[must_use]
    pub fn from_secs(spawn_interval: f32) -> Self {
        Self::new(seconds(spawn_interval))
    }
}

#[derive(Clone, Debug)]
struct WavePlan {
    countdown: Duration,
    max_duration: Option<Duration>,
    queues: Vec<Vec<EnemyTypeId>>,
}

/// Pure system that advances the wave state machine.
#[derive(Debug)]
pub struct Waves {
    spawn_interval: Duration,
    plans: Vec<WavePlan>,
    wave: usize,
    phase: WavePhase,
    countdown_timer: Duration,
    spawn_timer: Duration,
    wave_timer: Duration,
    queues: Vec<VecDeque<EnemyTypeId>>,
    concluded: bool,
}

impl Waves {
    /// Creates a wave system positioned at the countdown of the first wave.
    #[must_use]
    pub fn new(config: Config, level: &LevelDefinition) -> Self {
        let plans: Vec<WavePlan> = level
            .waves
            .iter()
            .map(|wave| WavePlan {
                countdown: seconds(wave.countdown),
                max_duration: Some(seconds(wave.max_duration)).filter(|limit| !limit.is_zero()),
                queues: wave.spawn_queues(),
            })
            .collect();
        let phase = if plans.is_empty() {
            WavePhase::Exhausted
        } else {
            WavePhase::Countdown
        };

        Self {
            spawn_interval: config.spawn_interval,
            plans,
            wave: 0,
            phase,
            countdown_timer: Duration::ZERO,
            spawn_timer: Duration::ZERO,
            wave_timer: Duration::ZERO,
            queues: Vec::new(),
            concluded: false,
        }
    }

    /// Zero-based index of the current wave; equals the wave count once
    /// every wave was played.
    #[must_use]
    pub fn wave(&self) -> usize {
        self.wave
    }

    /// Phase the state machine is in.
    #[must_use]
    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Enemies still waiting to spawn in the current wave.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Advances the timers by `dt` and emits the resulting commands.
    ///
    /// `enemies_alive` is the number of enemies the world still holds.
    /// Spawn points are served in ascending index order, one enemy per
    /// non-empty queue and interval.
    pub fn handle(&mut self, dt: Duration, enemies_alive: usize, out: &mut Vec<Command>) {
        if self.concluded {
            return;
        }

        self.countdown_timer = self.countdown_timer.saturating_add(dt);
        self.spawn_timer = self.spawn_timer.saturating_add(dt);
        self.wave_timer = self.wave_timer.saturating_add(dt);

        let Some(plan) = self.plans.get(self.wave) else {
            if enemies_alive == 0 {
                self.concluded = true;
                out.push(Command::ConcludeRound {
                    outcome: RoundOutcome::Victory,
                });
            }
            return;
        };

        match self.phase {
            WavePhase::Countdown => {
                if self.countdown_timer > plan.countdown {
                    self.queues = plan
                        .queues
                        .iter()
                        .map(|queue| queue.iter().copied().collect())
                        .collect();
                    self.wave_timer = Duration::ZERO;
                    self.enter(WavePhase::Spawning, out);
                }
            }
            WavePhase::Spawning => {
                if self.spawn_timer > self.spawn_interval {
                    let mut spawned = false;
                    for (spawn_point, queue) in self.queues.iter_mut().enumerate() {
                        if let Some(kind) = queue.pop_front() {
                            spawned = true;
                            out.push(Command::SpawnEnemy { spawn_point, kind });
                        }
                    }

                    if spawned {
                        self.spawn_timer = Duration::ZERO;
                    } else {
                        self.enter(WavePhase::InWave, out);
                    }
                }
            }
            WavePhase::InWave => {
                let timed_out = plan
                    .max_duration
                    .map_or(false, |limit| self.wave_timer > limit);
                if enemies_alive == 0 || timed_out {
                    self.queues.clear();
                    self.wave += 1;
                    self.countdown_timer = Duration::ZERO;
                    self.spawn_timer = Duration::ZERO;
                    if self.wave < self.plans.len() {
                        self.enter(WavePhase::Countdown, out);
                    } else {
                        self.enter(WavePhase::Exhausted, out);
                    }
                }
            }
            WavePhase::Exhausted => {}
        }
    }

    fn enter(&mut self, phase: WavePhase, out: &mut Vec<Command>) {
        self.phase = phase;
        out.push(Command::AnnounceWave {
            wave: self.wave,
            phase,
        });
    }
}

fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}
