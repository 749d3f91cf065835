use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::data::ToyDefinition;
use crate::difficulty::DifficultyRegistry;
use crate::player::PlayerState;
use crate::protocol::{ClientMessage, ServerMessage, ShelfItemData};
use crate::rng::GameRng;
use crate::round::{
    self, CartAdd, CartRemove, RoundPhase, RoundStart, RoundState, ShoppingEnd, TickOutcome,
};

// ============================================================================
// Session State
// ============================================================================

struct SessionState {
    player: PlayerState,
    round: Option<RoundState>,
    next_round_no: u32,
    game_over: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            player: PlayerState::new(),
            round: None,
            next_round_no: 1,
            game_over: false,
        }
    }
}

// ============================================================================
// Game Session
// ============================================================================

/// One player's game, from connect until reset or disconnect. Owns the
/// player state, the active round, and the countdown task; every client
/// intent runs to completion under the state lock before the next one.
pub struct GameSession {
    pub id: String,
    pub player_id: String,
    pub created_at: DateTime<Utc>,
    state: RwLock<SessionState>,
    /// Abort handle for the countdown task. Taking it out makes cancellation
    /// idempotent; a tick that already fired is ignored by the engine.
    countdown: RwLock<Option<JoinHandle<()>>>,
    broadcast_tx: broadcast::Sender<ServerMessage>,
    catalog: Vec<ToyDefinition>,
    difficulties: Arc<DifficultyRegistry>,
}

impl GameSession {
    pub fn new(
        id: String,
        player_id: String,
        catalog: Vec<ToyDefinition>,
        difficulties: Arc<DifficultyRegistry>,
    ) -> Self {
        let (broadcast_tx, _) = broadcast::channel(64);
        Self {
            id,
            player_id,
            created_at: Utc::now(),
            state: RwLock::new(SessionState::new()),
            countdown: RwLock::new(None),
            broadcast_tx,
            catalog,
            difficulties,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.broadcast_tx.subscribe()
    }

    pub async fn total_savings(&self) -> i32 {
        self.state.read().await.player.total_savings
    }

    /// Snapshot of the active round, for tests and diagnostics.
    pub async fn current_round(&self) -> Option<RoundState> {
        self.state.read().await.round.clone()
    }

    fn send(&self, msg: ServerMessage) {
        // Nobody listening is fine (client mid-reconnect)
        let _ = self.broadcast_tx.send(msg);
    }

    // ------------------------------------------------------------------
    // Countdown task
    // ------------------------------------------------------------------

    /// Spawn the 1 Hz countdown that drives `tick()`. The engine itself
    /// never owns a timer; this task is the scheduling host.
    async fn start_countdown(self: &Arc<Self>) {
        self.cancel_countdown().await;

        let session = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first interval tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if !session.tick_once().await {
                    break;
                }
            }
        });

        *self.countdown.write().await = Some(handle);
    }

    /// Stop future ticks. Safe to call any number of times.
    pub async fn cancel_countdown(&self) {
        if let Some(handle) = self.countdown.write().await.take() {
            handle.abort();
        }
    }

    /// One second elapsed. Returns false once the countdown has nothing
    /// left to drive.
    async fn tick_once(&self) -> bool {
        let mut state = self.state.write().await;

        let Some(round) = state.round.as_mut() else {
            return false;
        };

        match round.tick() {
            Some(TickOutcome::Continuing(seconds_left)) => {
                self.send(ServerMessage::TimerTick { seconds_left });
                true
            }
            Some(TickOutcome::Expired) => {
                self.send(ServerMessage::TimeExpired);
                self.close_shopping(&mut state);
                false
            }
            // Stale tick: the shopping phase already ended
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Round flow
    // ------------------------------------------------------------------

    fn start_new_round(&self, state: &mut SessionState, difficulty_id: &str) {
        let Some(profile) = self.difficulties.get(difficulty_id) else {
            self.send(ServerMessage::Error {
                message: format!("Unknown difficulty: {}", difficulty_id),
            });
            return;
        };

        let round_no = state.next_round_no;
        let mut rng = GameRng::new();
        match round::start_round(state.player.total_savings, profile, round_no, &mut rng) {
            RoundStart::Started(round) => {
                info!(
                    "Session {}: round {} started, budget {} ({})",
                    self.id, round_no, round.budget, difficulty_id
                );
                self.send(ServerMessage::BudgetRevealed {
                    round_no,
                    budget: round.budget,
                    total_savings: state.player.total_savings,
                });
                state.round = Some(round);
                state.next_round_no += 1;
            }
            RoundStart::GameOver => {
                info!(
                    "Session {}: game over with {} savings after {} rounds",
                    self.id, state.player.total_savings, state.player.rounds_played
                );
                state.round = None;
                state.game_over = true;
                self.send(ServerMessage::GameOver {
                    total_toys: state.player.trophies.len(),
                    rounds_played: state.player.rounds_played,
                    total_savings: state.player.total_savings,
                });
            }
        }
    }

    /// Shopping is over (expiry or early checkout); decide what comes next.
    fn close_shopping(&self, state: &mut SessionState) {
        let Some(round) = state.round.as_mut() else {
            return;
        };
        let difficulty_id = round.difficulty.id.clone();

        match round.end_shopping() {
            ShoppingEnd::EmptyCartRetry => {
                info!("Session {}: empty cart at expiry, retrying", self.id);
                self.send(ServerMessage::EmptyCartRetry);
                state.round = None;
                self.start_new_round(state, &difficulty_id);
            }
            ShoppingEnd::ReadyForCheckout => {
                let items: Vec<ShelfItemData> =
                    round.cart_items.iter().map(ShelfItemData::from).collect();
                self.send(ServerMessage::CheckoutReady {
                    items,
                    budget: round.budget,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Client intents
    // ------------------------------------------------------------------

    pub async fn handle_client_message(self: &Arc<Self>, msg: ClientMessage) {
        match msg {
            ClientMessage::StartRound { difficulty } => {
                let mut state = self.state.write().await;
                if state.game_over {
                    self.send(ServerMessage::Error {
                        message: "Game over. Reset to play again.".to_string(),
                    });
                    return;
                }
                if state
                    .round
                    .as_ref()
                    .is_some_and(|r| r.phase() != RoundPhase::Resolved)
                {
                    self.send(ServerMessage::Error {
                        message: "A round is already in progress.".to_string(),
                    });
                    return;
                }
                self.start_new_round(&mut state, &difficulty);
            }

            ClientMessage::StartShopping => {
                let shelf_msg = {
                    let mut state = self.state.write().await;
                    let Some(round) = state.round.as_mut() else {
                        self.send(ServerMessage::Error {
                            message: "No active round.".to_string(),
                        });
                        return;
                    };

                    let mut rng = GameRng::new();
                    if !round.start_shopping(&self.catalog, &mut rng) {
                        self.send(ServerMessage::Error {
                            message: "Shopping already started.".to_string(),
                        });
                        return;
                    }

                    ServerMessage::ShelfGenerated {
                        items: round.shelf.iter().map(ShelfItemData::from).collect(),
                        budget: round.budget,
                        time_remaining: round.time_remaining,
                    }
                };
                self.send(shelf_msg);
                self.start_countdown().await;
            }

            ClientMessage::AddToCart { item_id } => {
                let mut state = self.state.write().await;
                let Some(round) = state.round.as_mut() else {
                    return;
                };
                if round.phase() != RoundPhase::Shopping {
                    return;
                }

                match round.add_to_cart(&item_id) {
                    CartAdd::Added { price, cart_sum } => {
                        self.send(ServerMessage::CartUpdated {
                            action: "added".to_string(),
                            item_id,
                            price,
                            cart_sum,
                            budget: round.budget,
                        });
                    }
                    CartAdd::Rejected { price, cart_sum } => {
                        self.send(ServerMessage::CartRejected {
                            item_id,
                            price,
                            cart_sum,
                            reason: "Too expensive!".to_string(),
                        });
                    }
                    CartAdd::UnknownItem => {
                        warn!("Session {}: add of unknown item {}", self.id, item_id);
                    }
                }
            }

            ClientMessage::RemoveFromCart { item_id } => {
                let mut state = self.state.write().await;
                let Some(round) = state.round.as_mut() else {
                    return;
                };
                if round.phase() != RoundPhase::Shopping {
                    return;
                }

                match round.remove_from_cart(&item_id) {
                    CartRemove::Removed { price, cart_sum } => {
                        self.send(ServerMessage::CartUpdated {
                            action: "removed".to_string(),
                            item_id,
                            price,
                            cart_sum,
                            budget: round.budget,
                        });
                    }
                    CartRemove::NotFound => {
                        // No-op by design of the cart contract
                    }
                }
            }

            ClientMessage::Checkout => {
                self.cancel_countdown().await;
                let mut state = self.state.write().await;
                let in_shopping = state.round.as_ref().is_some_and(|r| {
                    matches!(r.phase(), RoundPhase::Shopping | RoundPhase::Expired)
                });
                if !in_shopping {
                    self.send(ServerMessage::Error {
                        message: "Nothing to check out.".to_string(),
                    });
                    return;
                }
                self.close_shopping(&mut state);
            }

            ClientMessage::SubmitAnswer { answer } => {
                let mut state = self.state.write().await;
                // Taken out of the option so the round and the player can be
                // borrowed together; put back before the lock drops.
                let Some(mut round) = state.round.take() else {
                    self.send(ServerMessage::Error {
                        message: "No active round.".to_string(),
                    });
                    return;
                };
                if round.phase() != RoundPhase::Checkout {
                    state.round = Some(round);
                    self.send(ServerMessage::Error {
                        message: "Not at checkout.".to_string(),
                    });
                    return;
                }

                let Some(guess) = round::parse_guess(&answer) else {
                    state.round = Some(round);
                    self.send(ServerMessage::Error {
                        message: "Please enter a number!".to_string(),
                    });
                    return;
                };

                let toys_won: Vec<ShelfItemData> =
                    round.cart_items.iter().map(ShelfItemData::from).collect();

                let result = round.submit_answer(&mut state.player, guess);
                state.round = Some(round);

                info!(
                    "Session {}: checkout {} (cost {}, change {}), savings now {}",
                    self.id,
                    if result.correct { "correct" } else { "wrong" },
                    result.actual_cost,
                    result.change,
                    state.player.total_savings
                );

                self.send(ServerMessage::RoundResult {
                    correct: result.correct,
                    actual_cost: result.actual_cost,
                    change: result.change,
                    total_savings: state.player.total_savings,
                    toys_won,
                });
            }

            ClientMessage::ViewTrophies => {
                let state = self.state.read().await;
                self.send(ServerMessage::TrophyRoom {
                    toys: state.player.trophies.iter().map(ShelfItemData::from).collect(),
                    rounds_played: state.player.rounds_played,
                    total_savings: state.player.total_savings,
                });
            }

            ClientMessage::ResetGame => {
                self.cancel_countdown().await;
                let mut state = self.state.write().await;
                state.player.reset();
                state.round = None;
                state.next_round_no = 1;
                state.game_over = false;
                info!("Session {}: game reset", self.id);
                self.send(ServerMessage::GameReset {
                    total_savings: state.player.total_savings,
                });
            }
        }
    }
}
