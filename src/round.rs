use serde::Serialize;

use crate::data::ToyDefinition;
use crate::difficulty::DifficultyProfile;
use crate::player::PlayerState;
use crate::rng::RandomSource;

// ============================================================================
// Constants
// ============================================================================

/// Toys placed on the shelf each round.
pub const SHELF_SIZE: usize = 12;

/// How many of the generated items are guaranteed individually affordable
/// (priced at no more than half the round budget).
const AFFORDABLE_PREFIX: usize = 3;

// ============================================================================
// Shelf Items
// ============================================================================

/// A priced toy on this round's shelf. Exists only for the round's duration;
/// ids are unique within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShelfItem {
    pub id: String,
    pub toy: ToyDefinition,
    pub price: i32,
}

// ============================================================================
// Round Phase
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoundPhase {
    /// Budget drawn and shown; shelf not generated yet.
    BudgetRevealed,
    /// Timer running, cart open for mutation.
    Shopping,
    /// Timer hit zero with toys in the cart.
    Expired,
    /// Waiting for the player's arithmetic answer.
    Checkout,
    /// Answer scored, money and trophies settled.
    Resolved,
}

// ============================================================================
// Operation Outcomes
// ============================================================================

/// Result of trying to start a round.
#[derive(Debug)]
pub enum RoundStart {
    Started(RoundState),
    /// Savings below the tier's minimum budget. Terminal until the player
    /// explicitly resets.
    GameOver,
}

/// Result of dropping a shelf item into the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAdd {
    Added { price: i32, cart_sum: i32 },
    /// Would blow the budget. Not an error: normal feedback for the player,
    /// state untouched.
    Rejected { price: i32, cart_sum: i32 },
    UnknownItem,
}

/// Result of dragging a cart item back onto the shelf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartRemove {
    Removed { price: i32, cart_sum: i32 },
    NotFound,
}

/// One discrete second of countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continuing(u32),
    Expired,
}

/// What happens when the shopping phase closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShoppingEnd {
    /// Timer ran out on an empty cart: no purchase, no penalty, new round.
    EmptyCartRetry,
    ReadyForCheckout,
}

/// Outcome of the checkout quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutResult {
    pub correct: bool,
    pub actual_cost: i32,
    pub change: i32,
}

// ============================================================================
// Round State
// ============================================================================

/// All state for one round. Mutated only through the operations below and
/// destroyed when the round resolves.
#[derive(Debug, Clone)]
pub struct RoundState {
    pub round_no: u32,
    pub budget: i32,
    pub difficulty: DifficultyProfile,
    /// Items still on the shelf.
    pub shelf: Vec<ShelfItem>,
    /// Items in the cart, in drop order.
    pub cart_items: Vec<ShelfItem>,
    /// Always equals the sum of cart item prices; maintained incrementally.
    pub cart_sum: i32,
    pub time_remaining: u32,
    phase: RoundPhase,
}

/// Start a new round against the player's savings.
///
/// Fails with `GameOver` when savings can no longer cover the tier's minimum
/// budget; otherwise the budget is drawn from the tier's range and clamped
/// to the savings.
pub fn start_round(
    total_savings: i32,
    difficulty: &DifficultyProfile,
    round_no: u32,
    rng: &mut impl RandomSource,
) -> RoundStart {
    if total_savings < difficulty.min_budget {
        return RoundStart::GameOver;
    }

    let budget = rng
        .random_int(difficulty.min_budget, difficulty.max_budget)
        .min(total_savings);

    RoundStart::Started(RoundState {
        round_no,
        budget,
        difficulty: difficulty.clone(),
        shelf: Vec::new(),
        cart_items: Vec::new(),
        cart_sum: 0,
        time_remaining: difficulty.timer_secs,
        phase: RoundPhase::BudgetRevealed,
    })
}

/// Generate this round's shelf: `SHELF_SIZE` distinct toys from the catalog
/// (shuffle, take the prefix), each with an independently rolled price. The
/// first `AFFORDABLE_PREFIX` items are capped at half the budget so the
/// round is always winnable.
pub fn generate_shelf(
    budget: i32,
    difficulty: &DifficultyProfile,
    catalog: &[ToyDefinition],
    round_no: u32,
    rng: &mut impl RandomSource,
) -> Vec<ShelfItem> {
    let mut toys = catalog.to_vec();
    rng.shuffle(&mut toys);
    toys.truncate(SHELF_SIZE);

    toys.into_iter()
        .enumerate()
        .map(|(index, toy)| {
            let max_price = if index < AFFORDABLE_PREFIX {
                difficulty
                    .max_price
                    .min(budget / 2)
                    .max(difficulty.min_price)
            } else {
                difficulty.max_price
            };
            let price = rng.random_int(difficulty.min_price, max_price);
            ShelfItem {
                id: format!("toy_{}_{}", round_no, index),
                toy,
                price,
            }
        })
        .collect()
}

impl RoundState {
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Open the shelf and start the countdown. Only valid once, from the
    /// budget-reveal screen; returns false otherwise.
    pub fn start_shopping(
        &mut self,
        catalog: &[ToyDefinition],
        rng: &mut impl RandomSource,
    ) -> bool {
        if self.phase != RoundPhase::BudgetRevealed {
            return false;
        }
        self.shelf = generate_shelf(self.budget, &self.difficulty, catalog, self.round_no, rng);
        self.time_remaining = self.difficulty.timer_secs;
        self.phase = RoundPhase::Shopping;
        true
    }

    /// Move a shelf item into the cart if the budget allows it.
    pub fn add_to_cart(&mut self, item_id: &str) -> CartAdd {
        let Some(pos) = self.shelf.iter().position(|item| item.id == item_id) else {
            return CartAdd::UnknownItem;
        };

        let price = self.shelf[pos].price;
        let potential = self.cart_sum + price;
        if potential > self.budget {
            return CartAdd::Rejected {
                price,
                cart_sum: self.cart_sum,
            };
        }

        let item = self.shelf.remove(pos);
        self.cart_items.push(item);
        self.cart_sum = potential;
        CartAdd::Added {
            price,
            cart_sum: self.cart_sum,
        }
    }

    /// Move a cart item back onto the shelf.
    pub fn remove_from_cart(&mut self, item_id: &str) -> CartRemove {
        let Some(pos) = self.cart_items.iter().position(|item| item.id == item_id) else {
            return CartRemove::NotFound;
        };

        let item = self.cart_items.remove(pos);
        self.cart_sum -= item.price;
        let price = item.price;
        self.shelf.push(item);
        CartRemove::Removed {
            price,
            cart_sum: self.cart_sum,
        }
    }

    /// One discrete second of countdown. Returns `None` outside the shopping
    /// phase, so a stale tick after cancellation is a harmless no-op.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if self.phase != RoundPhase::Shopping {
            return None;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.phase = RoundPhase::Expired;
            Some(TickOutcome::Expired)
        } else {
            Some(TickOutcome::Continuing(self.time_remaining))
        }
    }

    /// Close the shopping phase, whether by expiry or by the player heading
    /// to checkout early.
    pub fn end_shopping(&mut self) -> ShoppingEnd {
        if self.cart_items.is_empty() {
            self.phase = RoundPhase::Resolved;
            return ShoppingEnd::EmptyCartRetry;
        }
        self.phase = RoundPhase::Checkout;
        ShoppingEnd::ReadyForCheckout
    }

    /// Score the player's arithmetic answer and settle the money.
    ///
    /// Correct: pay the actual cost, keep the change. Incorrect: pay the
    /// full budget, forfeiting the change. Either way the toys move to the
    /// trophy collection and the round counter advances.
    pub fn submit_answer(&mut self, player: &mut PlayerState, guess: i32) -> CheckoutResult {
        let actual_cost = self.cart_sum;
        let change = self.budget - actual_cost;
        let correct = guess == actual_cost;

        if correct {
            player.total_savings -= actual_cost;
        } else {
            player.total_savings -= self.budget;
        }
        player.trophies.append(&mut self.cart_items);
        player.rounds_played += 1;

        self.cart_sum = 0;
        self.phase = RoundPhase::Resolved;

        CheckoutResult {
            correct,
            actual_cost,
            change,
        }
    }
}

/// Parse the raw checkout answer the presentation layer forwards. `None` is
/// a validation failure: the player is re-prompted, nothing is scored.
pub fn parse_guess(raw: &str) -> Option<i32> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeededRng;
    use std::collections::VecDeque;

    /// Returns scripted integers in order; leaves shuffles as the identity.
    struct ScriptedRng {
        ints: VecDeque<i32>,
    }

    impl ScriptedRng {
        fn new(ints: &[i32]) -> Self {
            Self {
                ints: ints.iter().copied().collect(),
            }
        }
    }

    impl RandomSource for ScriptedRng {
        fn random_int(&mut self, min: i32, max: i32) -> i32 {
            let n = self.ints.pop_front().expect("script exhausted");
            assert!(n >= min && n <= max, "scripted {} outside [{}, {}]", n, min, max);
            n
        }

        fn shuffle<T>(&mut self, _items: &mut [T]) {}
    }

    fn catalog() -> Vec<ToyDefinition> {
        (0..20)
            .map(|i| ToyDefinition {
                id: format!("toy{:02}", i),
                icon: "\u{1F9F8}".to_string(),
                name: format!("Toy {}", i),
            })
            .collect()
    }

    fn tier() -> DifficultyProfile {
        DifficultyProfile {
            id: "easy".to_string(),
            min_price: 1,
            max_price: 10,
            min_budget: 10,
            max_budget: 20,
            timer_secs: 30,
        }
    }

    /// Budget 20, shelf prices 5, 8, 9 then 1s for the rest of the shelf.
    fn shopping_round(savings: i32) -> RoundState {
        let mut script = vec![20, 5, 8, 9];
        script.extend(std::iter::repeat(1).take(SHELF_SIZE - 3));
        let mut rng = ScriptedRng::new(&script);

        let RoundStart::Started(mut round) = start_round(savings, &tier(), 1, &mut rng) else {
            panic!("round should start");
        };
        assert!(round.start_shopping(&catalog(), &mut rng));
        round
    }

    #[test]
    fn test_game_over_when_savings_below_min_budget() {
        let mut rng = ScriptedRng::new(&[]);
        assert!(matches!(
            start_round(5, &tier(), 1, &mut rng),
            RoundStart::GameOver
        ));
    }

    #[test]
    fn test_budget_clamped_to_savings() {
        let mut rng = ScriptedRng::new(&[18]);
        let RoundStart::Started(round) = start_round(15, &tier(), 1, &mut rng) else {
            panic!("round should start");
        };
        assert_eq!(round.budget, 15);
        assert_eq!(round.phase(), RoundPhase::BudgetRevealed);
    }

    #[test]
    fn test_budget_never_exceeds_savings_random() {
        for seed in 0..100 {
            let mut rng = SeededRng::new(seed);
            if let RoundStart::Started(round) = start_round(13, &tier(), 1, &mut rng) {
                assert!(round.budget <= 13);
                assert!(round.budget >= tier().min_budget.min(13));
            }
        }
    }

    #[test]
    fn test_shelf_has_twelve_unique_ids() {
        let mut rng = SeededRng::new(9);
        let shelf = generate_shelf(20, &tier(), &catalog(), 3, &mut rng);
        assert_eq!(shelf.len(), SHELF_SIZE);

        let mut ids: Vec<&str> = shelf.iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), SHELF_SIZE);
    }

    #[test]
    fn test_shelf_toys_are_distinct() {
        for seed in 0..50 {
            let mut rng = SeededRng::new(seed);
            let shelf = generate_shelf(20, &tier(), &catalog(), 1, &mut rng);
            let mut toy_ids: Vec<&str> = shelf.iter().map(|i| i.toy.id.as_str()).collect();
            toy_ids.sort_unstable();
            toy_ids.dedup();
            assert_eq!(toy_ids.len(), SHELF_SIZE);
        }
    }

    #[test]
    fn test_shelf_guarantees_three_affordable_items() {
        // max_price well above half the budget, so the prefix cap matters
        let steep = DifficultyProfile {
            id: "hard".to_string(),
            min_price: 1,
            max_price: 30,
            min_budget: 10,
            max_budget: 20,
            timer_secs: 20,
        };
        for seed in 0..100 {
            let mut rng = SeededRng::new(seed);
            let shelf = generate_shelf(20, &steep, &catalog(), 1, &mut rng);
            let affordable = shelf.iter().filter(|i| i.price <= 20 / 2).count();
            assert!(affordable >= 3, "seed {}: only {} affordable", seed, affordable);
            for item in &shelf {
                assert!(item.price >= steep.min_price);
                assert!(item.price <= steep.max_price);
            }
        }
    }

    #[test]
    fn test_add_to_cart_within_budget() {
        let mut round = shopping_round(100);

        assert_eq!(
            round.add_to_cart("toy_1_0"),
            CartAdd::Added { price: 5, cart_sum: 5 }
        );
        assert_eq!(
            round.add_to_cart("toy_1_1"),
            CartAdd::Added { price: 8, cart_sum: 13 }
        );
        assert_eq!(round.cart_items.len(), 2);
        assert_eq!(round.shelf.len(), SHELF_SIZE - 2);
    }

    #[test]
    fn test_add_to_cart_rejects_over_budget() {
        let mut round = shopping_round(100);
        round.add_to_cart("toy_1_0");
        round.add_to_cart("toy_1_1");

        // 13 + 9 = 22 > 20
        assert_eq!(
            round.add_to_cart("toy_1_2"),
            CartAdd::Rejected { price: 9, cart_sum: 13 }
        );
        assert_eq!(round.cart_sum, 13);
        assert_eq!(round.cart_items.len(), 2);
        assert!(round.shelf.iter().any(|i| i.id == "toy_1_2"));
    }

    #[test]
    fn test_add_same_item_twice_is_unknown() {
        let mut round = shopping_round(100);
        round.add_to_cart("toy_1_0");
        assert_eq!(round.add_to_cart("toy_1_0"), CartAdd::UnknownItem);
    }

    #[test]
    fn test_cart_sum_matches_item_prices() {
        let mut round = shopping_round(100);
        round.add_to_cart("toy_1_0");
        round.add_to_cart("toy_1_1");
        round.remove_from_cart("toy_1_0");
        round.add_to_cart("toy_1_2");

        let expected: i32 = round.cart_items.iter().map(|i| i.price).sum();
        assert_eq!(round.cart_sum, expected);
        assert!(round.cart_sum <= round.budget);
    }

    #[test]
    fn test_add_then_remove_round_trips() {
        let mut round = shopping_round(100);
        round.add_to_cart("toy_1_0");

        let before_items = round.cart_items.clone();
        let before_sum = round.cart_sum;

        round.add_to_cart("toy_1_1");
        assert_eq!(
            round.remove_from_cart("toy_1_1"),
            CartRemove::Removed { price: 8, cart_sum: before_sum }
        );

        assert_eq!(round.cart_items, before_items);
        assert_eq!(round.cart_sum, before_sum);
        assert!(round.shelf.iter().any(|i| i.id == "toy_1_1"));
    }

    #[test]
    fn test_remove_missing_item_is_noop() {
        let mut round = shopping_round(100);
        round.add_to_cart("toy_1_0");
        assert_eq!(round.remove_from_cart("toy_1_5"), CartRemove::NotFound);
        assert_eq!(round.cart_sum, 5);
    }

    #[test]
    fn test_tick_counts_down_and_expires() {
        let mut round = shopping_round(100);
        assert_eq!(round.time_remaining, 30);

        for expected in (1..30).rev() {
            assert_eq!(round.tick(), Some(TickOutcome::Continuing(expected)));
        }
        assert_eq!(round.tick(), Some(TickOutcome::Expired));
        assert_eq!(round.phase(), RoundPhase::Expired);
    }

    #[test]
    fn test_stale_tick_after_expiry_is_ignored() {
        let mut round = shopping_round(100);
        round.time_remaining = 1;
        assert_eq!(round.tick(), Some(TickOutcome::Expired));
        assert_eq!(round.tick(), None);
        assert_eq!(round.tick(), None);
        assert_eq!(round.phase(), RoundPhase::Expired);
    }

    #[test]
    fn test_empty_cart_expiry_retries_without_penalty() {
        let mut player = PlayerState::new();
        let mut round = shopping_round(100);
        round.time_remaining = 1;
        round.tick();

        assert_eq!(round.end_shopping(), ShoppingEnd::EmptyCartRetry);
        assert_eq!(player.total_savings, 100);
        assert_eq!(player.rounds_played, 0);
        assert!(player.trophies.is_empty());
    }

    #[test]
    fn test_correct_answer_pays_cost_and_keeps_change() {
        let mut player = PlayerState::new();
        let mut round = shopping_round(100);
        round.add_to_cart("toy_1_0");
        round.add_to_cart("toy_1_1");
        assert_eq!(round.end_shopping(), ShoppingEnd::ReadyForCheckout);

        let result = round.submit_answer(&mut player, 13);
        assert_eq!(
            result,
            CheckoutResult { correct: true, actual_cost: 13, change: 7 }
        );
        assert_eq!(player.total_savings, 87);
        assert_eq!(player.trophies.len(), 2);
        assert_eq!(player.rounds_played, 1);
        assert_eq!(round.phase(), RoundPhase::Resolved);
    }

    #[test]
    fn test_wrong_answer_forfeits_change_but_keeps_toys() {
        let mut player = PlayerState::new();
        let mut round = shopping_round(100);
        round.add_to_cart("toy_1_0");
        round.add_to_cart("toy_1_1");
        round.end_shopping();

        let result = round.submit_answer(&mut player, 10);
        assert_eq!(
            result,
            CheckoutResult { correct: false, actual_cost: 13, change: 7 }
        );
        // Full budget paid, change lost
        assert_eq!(player.total_savings, 80);
        // Toys kept either way
        assert_eq!(player.trophies.len(), 2);
        assert_eq!(player.rounds_played, 1);
    }

    #[test]
    fn test_start_shopping_only_from_budget_reveal() {
        let mut rng = SeededRng::new(4);
        let mut round = shopping_round(100);
        assert!(!round.start_shopping(&catalog(), &mut rng));
        assert_eq!(round.phase(), RoundPhase::Shopping);
    }

    #[test]
    fn test_parse_guess() {
        assert_eq!(parse_guess("13"), Some(13));
        assert_eq!(parse_guess("  42 "), Some(42));
        assert_eq!(parse_guess("-3"), Some(-3));
        assert_eq!(parse_guess("abc"), None);
        assert_eq!(parse_guess(""), None);
        assert_eq!(parse_guess("1.5"), None);
    }
}
