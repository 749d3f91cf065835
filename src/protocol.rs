use serde::{Deserialize, Serialize};

use crate::round::ShelfItem;

// ============================================================================
// Client -> Server Messages
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Player picked a difficulty tier and wants a budget drawn.
    #[serde(rename = "startRound")]
    StartRound { difficulty: String },

    /// Player left the budget-reveal screen; open the shelf and start the
    /// countdown.
    #[serde(rename = "startShopping")]
    StartShopping,

    /// Drag-and-drop resolved to a cart add.
    #[serde(rename = "addToCart")]
    AddToCart { item_id: String },

    /// Drag-and-drop resolved to a cart remove.
    #[serde(rename = "removeFromCart")]
    RemoveFromCart { item_id: String },

    /// Player heads to checkout before the timer runs out.
    #[serde(rename = "checkout")]
    Checkout,

    /// Raw text from the answer input; parsed and validated server-side.
    #[serde(rename = "submitAnswer")]
    SubmitAnswer { answer: String },

    #[serde(rename = "viewTrophies")]
    ViewTrophies,

    /// Explicit restart after a game over.
    #[serde(rename = "resetGame")]
    ResetGame,
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

/// A priced toy as the client renders it.
#[derive(Debug, Clone, Serialize)]
pub struct ShelfItemData {
    pub id: String,
    pub icon: String,
    pub name: String,
    pub price: i32,
}

impl From<&ShelfItem> for ShelfItemData {
    fn from(item: &ShelfItem) -> Self {
        Self {
            id: item.id.clone(),
            icon: item.toy.icon.clone(),
            name: item.toy.name.clone(),
            price: item.price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Welcome {
        player_id: String,
        total_savings: i32,
    },
    BudgetRevealed {
        round_no: u32,
        budget: i32,
        total_savings: i32,
    },
    ShelfGenerated {
        items: Vec<ShelfItemData>,
        budget: i32,
        time_remaining: u32,
    },
    CartUpdated {
        action: String,
        item_id: String,
        price: i32,
        cart_sum: i32,
        budget: i32,
    },
    CartRejected {
        item_id: String,
        price: i32,
        cart_sum: i32,
        reason: String,
    },
    TimerTick {
        seconds_left: u32,
    },
    TimeExpired,
    EmptyCartRetry,
    CheckoutReady {
        items: Vec<ShelfItemData>,
        budget: i32,
    },
    RoundResult {
        correct: bool,
        actual_cost: i32,
        change: i32,
        total_savings: i32,
        toys_won: Vec<ShelfItemData>,
    },
    TrophyRoom {
        toys: Vec<ShelfItemData>,
        rounds_played: u32,
        total_savings: i32,
    },
    GameOver {
        total_toys: usize,
        rounds_played: u32,
        total_savings: i32,
    },
    GameReset {
        total_savings: i32,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn msg_type(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "welcome",
            ServerMessage::BudgetRevealed { .. } => "budgetRevealed",
            ServerMessage::ShelfGenerated { .. } => "shelfGenerated",
            ServerMessage::CartUpdated { .. } => "cartUpdated",
            ServerMessage::CartRejected { .. } => "cartRejected",
            ServerMessage::TimerTick { .. } => "timerTick",
            ServerMessage::TimeExpired => "timeExpired",
            ServerMessage::EmptyCartRetry => "emptyCartRetry",
            ServerMessage::CheckoutReady { .. } => "checkoutReady",
            ServerMessage::RoundResult { .. } => "roundResult",
            ServerMessage::TrophyRoom { .. } => "trophyRoom",
            ServerMessage::GameOver { .. } => "gameOver",
            ServerMessage::GameReset { .. } => "gameReset",
            ServerMessage::Error { .. } => "error",
        }
    }
}

// ============================================================================
// Encoding/Decoding
// ============================================================================

fn string_entry(key: &str, value: &str) -> (rmpv::Value, rmpv::Value) {
    (
        rmpv::Value::String(key.into()),
        rmpv::Value::String(value.into()),
    )
}

fn int_entry(key: &str, value: i64) -> (rmpv::Value, rmpv::Value) {
    (
        rmpv::Value::String(key.into()),
        rmpv::Value::Integer(value.into()),
    )
}

fn items_entry(key: &str, items: &[ShelfItemData]) -> (rmpv::Value, rmpv::Value) {
    use rmpv::Value;

    let values: Vec<Value> = items
        .iter()
        .map(|item| {
            Value::Map(vec![
                string_entry("id", &item.id),
                string_entry("icon", &item.icon),
                string_entry("name", &item.name),
                int_entry("price", item.price as i64),
            ])
        })
        .collect();
    (Value::String(key.into()), Value::Array(values))
}

/// Encode a server message to MessagePack format
/// Format: [13, "msg_type", {data}] (matching Colyseus ROOM_DATA protocol)
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, String> {
    use rmpv::Value;

    let msg_type = msg.msg_type();

    let data = match msg {
        ServerMessage::Welcome {
            player_id,
            total_savings,
        } => Value::Map(vec![
            string_entry("player_id", player_id),
            int_entry("totalSavings", *total_savings as i64),
        ]),
        ServerMessage::BudgetRevealed {
            round_no,
            budget,
            total_savings,
        } => Value::Map(vec![
            int_entry("roundNo", *round_no as i64),
            int_entry("budget", *budget as i64),
            int_entry("totalSavings", *total_savings as i64),
        ]),
        ServerMessage::ShelfGenerated {
            items,
            budget,
            time_remaining,
        } => Value::Map(vec![
            items_entry("items", items),
            int_entry("budget", *budget as i64),
            int_entry("timeRemaining", *time_remaining as i64),
        ]),
        ServerMessage::CartUpdated {
            action,
            item_id,
            price,
            cart_sum,
            budget,
        } => Value::Map(vec![
            string_entry("action", action),
            string_entry("item_id", item_id),
            int_entry("price", *price as i64),
            int_entry("cartSum", *cart_sum as i64),
            int_entry("budget", *budget as i64),
        ]),
        ServerMessage::CartRejected {
            item_id,
            price,
            cart_sum,
            reason,
        } => Value::Map(vec![
            string_entry("item_id", item_id),
            int_entry("price", *price as i64),
            int_entry("cartSum", *cart_sum as i64),
            string_entry("reason", reason),
        ]),
        ServerMessage::TimerTick { seconds_left } => {
            Value::Map(vec![int_entry("secondsLeft", *seconds_left as i64)])
        }
        ServerMessage::TimeExpired => Value::Map(vec![]),
        ServerMessage::EmptyCartRetry => Value::Map(vec![]),
        ServerMessage::CheckoutReady { items, budget } => Value::Map(vec![
            items_entry("items", items),
            int_entry("budget", *budget as i64),
        ]),
        ServerMessage::RoundResult {
            correct,
            actual_cost,
            change,
            total_savings,
            toys_won,
        } => Value::Map(vec![
            (Value::String("correct".into()), Value::Boolean(*correct)),
            int_entry("actualCost", *actual_cost as i64),
            int_entry("change", *change as i64),
            int_entry("totalSavings", *total_savings as i64),
            items_entry("toysWon", toys_won),
        ]),
        ServerMessage::TrophyRoom {
            toys,
            rounds_played,
            total_savings,
        } => Value::Map(vec![
            items_entry("toys", toys),
            int_entry("roundsPlayed", *rounds_played as i64),
            int_entry("totalSavings", *total_savings as i64),
        ]),
        ServerMessage::GameOver {
            total_toys,
            rounds_played,
            total_savings,
        } => Value::Map(vec![
            int_entry("totalToys", *total_toys as i64),
            int_entry("roundsPlayed", *rounds_played as i64),
            int_entry("totalSavings", *total_savings as i64),
        ]),
        ServerMessage::GameReset { total_savings } => {
            Value::Map(vec![int_entry("totalSavings", *total_savings as i64)])
        }
        ServerMessage::Error { message } => Value::Map(vec![string_entry("message", message)]),
    };

    // Encode as [13, "msg_type", data] - matching Colyseus ROOM_DATA format
    let array = Value::Array(vec![
        Value::Integer(13.into()), // Protocol.RoomData
        Value::String(msg_type.into()),
        data,
    ]);

    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &array)
        .map_err(|e| format!("Failed to encode message: {}", e))?;

    Ok(buf)
}

/// Decode a client message from MessagePack format
/// Expected format: [13, "msg_type", {data}]
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, String> {
    use std::io::Cursor;

    let mut cursor = Cursor::new(data);
    let value = rmpv::decode::read_value(&mut cursor)
        .map_err(|e| format!("Failed to decode MessagePack: {}", e))?;

    let array = value.as_array().ok_or("Expected array")?;

    if array.len() < 2 {
        return Err("Array too short".to_string());
    }

    let protocol = array[0].as_u64().ok_or("Protocol code must be integer")? as u8;

    if protocol != 13 {
        return Err(format!("Unexpected protocol code: {}", protocol));
    }

    let msg_type = array[1].as_str().ok_or("Message type must be string")?;

    let empty = rmpv::Value::Map(vec![]);
    let msg_data = array.get(2).unwrap_or(&empty);

    match msg_type {
        "startRound" => {
            let difficulty = extract_string(msg_data, "difficulty").unwrap_or_default();
            Ok(ClientMessage::StartRound { difficulty })
        }
        "startShopping" => Ok(ClientMessage::StartShopping),
        "addToCart" => {
            let item_id = extract_string(msg_data, "item_id").unwrap_or_default();
            Ok(ClientMessage::AddToCart { item_id })
        }
        "removeFromCart" => {
            let item_id = extract_string(msg_data, "item_id").unwrap_or_default();
            Ok(ClientMessage::RemoveFromCart { item_id })
        }
        "checkout" => Ok(ClientMessage::Checkout),
        "submitAnswer" => {
            let answer = extract_string(msg_data, "answer").unwrap_or_default();
            Ok(ClientMessage::SubmitAnswer { answer })
        }
        "viewTrophies" => Ok(ClientMessage::ViewTrophies),
        "resetGame" => Ok(ClientMessage::ResetGame),
        _ => Err(format!("Unknown message type: {}", msg_type)),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn extract_string(value: &rmpv::Value, key: &str) -> Option<String> {
    value.as_map().and_then(|map| {
        map.iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .and_then(|(_, v)| v.as_str().map(|s| s.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmpv::Value;

    fn client_frame(msg_type: &str, entries: Vec<(Value, Value)>) -> Vec<u8> {
        let array = Value::Array(vec![
            Value::Integer(13.into()),
            Value::String(msg_type.into()),
            Value::Map(entries),
        ]);
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &array).unwrap();
        buf
    }

    #[test]
    fn test_decode_add_to_cart() {
        let buf = client_frame(
            "addToCart",
            vec![(
                Value::String("item_id".into()),
                Value::String("toy_1_4".into()),
            )],
        );
        let msg = decode_client_message(&buf).unwrap();
        assert!(matches!(msg, ClientMessage::AddToCart { item_id } if item_id == "toy_1_4"));
    }

    #[test]
    fn test_decode_submit_answer_keeps_raw_text() {
        let buf = client_frame(
            "submitAnswer",
            vec![(
                Value::String("answer".into()),
                Value::String("not a number".into()),
            )],
        );
        let msg = decode_client_message(&buf).unwrap();
        assert!(matches!(msg, ClientMessage::SubmitAnswer { answer } if answer == "not a number"));
    }

    #[test]
    fn test_decode_message_without_payload() {
        let array = Value::Array(vec![
            Value::Integer(13.into()),
            Value::String("checkout".into()),
        ]);
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &array).unwrap();

        let msg = decode_client_message(&buf).unwrap();
        assert!(matches!(msg, ClientMessage::Checkout));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let buf = client_frame("teleport", vec![]);
        assert!(decode_client_message(&buf).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_protocol_code() {
        let array = Value::Array(vec![
            Value::Integer(7.into()),
            Value::String("checkout".into()),
        ]);
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &array).unwrap();
        assert!(decode_client_message(&buf).is_err());
    }

    #[test]
    fn test_encode_round_result_frame() {
        let msg = ServerMessage::RoundResult {
            correct: true,
            actual_cost: 13,
            change: 7,
            total_savings: 87,
            toys_won: vec![ShelfItemData {
                id: "toy_1_0".to_string(),
                icon: "\u{1F9F8}".to_string(),
                name: "Teddy Bear".to_string(),
                price: 5,
            }],
        };

        let buf = encode_server_message(&msg).unwrap();
        let mut cursor = std::io::Cursor::new(buf.as_slice());
        let value = rmpv::decode::read_value(&mut cursor).unwrap();
        let array = value.as_array().unwrap();

        assert_eq!(array[0].as_u64(), Some(13));
        assert_eq!(array[1].as_str(), Some("roundResult"));

        let map = array[2].as_map().unwrap();
        let change = map
            .iter()
            .find(|(k, _)| k.as_str() == Some("change"))
            .map(|(_, v)| v.as_i64().unwrap())
            .unwrap();
        assert_eq!(change, 7);

        let toys = map
            .iter()
            .find(|(k, _)| k.as_str() == Some("toysWon"))
            .map(|(_, v)| v.as_array().unwrap().len())
            .unwrap();
        assert_eq!(toys, 1);
    }
}
