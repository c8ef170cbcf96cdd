use super::normalize::normalize;
use super::pricing::{parse_sale, Sale};

/// What a chat line means to the trading loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatNotice {
    /// We were moved to the AFK area and must walk back.
    AfkTeleport,
    /// The listing we tried to buy is gone.
    AlreadyBought,
    /// One of our listings sold.
    Sale(Sale),
    Other,
}

pub fn is_afk_teleport(text: &str) -> bool {
    let normalized = normalize(text);
    normalized.contains("teleported to") && normalized.contains("afk")
}

pub fn is_already_bought(text: &str) -> bool {
    normalize(text).contains("already bought")
}

pub fn classify(text: &str) -> ChatNotice {
    if is_afk_teleport(text) {
        ChatNotice::AfkTeleport
    } else if is_already_bought(text) {
        ChatNotice::AlreadyBought
    } else if let Some(sale) = parse_sale(text) {
        ChatNotice::Sale(sale)
    } else {
        ChatNotice::Other
    }
}
