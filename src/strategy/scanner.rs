use crate::state::Window;

use super::pricing::{parse_price, parse_seller};

/// A listing worth buying, found by one scan. Never cached: prices and
/// availability change between interactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub slot: usize,
    pub price: u64,
    pub seller: Option<String>,
}

/// Price and seller read from one listing's lore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub price: Option<u64>,
    pub seller: Option<String>,
}

/// Read price and seller from lore lines. First match of each wins.
pub fn read_listing<S: AsRef<str>>(lines: &[S]) -> Listing {
    let mut listing = Listing::default();
    for line in lines {
        let line = line.as_ref();
        if listing.price.is_none() {
            listing.price = parse_price(line);
        }
        if listing.seller.is_none() {
            listing.seller = parse_seller(line);
        }
        if listing.price.is_some() && listing.seller.is_some() {
            break;
        }
    }
    listing
}

/// First container slot (ascending) listed strictly below `max_price`.
///
/// Only the container region is considered; the player's own inventory
/// shown underneath is never a candidate. Slots without lore or without a
/// readable price are skipped.
pub fn scan(window: &Window, max_price: u64) -> Option<Candidate> {
    let container = window.container_size();

    window
        .slots
        .iter()
        .take(container)
        .enumerate()
        .filter_map(|(slot, item)| {
            let lines = item.as_ref()?.lore_lines()?;
            let listing = read_listing(&lines);
            let price = listing.price?;
            (price < max_price).then(|| Candidate {
                slot,
                price,
                seller: listing.seller,
            })
        })
        .next()
}
