//! Pure decision logic: no I/O, no timers (except `RetryPolicy::wait`).

mod chat;
mod normalize;
mod pricing;
mod retry;
mod scanner;
mod schedule;

pub use chat::{classify, is_afk_teleport, is_already_bought, ChatNotice};
pub use normalize::{clean, fold_small_caps, normalize, strip_formatting};
pub use pricing::{parse_amount, parse_price, parse_sale, parse_seller, Sale};
pub use retry::RetryPolicy;
pub use scanner::{read_listing, scan, Candidate, Listing};
pub use schedule::{maintenance_due, DueReason};
