pub mod card;
pub mod codec;
pub mod message;

pub use card::{Card, Rank, Suit};
pub use codec::KierkiCodec;
pub use message::Message;
