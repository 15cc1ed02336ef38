/// Tag for the auction Created event.
pub const CREATED_TAG: u8 = u8::MAX - 30;

/// Tag for the auction Started event.
pub const STARTED_TAG: u8 = u8::MAX - 31;

/// Tag for the Custom Biding event.
pub const BIDING_TAG: u8 = u8::MAX - 11;

/// Tag for the auction Ended event.
pub const ENDED_TAG: u8 = u8::MAX - 32;

