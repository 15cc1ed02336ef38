//! English auction for CIS-1 tokens.
//!
//! A seller creates an auction for a token they hold, starts it by moving the token into the contract's custody,
//! and bidders outbid each other with CCD until the auction duration passes. Outbid funds and the seller's proceeds
//! are never pushed: every beneficiary withdraws their balance explicitly.
#![cfg_attr(not(feature = "std"), no_std)]

mod contract;
mod escrow;
mod events;
mod external;
mod ledger;
mod state;
