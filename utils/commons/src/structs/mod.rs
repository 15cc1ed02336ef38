use super::*;

mod asset;
mod cis1;

pub use self::{asset::*, cis1::*};
