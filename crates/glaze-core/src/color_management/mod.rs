//! Color management: working spaces, transfer functions, white balance.

pub mod color_space;
pub mod transfer;
pub mod white_balance;
