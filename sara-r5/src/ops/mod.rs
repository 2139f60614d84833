//! Domain operations on [`Modem`](crate::Modem), grouped by AT command family.

mod mqtt;
mod network;
mod socket;
