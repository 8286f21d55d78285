pub mod cipher;
pub mod crypto;
pub mod guards;
pub mod logging;
pub mod rng;
pub mod shamir;
pub mod time;
