//! Time units

pub use fugit::{HertzU32 as Hertz, KilohertzU32 as KiloHertz};
