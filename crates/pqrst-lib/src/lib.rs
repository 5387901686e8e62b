pub mod error;
pub mod export;
pub mod fiducial;
pub mod filter;
pub mod intervals;
pub mod io;
pub mod locator;
pub mod pipeline;
pub mod plot;
pub mod record;
pub mod signal;
pub mod summary;
pub mod synth;

pub use error::{PqrstError, Result};
pub use pipeline::*;
pub use signal::*;
