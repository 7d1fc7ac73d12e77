//! This is a helper module which reexports all logging macros from the `log`
//! crate. Drivers, the volume builder and the dispatcher all log through it:
//!
//! ```ignore
//! use crate::log::*;
//! ```

pub use log::{log, trace, debug, info, warn, error};
