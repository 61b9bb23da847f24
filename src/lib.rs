pub use tether_core::*;
