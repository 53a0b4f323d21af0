//! Logging shims.
//!
//! The crate logs through whichever backend the firmware enables: the `log`
//! facade, `defmt`, or plain `esp-println` on the serial console. With none
//! of the features enabled the macros expand to nothing but still borrow
//! their arguments so callers do not trip unused-variable lints.
//!
//! Arguments must implement both `Display` and `defmt::Format`, which in
//! practice means primitives, `&str` and the crate's own error enums.

#![allow(unused_macros)]

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::debug!($s $(, $x)*);
        #[cfg(feature = "defmt")]
        ::defmt::debug!($s $(, $x)*);
        #[cfg(feature = "esp32-log")]
        ::esp_println::println!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt", feature = "esp32-log")))]
        let _ = ($( & $x ),*);
    }};
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::info!($s $(, $x)*);
        #[cfg(feature = "defmt")]
        ::defmt::info!($s $(, $x)*);
        #[cfg(feature = "esp32-log")]
        ::esp_println::println!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt", feature = "esp32-log")))]
        let _ = ($( & $x ),*);
    }};
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::warn!($s $(, $x)*);
        #[cfg(feature = "defmt")]
        ::defmt::warn!($s $(, $x)*);
        #[cfg(feature = "esp32-log")]
        ::esp_println::println!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt", feature = "esp32-log")))]
        let _ = ($( & $x ),*);
    }};
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::error!($s $(, $x)*);
        #[cfg(feature = "defmt")]
        ::defmt::error!($s $(, $x)*);
        #[cfg(feature = "esp32-log")]
        ::esp_println::println!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt", feature = "esp32-log")))]
        let _ = ($( & $x ),*);
    }};
}
