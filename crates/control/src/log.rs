//! Logging shims.
//!
//! Each macro forwards to `defmt` and/or `tracing` depending on the enabled
//! features. With neither enabled the arguments are still type-checked and
//! nothing is emitted. Keep arguments to primitives and `&str` so both
//! backends accept them.

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::info!($($arg)*);
        #[cfg(feature = "tracing")]
        tracing::info!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)*);
        #[cfg(feature = "tracing")]
        tracing::warn!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::error!($($arg)*);
        #[cfg(feature = "tracing")]
        tracing::error!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}
