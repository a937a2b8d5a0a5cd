//! Currency Code Types
//!
//! The fixed, finite set of currencies the service understands: the euro
//! reference plus every currency the ECB publishes a daily reference rate
//! for. Codes parse case-insensitively from their ISO 4217 string form.

use std::fmt;
use std::str::FromStr;

/// Defines the `Currency` enum together with its ISO 4217 code strings.
macro_rules! currencies {
    ($($variant:ident => $code:literal),+ $(,)?) => {
        /// ISO 4217 currency code drawn from the fixed set the service serves.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Currency {
            $(
                #[doc = $code]
                $variant,
            )+
        }

        impl Currency {
            /// Every currency the service knows about.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The ISO 4217 code string for this currency.
            #[must_use]
            pub const fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl FromStr for Currency {
            type Err = UnknownCurrencyCode;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(UnknownCurrencyCode(s.to_string())),
                }
            }
        }
    };
}

currencies! {
    Eur => "EUR",
    Aud => "AUD",
    Bgn => "BGN",
    Brl => "BRL",
    Cad => "CAD",
    Chf => "CHF",
    Cny => "CNY",
    Czk => "CZK",
    Dkk => "DKK",
    Gbp => "GBP",
    Hkd => "HKD",
    Huf => "HUF",
    Idr => "IDR",
    Ils => "ILS",
    Inr => "INR",
    Isk => "ISK",
    Jpy => "JPY",
    Krw => "KRW",
    Mxn => "MXN",
    Myr => "MYR",
    Nok => "NOK",
    Nzd => "NZD",
    Php => "PHP",
    Pln => "PLN",
    Ron => "RON",
    Sek => "SEK",
    Sgd => "SGD",
    Thb => "THB",
    Try => "TRY",
    Usd => "USD",
    Zar => "ZAR",
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a string is not one of the known currency codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown currency code: {0}")]
pub struct UnknownCurrencyCode(pub String);

// =============================================================================
// Tests
// =============================================================================
