// @generated
// RateRequest names the currency pair a rate is wanted for.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RateRequest {
    /// Currency to convert from.
    #[prost(enumeration = "Currency", tag = "1")]
    pub base: i32,
    /// Currency to convert to.
    #[prost(enumeration = "Currency", tag = "2")]
    pub destination: i32,
}
// RateResponse carries the computed cross rate for a pair.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RateResponse {
    #[prost(enumeration = "Currency", tag = "1")]
    pub base: i32,
    #[prost(enumeration = "Currency", tag = "2")]
    pub destination: i32,
    #[prost(double, tag = "3")]
    pub rate: f64,
}
// SubscriptionError reports a rejected subscribe request on the stream
// without closing it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscriptionError {
    /// gRPC status code for the rejection (e.g. ALREADY_EXISTS).
    #[prost(int32, tag = "1")]
    pub code: i32,
    /// Human-readable description.
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    /// The offending request, echoed back.
    #[prost(message, optional, tag = "3")]
    pub request: ::core::option::Option<RateRequest>,
}
// StreamingRateResponse is one outbound message on a subscription stream:
// either a rate update or a structured error.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamingRateResponse {
    #[prost(oneof = "streaming_rate_response::Message", tags = "1, 2")]
    pub message: ::core::option::Option<streaming_rate_response::Message>,
}
/// Nested message and enum types in `StreamingRateResponse`.
pub mod streaming_rate_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        RateResponse(super::RateResponse),
        #[prost(message, tag = "2")]
        Error(super::SubscriptionError),
    }
}
// Currencies the service serves: the EUR reference plus every currency the
// ECB publishes a daily reference rate for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Currency {
    Eur = 0,
    Aud = 1,
    Bgn = 2,
    Brl = 3,
    Cad = 4,
    Chf = 5,
    Cny = 6,
    Czk = 7,
    Dkk = 8,
    Gbp = 9,
    Hkd = 10,
    Huf = 11,
    Idr = 12,
    Ils = 13,
    Inr = 14,
    Isk = 15,
    Jpy = 16,
    Krw = 17,
    Mxn = 18,
    Myr = 19,
    Nok = 20,
    Nzd = 21,
    Php = 22,
    Pln = 23,
    Ron = 24,
    Sek = 25,
    Sgd = 26,
    Thb = 27,
    Try = 28,
    Usd = 29,
    Zar = 30,
}
impl Currency {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Aud => "AUD",
            Self::Bgn => "BGN",
            Self::Brl => "BRL",
            Self::Cad => "CAD",
            Self::Chf => "CHF",
            Self::Cny => "CNY",
            Self::Czk => "CZK",
            Self::Dkk => "DKK",
            Self::Gbp => "GBP",
            Self::Hkd => "HKD",
            Self::Huf => "HUF",
            Self::Idr => "IDR",
            Self::Ils => "ILS",
            Self::Inr => "INR",
            Self::Isk => "ISK",
            Self::Jpy => "JPY",
            Self::Krw => "KRW",
            Self::Mxn => "MXN",
            Self::Myr => "MYR",
            Self::Nok => "NOK",
            Self::Nzd => "NZD",
            Self::Php => "PHP",
            Self::Pln => "PLN",
            Self::Ron => "RON",
            Self::Sek => "SEK",
            Self::Sgd => "SGD",
            Self::Thb => "THB",
            Self::Try => "TRY",
            Self::Usd => "USD",
            Self::Zar => "ZAR",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "EUR" => Some(Self::Eur),
            "AUD" => Some(Self::Aud),
            "BGN" => Some(Self::Bgn),
            "BRL" => Some(Self::Brl),
            "CAD" => Some(Self::Cad),
            "CHF" => Some(Self::Chf),
            "CNY" => Some(Self::Cny),
            "CZK" => Some(Self::Czk),
            "DKK" => Some(Self::Dkk),
            "GBP" => Some(Self::Gbp),
            "HKD" => Some(Self::Hkd),
            "HUF" => Some(Self::Huf),
            "IDR" => Some(Self::Idr),
            "ILS" => Some(Self::Ils),
            "INR" => Some(Self::Inr),
            "ISK" => Some(Self::Isk),
            "JPY" => Some(Self::Jpy),
            "KRW" => Some(Self::Krw),
            "MXN" => Some(Self::Mxn),
            "MYR" => Some(Self::Myr),
            "NOK" => Some(Self::Nok),
            "NZD" => Some(Self::Nzd),
            "PHP" => Some(Self::Php),
            "PLN" => Some(Self::Pln),
            "RON" => Some(Self::Ron),
            "SEK" => Some(Self::Sek),
            "SGD" => Some(Self::Sgd),
            "THB" => Some(Self::Thb),
            "TRY" => Some(Self::Try),
            "USD" => Some(Self::Usd),
            "ZAR" => Some(Self::Zar),
            _ => None,
        }
    }
}
include!("rates.v1.tonic.rs");
// @@protoc_insertion_point(module)
