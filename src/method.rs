//! HTTP method, grounded on `Atte-http2/src/request.rs`'s `Method` enum
//! (well-known arms plus a catch-all), carried over verbatim in shape and
//! extended with the parsing/idempotence helpers spec §3/§4.6 need.

#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Method {
    #[display(fmt = "GET")]
    Get,
    #[display(fmt = "HEAD")]
    Head,
    #[display(fmt = "POST")]
    Post,
    #[display(fmt = "PUT")]
    Put,
    #[display(fmt = "DELETE")]
    Delete,
    #[display(fmt = "CONNECT")]
    Connect,
    #[display(fmt = "OPTIONS")]
    Options,
    #[display(fmt = "TRACE")]
    Trace,
    #[display(fmt = "PATCH")]
    Patch,
    #[display(fmt = "{}", _0)]
    Custom(String),
}

impl Method {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "CONNECT" => Self::Connect,
            "OPTIONS" => Self::Options,
            "TRACE" => Self::Trace,
            "PATCH" => Self::Patch,
            other => Self::Custom(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Whether a response body is forbidden regardless of what framing
    /// headers the response carries (spec §4.1 `expectResponseTo`).
    pub fn forbids_response_body(&self, status: u16) -> bool {
        matches!(self, Self::Head)
            || (matches!(self, Self::Connect) && (200..300).contains(&status))
    }

    /// Idempotent methods are eligible for pool-level retry (spec §4.6).
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Self::Get | Self::Head | Self::Put | Self::Delete | Self::Options | Self::Trace
        )
    }
}
