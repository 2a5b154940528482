//! Configuration surface (spec §6). Plain structs with `Default` impls rather
//! than a config-file parser — loading a specific host configuration file
//! format is explicitly out of scope (spec §1 Non-goals).

use std::time::Duration;

/// `conflicting-content-type-header-processing-mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTypeConflictMode {
    Error,
    First,
    Last,
    NoContentType,
}

impl Default for ContentTypeConflictMode {
    fn default() -> Self {
        Self::Error
    }
}

/// `illegal-response-header-{name,value}-processing-mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalHeaderMode {
    Error,
    Warn,
    Ignore,
}

impl Default for IllegalHeaderMode {
    fn default() -> Self {
        Self::Warn
    }
}

/// `cookie-parsing-mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieParsingMode {
    Rfc6265,
    Raw,
}

impl Default for CookieParsingMode {
    fn default() -> Self {
        Self::Rfc6265
    }
}

/// `uri-parsing-mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriParsingMode {
    Strict,
    Relaxed,
}

impl Default for UriParsingMode {
    fn default() -> Self {
        Self::Strict
    }
}

/// `websocket.periodic-keep-alive-mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveMode {
    Ping,
    Pong,
}

impl Default for KeepAliveMode {
    fn default() -> Self {
        Self::Ping
    }
}

/// Parser size bounds shared by requests and responses.
#[derive(Debug, Clone)]
pub struct ParserLimits {
    pub max_uri_length: usize,
    pub max_method_length: usize,
    pub max_response_reason_length: usize,
    pub max_header_count: usize,
    pub max_header_name_length: usize,
    pub max_header_value_length: usize,
    pub max_content_length: u64,
    pub max_chunk_size: u64,
    pub max_chunk_ext_length: usize,
    pub max_comment_parsing_depth: usize,
    /// Per-header-name header-cache capacity (default 12, spec §4.1).
    pub header_cache_capacity_per_name: usize,
    /// Overall header-cache node budget before caching is disabled.
    pub header_cache_node_budget: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_uri_length: 8 * 1024,
            max_method_length: 16,
            max_response_reason_length: 64,
            max_header_count: 64,
            max_header_name_length: 64,
            max_header_value_length: 8 * 1024,
            max_content_length: 8 * 1024 * 1024,
            max_chunk_size: 1024 * 1024,
            max_chunk_ext_length: 256,
            max_comment_parsing_depth: 5,
            header_cache_capacity_per_name: 12,
            header_cache_node_budget: 512,
        }
    }
}

#[derive(Debug, Clone)]
pub struct H1Config {
    pub limits: ParserLimits,
    pub pipelining_limit: usize,
    pub request_timeout: Option<Duration>,
    pub idle_timeout: Duration,
    pub linger_timeout: Duration,
    pub conflicting_content_type: ContentTypeConflictMode,
    pub illegal_header_name_mode: IllegalHeaderMode,
    pub illegal_header_value_mode: IllegalHeaderMode,
    pub ignore_illegal_header_for: Vec<String>,
    pub cookie_parsing_mode: CookieParsingMode,
    pub uri_parsing_mode: UriParsingMode,
    pub transparent_head_requests: bool,
    pub modeled_header_parsing: bool,
    pub verbose_error_messages: bool,
    pub server_header: Option<String>,
    pub user_agent_header: Option<String>,
}

impl Default for H1Config {
    fn default() -> Self {
        Self {
            limits: ParserLimits::default(),
            pipelining_limit: 1,
            request_timeout: Some(Duration::from_secs(20)),
            idle_timeout: Duration::from_secs(60),
            linger_timeout: Duration::from_secs(1),
            conflicting_content_type: ContentTypeConflictMode::default(),
            illegal_header_name_mode: IllegalHeaderMode::default(),
            illegal_header_value_mode: IllegalHeaderMode::default(),
            ignore_illegal_header_for: Vec::new(),
            cookie_parsing_mode: CookieParsingMode::default(),
            uri_parsing_mode: UriParsingMode::default(),
            transparent_head_requests: true,
            modeled_header_parsing: true,
            verbose_error_messages: false,
            server_header: Some("httpcore".to_owned()),
            user_agent_header: Some("httpcore-client".to_owned()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct H2Config {
    pub max_concurrent_streams: u32,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: u32,
    pub header_table_size: u32,
    pub ping_interval: Option<Duration>,
    pub ping_timeout: Duration,
    pub log_frames: bool,
}

impl Default for H2Config {
    fn default() -> Self {
        Self {
            max_concurrent_streams: 100,
            initial_window_size: 65_535,
            max_frame_size: 16_384,
            max_header_list_size: u32::MAX,
            header_table_size: 4096,
            ping_interval: Some(Duration::from_secs(30)),
            ping_timeout: Duration::from_secs(10),
            log_frames: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub keep_alive_mode: KeepAliveMode,
    pub keep_alive_max_idle: Option<Duration>,
    pub close_timeout: Duration,
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            keep_alive_mode: KeepAliveMode::default(),
            keep_alive_max_idle: None,
            close_timeout: Duration::from_secs(1),
            max_message_size: 64 << 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: usize,
    pub pipelining_limit: usize,
    pub idle_timeout: Duration,
    pub keep_alive_timeout: Duration,
    pub bind_timeout: Duration,
    pub connect_timeout: Duration,
    pub completion_timeout: Duration,
    pub response_entity_subscription_timeout: Duration,
    pub stream_cancellation_delay: Duration,
    pub max_retries: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 4,
            pipelining_limit: 1,
            idle_timeout: Duration::from_secs(30),
            // Deliberately shorter than the default server idle-timeout
            // (H1Config::idle_timeout = 60s) per spec §4.6 keep-alive-timeout.
            keep_alive_timeout: Duration::from_secs(55),
            bind_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            completion_timeout: Duration::from_secs(10),
            response_entity_subscription_timeout: Duration::from_secs(5),
            stream_cancellation_delay: Duration::from_millis(100),
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StackConfig {
    pub h1: H1Config,
    pub h2: H2Config,
    pub websocket: WebSocketConfig,
    pub pool: PoolConfig,
}
