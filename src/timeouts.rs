pub mod ms {
    pub const PAGE_READY_DELAY: u64 = 2000;
    pub const SETTLE_DELAY: u64 = 2000;
    pub const PANEL_DELAY: u64 = 1000;
    pub const AUTO_CLOSE_DELAY: u64 = 3000;
    pub const CONNECT_RETRY: u64 = 500;
    pub const PAGE_LOAD_SETTLE: u64 = 300;
}

pub mod secs {
    pub const ALARM_INITIAL_DELAY: u64 = 60;
    pub const BROWSER_WATCH: u64 = 30;
    pub const TARGET_SCAN: u64 = 2;
    pub const HTTP_REQUEST: u64 = 5;
    pub const DAEMON_STARTUP: u64 = 2;
    pub const REQUEST: u64 = 120;
}

pub const MS_PER_MINUTE: i64 = 60_000;
pub const MS_PER_HOUR: i64 = 3_600_000;
