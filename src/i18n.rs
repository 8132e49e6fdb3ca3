//! Report and chart strings.

/// Language of the generated report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    EnUs,
    ZhTw,
}

impl Language {
    pub fn messages(self) -> &'static Messages {
        match self {
            Language::EnUs => &EN_US,
            Language::ZhTw => &ZH_TW,
        }
    }
}

#[derive(Debug)]
pub struct Messages {
    pub report_title: &'static str,
    pub test_time: &'static str,
    pub duration: &'static str,
    pub threads: &'static str,
    /// Unit appended to the duration, including any leading space.
    pub seconds: &'static str,
    pub statistics: &'static str,
    pub total_requests: &'static str,
    pub successful_requests: &'static str,
    pub blocked_requests: &'static str,
    pub error_requests: &'static str,
    pub other_requests: &'static str,
    pub avg_response_time: &'static str,
    pub response_time_dist: &'static str,
    pub response_time: &'static str,
    pub request_count: &'static str,
    pub status_dist: &'static str,
    /// Separator between a label and its value.
    pub colon: &'static str,
}

static EN_US: Messages = Messages {
    report_title: "WAF Test Report",
    test_time: "Test Time",
    duration: "Duration",
    threads: "Concurrent Threads",
    seconds: " seconds",
    statistics: "Statistics Summary",
    total_requests: "Total Requests",
    successful_requests: "Successful Requests",
    blocked_requests: "Blocked Requests",
    error_requests: "Error Requests",
    other_requests: "Other Responses",
    avg_response_time: "Average Response Time",
    response_time_dist: "Response Time Distribution",
    response_time: "Response Time (seconds)",
    request_count: "Request Count",
    status_dist: "Request Status Distribution",
    colon: ": ",
};

static ZH_TW: Messages = Messages {
    report_title: "WAF測試報告",
    test_time: "測試時間",
    duration: "持續時間",
    threads: "並發線程",
    seconds: "秒",
    statistics: "統計摘要",
    total_requests: "總請求數",
    successful_requests: "成功請求",
    blocked_requests: "被阻擋請求",
    error_requests: "錯誤請求",
    other_requests: "其他回應",
    avg_response_time: "平均響應時間",
    response_time_dist: "響應時間分佈",
    response_time: "響應時間 (秒)",
    request_count: "請求數量",
    status_dist: "請求狀態碼分佈",
    colon: "：",
};
