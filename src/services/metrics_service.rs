use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};
use sysinfo::System;

/// Requests slower than this are counted as slow
pub const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub slow_requests: u64,
    pub average_response_time_ms: f64,
    pub p95_response_time_ms: u64,
    pub p99_response_time_ms: u64,
    pub max_response_time_ms: u64,
    pub min_response_time_ms: u64,
    pub requests_per_second: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointMetrics {
    pub endpoint: String,
    pub method: String,
    pub metrics: RequestMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub uptime_seconds: u64,
    pub memory_usage_bytes: u64,
    pub total_memory_bytes: u64,
    pub cpu_usage_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub system: SystemMetrics,
    pub endpoints: Vec<EndpointMetrics>,
    pub overall: RequestMetrics,
    /// Endpoints whose p95 is above the slow threshold, slowest first
    pub slow_endpoints: Vec<String>,
}

#[derive(Debug, Clone)]
struct RequestRecord {
    timestamp: Instant,
    duration: Duration,
    success: bool,
}

/// Records are keyed by `(method, path)`.
type EndpointKey = (String, String);

/// Rolling in-process request metrics plus host stats.
pub struct MetricsService {
    start_time: Instant,
    endpoint_stats: Mutex<HashMap<EndpointKey, Vec<RequestRecord>>>,
    window_duration: Duration,
    system_monitor: Mutex<System>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn percentile(sorted_ms: &[u64], pct: f64) -> u64 {
    if sorted_ms.is_empty() {
        return 0;
    }
    let rank = ((pct / 100.0) * sorted_ms.len() as f64).ceil() as usize;
    sorted_ms[rank.saturating_sub(1).min(sorted_ms.len() - 1)]
}

impl MetricsService {
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(300))
    }

    pub fn with_window(window_duration: Duration) -> Self {
        let mut system = System::new();
        system.refresh_memory();

        Self {
            start_time: Instant::now(),
            endpoint_stats: Mutex::new(HashMap::new()),
            window_duration,
            system_monitor: Mutex::new(system),
        }
    }

    /// Record one finished request.
    pub fn record_request(&self, endpoint: &str, method: &str, duration: Duration, success: bool) {
        let now = Instant::now();
        let mut stats = lock(&self.endpoint_stats);
        let records = stats
            .entry((method.to_string(), endpoint.to_string()))
            .or_default();

        records.push(RequestRecord {
            timestamp: now,
            duration,
            success,
        });

        if let Some(cutoff) = now.checked_sub(self.window_duration) {
            records.retain(|record| record.timestamp > cutoff);
        }
    }

    fn calculate_metrics(&self, records: &[RequestRecord]) -> RequestMetrics {
        if records.is_empty() {
            return RequestMetrics::default();
        }

        let total_requests = records.len() as u64;
        let successful_requests = records.iter().filter(|r| r.success).count() as u64;
        let slow_requests = records
            .iter()
            .filter(|r| r.duration > SLOW_REQUEST_THRESHOLD)
            .count() as u64;

        let mut durations: Vec<u64> = records
            .iter()
            .map(|r| r.duration.as_millis() as u64)
            .collect();
        durations.sort_unstable();

        let total_duration_ms: u64 = durations.iter().sum();
        let window_seconds = self.window_duration.as_secs_f64();

        RequestMetrics {
            total_requests,
            successful_requests,
            failed_requests: total_requests - successful_requests,
            slow_requests,
            average_response_time_ms: total_duration_ms as f64 / total_requests as f64,
            p95_response_time_ms: percentile(&durations, 95.0),
            p99_response_time_ms: percentile(&durations, 99.0),
            max_response_time_ms: durations.last().copied().unwrap_or(0),
            min_response_time_ms: durations.first().copied().unwrap_or(0),
            requests_per_second: if window_seconds > 0.0 {
                total_requests as f64 / window_seconds
            } else {
                0.0
            },
        }
    }

    fn get_system_metrics(&self) -> SystemMetrics {
        let mut system = lock(&self.system_monitor);
        system.refresh_cpu_usage();
        system.refresh_memory();

        SystemMetrics {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            memory_usage_bytes: system.used_memory(),
            total_memory_bytes: system.total_memory(),
            cpu_usage_percent: system.global_cpu_usage() as f64,
        }
    }

    pub fn generate_report(&self) -> PerformanceReport {
        let (endpoints, overall) = {
            let stats = lock(&self.endpoint_stats);
            let mut all_records: Vec<RequestRecord> = Vec::new();
            let mut endpoints: Vec<EndpointMetrics> = stats
                .iter()
                .map(|((method, endpoint), records)| {
                    all_records.extend(records.iter().cloned());
                    EndpointMetrics {
                        endpoint: endpoint.clone(),
                        method: method.clone(),
                        metrics: self.calculate_metrics(records),
                    }
                })
                .collect();
            endpoints.sort_by(|a, b| {
                a.endpoint
                    .cmp(&b.endpoint)
                    .then_with(|| a.method.cmp(&b.method))
            });
            (endpoints, self.calculate_metrics(&all_records))
        };

        let threshold_ms = SLOW_REQUEST_THRESHOLD.as_millis() as u64;
        let mut slow: Vec<&EndpointMetrics> = endpoints
            .iter()
            .filter(|e| e.metrics.p95_response_time_ms > threshold_ms)
            .collect();
        slow.sort_by(|a, b| {
            b.metrics
                .p95_response_time_ms
                .cmp(&a.metrics.p95_response_time_ms)
        });
        let slow_endpoints = slow
            .into_iter()
            .map(|e| format!("{} {}", e.method, e.endpoint))
            .collect();

        PerformanceReport {
            timestamp: chrono::Utc::now(),
            system: self.get_system_metrics(),
            endpoints,
            overall,
            slow_endpoints,
        }
    }

    pub fn get_endpoint_metrics(&self, method: &str, endpoint: &str) -> Option<EndpointMetrics> {
        let stats = lock(&self.endpoint_stats);
        stats
            .get(&(method.to_string(), endpoint.to_string()))
            .map(|records| EndpointMetrics {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                metrics: self.calculate_metrics(records),
            })
    }

    pub fn get_overall_metrics(&self) -> RequestMetrics {
        let stats = lock(&self.endpoint_stats);
        let all_records: Vec<RequestRecord> = stats.values().flatten().cloned().collect();
        self.calculate_metrics(&all_records)
    }

    pub fn clear_metrics(&self) {
        lock(&self.endpoint_stats).clear();
    }

    pub fn get_endpoint_count(&self) -> usize {
        lock(&self.endpoint_stats).len()
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_service_creation() {
        let service = MetricsService::new();
        assert_eq!(service.get_endpoint_count(), 0);
    }

    #[test]
    fn test_record_request() {
        let service = MetricsService::new();

        service.record_request("/api/tasks", "GET", Duration::from_millis(100), true);
        service.record_request("/api/tasks", "GET", Duration::from_millis(200), false);

        let metrics = service.get_endpoint_metrics("GET", "/api/tasks").unwrap();
        assert_eq!(metrics.metrics.total_requests, 2);
        assert_eq!(metrics.metrics.successful_requests, 1);
        assert_eq!(metrics.metrics.failed_requests, 1);
        assert_eq!(metrics.metrics.average_response_time_ms, 150.0);
    }

    #[test]
    fn test_methods_tracked_separately() {
        let service = MetricsService::new();

        service.record_request("/api/tasks", "GET", Duration::from_millis(10), true);
        service.record_request("/api/tasks", "POST", Duration::from_millis(30), true);

        assert_eq!(service.get_endpoint_count(), 2);
        let post = service.get_endpoint_metrics("POST", "/api/tasks").unwrap();
        assert_eq!(post.metrics.max_response_time_ms, 30);
    }

    #[test]
    fn test_overall_metrics() {
        let service = MetricsService::new();

        service.record_request("/api/pillars", "GET", Duration::from_millis(100), true);
        service.record_request("/api/areas", "POST", Duration::from_millis(200), true);

        let overall = service.get_overall_metrics();
        assert_eq!(overall.total_requests, 2);
        assert_eq!(overall.successful_requests, 2);
        assert_eq!(overall.failed_requests, 0);
        assert_eq!(overall.average_response_time_ms, 150.0);
    }

    #[test]
    fn test_percentiles() {
        let service = MetricsService::new();
        for ms in 1..=100 {
            service.record_request("/api/today", "GET", Duration::from_millis(ms), true);
        }

        let metrics = service.get_endpoint_metrics("GET", "/api/today").unwrap();
        assert_eq!(metrics.metrics.p95_response_time_ms, 95);
        assert_eq!(metrics.metrics.p99_response_time_ms, 99);
        assert_eq!(metrics.metrics.min_response_time_ms, 1);
        assert_eq!(metrics.metrics.max_response_time_ms, 100);
    }

    #[test]
    fn test_performance_report_flags_slow_endpoints() {
        let service = MetricsService::new();

        service.record_request("/api/dashboard", "GET", Duration::from_millis(1500), true);
        service.record_request("/api/health", "GET", Duration::from_millis(5), true);

        let report = service.generate_report();
        assert_eq!(report.endpoints.len(), 2);
        assert_eq!(report.overall.total_requests, 2);
        assert_eq!(report.overall.slow_requests, 1);
        assert_eq!(report.slow_endpoints, vec!["GET /api/dashboard".to_string()]);
    }

    #[test]
    fn test_clear_metrics() {
        let service = MetricsService::new();

        service.record_request("/api/journal", "GET", Duration::from_millis(100), true);
        assert_eq!(service.get_endpoint_count(), 1);

        service.clear_metrics();
        assert_eq!(service.get_endpoint_count(), 0);
    }

    #[test]
    fn test_metrics_calculation_edge_cases() {
        let service = MetricsService::new();

        let empty_metrics = service.calculate_metrics(&[]);
        assert_eq!(empty_metrics, RequestMetrics::default());

        let single_record = vec![RequestRecord {
            timestamp: Instant::now(),
            duration: Duration::from_millis(500),
            success: true,
        }];

        let single_metrics = service.calculate_metrics(&single_record);
        assert_eq!(single_metrics.total_requests, 1);
        assert_eq!(single_metrics.average_response_time_ms, 500.0);
        assert_eq!(single_metrics.p99_response_time_ms, 500);
        assert_eq!(single_metrics.min_response_time_ms, 500);
    }
}
